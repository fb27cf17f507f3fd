use crate::modifiers::Modifier;
use crate::pragma::Pragma;
use crate::universe::KlassRef;

/// What a method's body is, once loading has decided.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum MethodBody {
    /// No body: abstract methods, native methods and hosted methods.
    None,
    /// The body of a default constructor synthesized by the loader for a
    /// class that declared none. The real bytecode is generated later.
    SynthesizedDefaultConstructor,
    /// The raw contents of the method's Code attribute, verbatim.
    Bytecode(Vec<u8>),
}

/// The symbolic information of a method declaration read from a class
/// file.
///
/// Constructors carry the constructor and static modifiers and have
/// their return type rewritten to the class that declares them.
#[derive(Debug)]
pub struct ClassFileMethod<'g> {
    name: String,
    modifiers: Modifier,
    return_type: KlassRef<'g>,
    parameter_types: Vec<KlassRef<'g>>,
    pragmas: Pragma,
    body: MethodBody,
}

impl<'g> ClassFileMethod<'g> {
    pub fn new(
        name: String,
        modifiers: Modifier,
        return_type: KlassRef<'g>,
        parameter_types: Vec<KlassRef<'g>>,
        pragmas: Pragma,
    ) -> Self {
        ClassFileMethod {
            name,
            modifiers,
            return_type,
            parameter_types,
            pragmas,
            body: MethodBody::None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modifiers(&self) -> Modifier {
        self.modifiers
    }

    pub fn return_type(&self) -> KlassRef<'g> {
        self.return_type
    }

    pub fn parameter_types(&self) -> &[KlassRef<'g>] {
        &self.parameter_types
    }

    pub fn pragmas(&self) -> Pragma {
        self.pragmas
    }

    pub fn body(&self) -> &MethodBody {
        &self.body
    }

    pub(crate) fn set_body(&mut self, body: MethodBody) {
        self.body = body;
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.contains(Modifier::STATIC)
    }

    pub fn is_abstract(&self) -> bool {
        self.modifiers.contains(Modifier::ABSTRACT)
    }

    pub fn is_native(&self) -> bool {
        self.modifiers.contains(Modifier::NATIVE)
    }

    pub fn is_constructor(&self) -> bool {
        self.modifiers.contains(Modifier::CONSTRUCTOR)
    }
}
