use crate::modifiers::Modifier;
use crate::universe::KlassRef;

/// The value of a field's ConstantValue attribute, resolved through the
/// constant pool. Primitive values are widened to their 64-bit bit
/// pattern (floats and doubles are stored as raw bits).
#[derive(Clone, PartialEq, Debug)]
pub enum FieldConstant {
    Primitive(i64),
    String(String),
}

/// The symbolic information of a field declaration read from a class
/// file.
#[derive(Debug)]
pub struct ClassFileField<'g> {
    name: String,
    modifiers: Modifier,
    field_type: KlassRef<'g>,
    constant_value: Option<FieldConstant>,
}

impl<'g> ClassFileField<'g> {
    pub fn new(name: String, modifiers: Modifier, field_type: KlassRef<'g>) -> Self {
        ClassFileField {
            name,
            modifiers,
            field_type,
            constant_value: None,
        }
    }

    /// Creates a field carrying a ConstantValue.
    pub fn with_constant(
        name: String,
        modifiers: Modifier,
        field_type: KlassRef<'g>,
        constant_value: FieldConstant,
    ) -> Self {
        ClassFileField {
            name,
            modifiers,
            field_type,
            constant_value: Some(constant_value),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modifiers(&self) -> Modifier {
        self.modifiers
    }

    pub fn field_type(&self) -> KlassRef<'g> {
        self.field_type
    }

    pub fn constant_value(&self) -> Option<&FieldConstant> {
        self.constant_value.as_ref()
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.contains(Modifier::STATIC)
    }
}
