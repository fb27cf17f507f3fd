use crate::classfile::{ClassFileField, ClassFileMethod};
use crate::modifiers::Modifier;
use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::fmt::Debug;

/// A class handle interned in a [`Universe`](crate::Universe).
///
/// Handles have reference identity: two handles denote the same class
/// exactly when they are the same allocation, and the loader compares
/// them with `std::ptr::eq`.
pub type KlassRef<'g> = &'g Klass<'g>;

/// The lifecycle states of a class.
///
/// States only ever increase, except that `Error` is terminal and
/// reachable from `Loading` onward. A class in `Error` stays there; it
/// must never be retried.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum KlassState {
    /// The class exists in the universe but nothing has been read for it.
    Defined,
    /// A loader is currently reading the class's class file.
    Loading,
    /// The class file definition has been installed.
    Loaded,
    /// Loading failed; the handle is permanently poisoned.
    Error,
}

/// Identifies the well-known system classes that get special treatment
/// (data sizes, ConstantValue kinds). Every other class is `Other`.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SystemId {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,
    String,
    Object,
    Other,
}

/// The symbolic information installed onto a class when its class file
/// has been completely read and validated.
pub struct ClassFileDefinition<'g> {
    pub superclass: Option<KlassRef<'g>>,
    pub interfaces: Vec<KlassRef<'g>>,
    pub virtual_methods: Vec<ClassFileMethod<'g>>,
    pub static_methods: Vec<ClassFileMethod<'g>>,
    pub instance_fields: Vec<ClassFileField<'g>>,
    pub static_fields: Vec<ClassFileField<'g>>,
    pub source_file: Option<String>,
}

/// A class known to the universe: the subject a class file loader
/// populates.
///
/// Only one loader may be loading a given handle at a time; the handle
/// itself detects re-entrant loading through its state.
pub struct Klass<'g> {
    /// Fully qualified dotted name, e.g. `java.lang.Object`. Array
    /// classes use the descriptor form, e.g. `[I` or `[Ljava.lang.Object;`.
    name: String,

    system_id: SystemId,

    /// The element type, for array classes only.
    component_type: Option<KlassRef<'g>>,

    state: Cell<KlassState>,

    modifiers: Cell<Modifier>,

    definition: RefCell<Option<ClassFileDefinition<'g>>>,
}

impl<'g> Klass<'g> {
    pub(crate) fn new(
        name: String,
        system_id: SystemId,
        component_type: Option<KlassRef<'g>>,
        modifiers: Modifier,
        state: KlassState,
    ) -> Klass<'g> {
        Klass {
            name,
            system_id,
            component_type,
            state: Cell::new(state),
            modifiers: Cell::new(modifiers),
            definition: RefCell::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn system_id(&self) -> SystemId {
        self.system_id
    }

    pub fn component_type(&self) -> Option<KlassRef<'g>> {
        self.component_type
    }

    pub fn state(&self) -> KlassState {
        self.state.get()
    }

    /// Moves the class to a later lifecycle state. Going backwards is a
    /// programming error; `Error` is reachable from anywhere.
    pub fn change_state(&self, state: KlassState) {
        debug_assert!(
            self.state.get() < state || state == KlassState::Error,
            "illegal state transition for {}: {:?} -> {:?}",
            self.name,
            self.state.get(),
            state
        );
        self.state.set(state);
    }

    pub fn modifiers(&self) -> Modifier {
        self.modifiers.get()
    }

    /// ORs additional modifiers into the class.
    pub fn update_modifiers(&self, modifiers: Modifier) {
        self.modifiers.set(self.modifiers.get() | modifiers);
    }

    pub fn is_interface(&self) -> bool {
        self.modifiers().contains(Modifier::INTERFACE)
    }

    pub fn is_abstract(&self) -> bool {
        self.modifiers().contains(Modifier::ABSTRACT)
    }

    pub fn is_final(&self) -> bool {
        self.modifiers().contains(Modifier::FINAL)
    }

    pub fn is_array(&self) -> bool {
        self.modifiers().contains(Modifier::ARRAY)
    }

    pub fn is_squawk_array(&self) -> bool {
        self.modifiers().contains(Modifier::SQUAWKARRAY)
    }

    pub fn is_squawk_primitive(&self) -> bool {
        self.modifiers().contains(Modifier::SQUAWKPRIMITIVE)
    }

    pub fn is_double_word(&self) -> bool {
        self.modifiers().contains(Modifier::DOUBLEWORD)
    }

    pub fn has_global_statics(&self) -> bool {
        self.modifiers().contains(Modifier::GLOBAL_STATICS)
    }

    /// The number of bytes a value of this type occupies in an instance.
    /// Reference types occupy one word.
    pub fn data_size(&self) -> usize {
        match self.system_id {
            SystemId::Boolean | SystemId::Byte => 1,
            SystemId::Char | SystemId::Short => 2,
            SystemId::Int | SystemId::Float => 4,
            SystemId::Long | SystemId::Double => 8,
            SystemId::Void => 0,
            SystemId::String | SystemId::Object | SystemId::Other => 4,
        }
    }

    /// Installs the class file definition. Called exactly once by the
    /// loader, immediately before the transition to `Loaded`.
    pub(crate) fn set_class_file_definition(
        &self,
        superclass: Option<KlassRef<'g>>,
        interfaces: Vec<KlassRef<'g>>,
        virtual_methods: Vec<ClassFileMethod<'g>>,
        static_methods: Vec<ClassFileMethod<'g>>,
        instance_fields: Vec<ClassFileField<'g>>,
        static_fields: Vec<ClassFileField<'g>>,
        source_file: Option<String>,
    ) {
        debug_assert!(self.definition.borrow().is_none());
        *self.definition.borrow_mut() = Some(ClassFileDefinition {
            superclass,
            interfaces,
            virtual_methods,
            static_methods,
            instance_fields,
            static_fields,
            source_file,
        });
    }

    /// Whether a class file definition has been installed.
    pub fn has_definition(&self) -> bool {
        self.definition.borrow().is_some()
    }

    /// The installed class file definition.
    ///
    /// Panics if the class has not reached `Loaded`; asking a class that
    /// was never loaded for its definition is a programming error.
    pub fn definition(&self) -> Ref<'_, ClassFileDefinition<'g>> {
        Ref::map(self.definition.borrow(), |definition| {
            definition
                .as_ref()
                .expect("class file definition not installed")
        })
    }
}

impl<'g> PartialEq for Klass<'g> {
    fn eq(&self, other: &Klass<'g>) -> bool {
        self.name == other.name
    }
}

impl<'g> Eq for Klass<'g> {}

impl<'g> Debug for Klass<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
