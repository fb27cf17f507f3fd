//! The class universe: every class the VM knows about, interned by name.
//!
//! Class handles are arena allocated and live as long as the universe's
//! arenas; everything downstream (the constant pool, the loader, member
//! tables) refers to classes as `&'g Klass<'g>` references. The universe
//! is bootstrapped with the primitive types and the handful of well-known
//! system classes that can never come from a class file.

use crate::descriptors::{BaseType, FieldDescriptor};
use crate::errors::{LinkageError, Result};
use crate::modifiers::Modifier;
use crate::names::{self, NameFormat};
use elsa::map::FrozenMap;
use typed_arena::Arena;

mod klass;
mod uninitialized;

pub use klass::*;
pub use uninitialized::*;

/// Backing storage for a [`Universe`]. Keeping the arenas outside the
/// universe lets handles borrow from the arenas rather than from the
/// universe itself.
pub struct UniverseArenas<'g> {
    klass_arena: Arena<Klass<'g>>,
}

impl<'g> UniverseArenas<'g> {
    pub fn new() -> UniverseArenas<'g> {
        UniverseArenas {
            klass_arena: Arena::new(),
        }
    }
}

impl<'g> Default for UniverseArenas<'g> {
    fn default() -> Self {
        UniverseArenas::new()
    }
}

/// The classes that exist before any class file has been read.
#[derive(Copy, Clone)]
pub struct SystemClasses<'g> {
    pub object: KlassRef<'g>,
    pub string: KlassRef<'g>,
    pub void: KlassRef<'g>,
    pub boolean: KlassRef<'g>,
    pub byte: KlassRef<'g>,
    pub character: KlassRef<'g>,
    pub short: KlassRef<'g>,
    pub int: KlassRef<'g>,
    pub long: KlassRef<'g>,
    pub float: KlassRef<'g>,
    pub double: KlassRef<'g>,
}

impl<'g> SystemClasses<'g> {
    /// The class representing a primitive type.
    pub fn primitive(&self, base: BaseType) -> KlassRef<'g> {
        match base {
            BaseType::Boolean => self.boolean,
            BaseType::Byte => self.byte,
            BaseType::Char => self.character,
            BaseType::Short => self.short,
            BaseType::Int => self.int,
            BaseType::Long => self.long,
            BaseType::Float => self.float,
            BaseType::Double => self.double,
        }
    }
}

/// The name of the marker interface whose presence in a class's
/// interfaces table makes the class's statics VM global.
pub const GLOBAL_STATIC_FIELDS_INTERFACE: &str = "com.sun.squawk.pragma.GlobalStaticFields";

/// Tracks every class, interned by fully qualified dotted name.
pub struct Universe<'g> {
    arenas: &'g UniverseArenas<'g>,
    classes: FrozenMap<&'g str, KlassRef<'g>>,
    system: SystemClasses<'g>,
}

impl<'g> Universe<'g> {
    /// Creates a universe holding only the bootstrapped system classes.
    pub fn new(arenas: &'g UniverseArenas<'g>) -> Universe<'g> {
        let classes = FrozenMap::new();

        let base_modifiers =
            Modifier::PUBLIC | Modifier::FINAL | Modifier::PRIMITIVE | Modifier::SYNTHETIC;
        let primitive = |name: &str, id: SystemId, extra: Modifier| {
            install(
                arenas,
                &classes,
                Klass::new(
                    name.to_string(),
                    id,
                    None,
                    base_modifiers | extra,
                    KlassState::Loaded,
                ),
            )
        };

        let system = SystemClasses {
            object: install(
                arenas,
                &classes,
                Klass::new(
                    "java.lang.Object".to_string(),
                    SystemId::Object,
                    None,
                    Modifier::PUBLIC | Modifier::SYNTHETIC,
                    KlassState::Loaded,
                ),
            ),
            string: install(
                arenas,
                &classes,
                Klass::new(
                    "java.lang.String".to_string(),
                    SystemId::String,
                    None,
                    Modifier::PUBLIC
                        | Modifier::FINAL
                        | Modifier::SQUAWKARRAY
                        | Modifier::SYNTHETIC,
                    KlassState::Loaded,
                ),
            ),
            void: primitive("void", SystemId::Void, Modifier::empty()),
            boolean: primitive("boolean", SystemId::Boolean, Modifier::empty()),
            byte: primitive("byte", SystemId::Byte, Modifier::empty()),
            character: primitive("char", SystemId::Char, Modifier::empty()),
            short: primitive("short", SystemId::Short, Modifier::empty()),
            int: primitive("int", SystemId::Int, Modifier::empty()),
            long: primitive("long", SystemId::Long, Modifier::DOUBLEWORD),
            float: primitive("float", SystemId::Float, Modifier::empty()),
            double: primitive("double", SystemId::Double, Modifier::DOUBLEWORD),
        };

        // The global statics marker interface is purely symbolic, so it
        // never has a class file to load.
        install(
            arenas,
            &classes,
            Klass::new(
                GLOBAL_STATIC_FIELDS_INTERFACE.to_string(),
                SystemId::Other,
                None,
                Modifier::PUBLIC | Modifier::INTERFACE | Modifier::ABSTRACT | Modifier::SYNTHETIC,
                KlassState::Loaded,
            ),
        );

        Universe {
            arenas,
            classes,
            system,
        }
    }

    pub fn system(&self) -> &SystemClasses<'g> {
        &self.system
    }

    /// Looks up a class without creating it.
    pub fn lookup(&'g self, name: &str) -> Option<KlassRef<'g>> {
        self.classes.get(name)
    }

    /// Gets the class with the given fully qualified dotted name, creating
    /// it in the `Defined` state if the universe has not seen it before.
    /// Array classes (names in descriptor form) are created fully `Loaded`
    /// since they have no class file.
    pub fn klass_for_name(&'g self, name: &str) -> Result<KlassRef<'g>> {
        if let Some(klass) = self.classes.get(name) {
            return Ok(klass);
        }
        if let Some(element) = name.strip_prefix('[') {
            let component = self.array_component(element, name)?;
            Ok(self.install_array(name.to_string(), component))
        } else {
            names::verify_name(name, NameFormat::Class)?;
            Ok(self.install(Klass::new(
                name.to_string(),
                SystemId::Other,
                None,
                Modifier::empty(),
                KlassState::Defined,
            )))
        }
    }

    /// Gets the array class whose element type is `component`, creating it
    /// if needed.
    pub fn array_of(&'g self, component: KlassRef<'g>) -> KlassRef<'g> {
        debug_assert!(component.system_id() != SystemId::Void);
        let name = match component.system_id() {
            SystemId::Boolean => "[Z".to_string(),
            SystemId::Byte => "[B".to_string(),
            SystemId::Char => "[C".to_string(),
            SystemId::Short => "[S".to_string(),
            SystemId::Int => "[I".to_string(),
            SystemId::Long => "[J".to_string(),
            SystemId::Float => "[F".to_string(),
            SystemId::Double => "[D".to_string(),
            _ if component.is_array() => format!("[{}", component.name()),
            _ => format!("[L{};", component.name()),
        };
        if let Some(klass) = self.classes.get(name.as_str()) {
            return klass;
        }
        self.install_array(name, component)
    }

    /// Resolves a parsed field descriptor to the class it denotes.
    pub fn klass_for_descriptor(&'g self, descriptor: &FieldDescriptor) -> Result<KlassRef<'g>> {
        match descriptor {
            FieldDescriptor::Base(base) => Ok(self.system.primitive(*base)),
            FieldDescriptor::Object(name) => self.klass_for_name(name),
            FieldDescriptor::Array(element) => {
                let component = self.klass_for_descriptor(element)?;
                Ok(self.array_of(component))
            }
        }
    }

    /// Decodes the element part of an array class name (everything after
    /// the leading `[`).
    fn array_component(&'g self, element: &str, whole_name: &str) -> Result<KlassRef<'g>> {
        let invalid = || {
            LinkageError::ClassFormat(format!("invalid array class name: {}", whole_name))
        };
        if element.starts_with('[') {
            return self.klass_for_name(element);
        }
        if let Some(class_name) = element
            .strip_prefix('L')
            .and_then(|rest| rest.strip_suffix(';'))
        {
            if class_name.is_empty() {
                return Err(invalid());
            }
            return self.klass_for_name(class_name);
        }
        let base = match element {
            "Z" => BaseType::Boolean,
            "B" => BaseType::Byte,
            "C" => BaseType::Char,
            "S" => BaseType::Short,
            "I" => BaseType::Int,
            "J" => BaseType::Long,
            "F" => BaseType::Float,
            "D" => BaseType::Double,
            _ => return Err(invalid()),
        };
        Ok(self.system.primitive(base))
    }

    fn install(&self, klass: Klass<'g>) -> KlassRef<'g> {
        install(self.arenas, &self.classes, klass)
    }

    fn install_array(&self, name: String, component: KlassRef<'g>) -> KlassRef<'g> {
        self.install(Klass::new(
            name,
            SystemId::Other,
            Some(component),
            Modifier::PUBLIC
                | Modifier::FINAL
                | Modifier::ARRAY
                | Modifier::SQUAWKARRAY
                | Modifier::SYNTHETIC,
            KlassState::Loaded,
        ))
    }
}

fn install<'g>(
    arenas: &'g UniverseArenas<'g>,
    classes: &FrozenMap<&'g str, KlassRef<'g>>,
    klass: Klass<'g>,
) -> KlassRef<'g> {
    let klass = &*arenas.klass_arena.alloc(klass);
    classes.insert(klass.name(), klass);
    klass
}
