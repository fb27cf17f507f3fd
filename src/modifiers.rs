use bitflags::bitflags;

bitflags! {
    /// Access and property modifiers of classes, fields and methods.
    ///
    /// The low 12 bits are the access flag values from the class file
    /// format (JVM specification tables 4.1, 4.5 and 4.6). The remaining
    /// bits denote properties that have no class file representation and
    /// are computed or assigned while classes are defined and loaded.
    pub struct Modifier: u32 {
        const PUBLIC           = 0x0000_0001;
        const PRIVATE          = 0x0000_0002;
        const PROTECTED        = 0x0000_0004;
        const STATIC           = 0x0000_0008;
        const FINAL            = 0x0000_0010;
        const SYNCHRONIZED     = 0x0000_0020;
        /// Same bit as `SYNCHRONIZED`, in the class flag context.
        const SUPER            = 0x0000_0020;
        const VOLATILE         = 0x0000_0040;
        const TRANSIENT        = 0x0000_0080;
        const NATIVE           = 0x0000_0100;
        const INTERFACE        = 0x0000_0200;
        const ABSTRACT         = 0x0000_0400;
        const STRICT           = 0x0000_0800;

        /// The method is a constructor.
        const CONSTRUCTOR      = 0x0000_1000;
        /// The method has one or more pragmas applied to it.
        const HAS_PRAGMAS      = 0x0000_2000;
        /// The field has a ConstantValue.
        const CONSTANT         = 0x0000_4000;
        /// The class, method or field does not appear in the source code.
        const SOURCE_SYNTHETIC = 0x0000_8000;
        /// The class must have its class initializer run before use.
        const MUSTCLINIT       = 0x0001_0000;
        /// The class represents a primitive type.
        const PRIMITIVE        = 0x0004_0000;
        /// The class has no class file representation.
        const SYNTHETIC        = 0x0008_0000;
        /// The class represents a double word type (`long` or `double`).
        const DOUBLEWORD       = 0x0010_0000;
        /// The class represents an array.
        const ARRAY            = 0x0020_0000;
        /// Instances of the class are represented in the array object
        /// format, which means declared constructors have their bodies
        /// substituted by replacement constructors.
        const SQUAWKARRAY      = 0x0040_0000;
        /// The class is converted into a primitive type by the
        /// translator; values of the type are never heap allocated.
        const SQUAWKPRIMITIVE  = 0x0080_0000;
        /// The static fields of the class are VM global.
        const GLOBAL_STATICS   = 0x0200_0000;
    }
}

impl Modifier {
    /// Converts a raw `access_flags` item into a modifier set. Only the
    /// access flag bits survive; the high bits of the flag word are
    /// reserved for system modifiers and must never be taken from a class
    /// file.
    pub fn from_raw(flags: u16) -> Modifier {
        Modifier::from_bits_truncate(u32::from(flags) & 0x0FFF)
    }

    /// The mask of modifiers defined by the JVM specification that
    /// pertain to a class (table 4.1).
    pub fn jvm_class_modifiers() -> Modifier {
        Modifier::PUBLIC
            | Modifier::FINAL
            | Modifier::SUPER
            | Modifier::INTERFACE
            | Modifier::ABSTRACT
    }

    /// The mask of modifiers defined by the JVM specification that
    /// pertain to a field (table 4.5).
    pub fn jvm_field_modifiers() -> Modifier {
        Modifier::PUBLIC
            | Modifier::PRIVATE
            | Modifier::PROTECTED
            | Modifier::STATIC
            | Modifier::FINAL
            | Modifier::VOLATILE
            | Modifier::TRANSIENT
    }

    /// The mask of modifiers defined by the JVM specification that
    /// pertain to a method (table 4.6).
    pub fn jvm_method_modifiers() -> Modifier {
        Modifier::PUBLIC
            | Modifier::PRIVATE
            | Modifier::PROTECTED
            | Modifier::STATIC
            | Modifier::FINAL
            | Modifier::SYNCHRONIZED
            | Modifier::NATIVE
            | Modifier::ABSTRACT
            | Modifier::STRICT
    }

    /// At most one of `public`, `private` and `protected` may be set.
    pub fn has_valid_access(self) -> bool {
        let access = self & (Modifier::PUBLIC | Modifier::PRIVATE | Modifier::PROTECTED);
        access.bits().count_ones() <= 1
    }
}
