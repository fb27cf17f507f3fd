use bitflags::bitflags;

bitflags! {
    /// Pragmas applied to a method.
    ///
    /// A pragma is declared in source code by making the method throw one
    /// of a fixed set of marker exception classes that are never actually
    /// thrown. The loader decodes the declared exceptions of each method
    /// through [`Pragma::from_exception_class_name`] and records the
    /// result here; the bits are acted on by later translation stages.
    pub struct Pragma: u32 {
        /// The method only runs in a hosted environment; its bytecode is
        /// dropped when loading.
        const HOSTED                  = 0x0001;
        /// The method's body replaces the body of a constructor with the
        /// same parameter types (prefixed by the receiver).
        const REPLACEMENT_CONSTRUCTOR = 0x0002;
        /// The method may only be invoked from the interpreter.
        const INTERPRETER_INVOKED     = 0x0004;
        /// The method is turned into a native method by the translator.
        const NATIVE                  = 0x0008;
        /// The method is always inlined by the translator.
        const FORCE_INLINED           = 0x0010;
        /// The method is never inlined by the translator.
        const NOT_INLINED             = 0x0020;
    }
}

impl Pragma {
    /// Converts the name of a declared exception class to the pragma bit
    /// it stands for, or the empty set if the class is not a pragma
    /// marker.
    ///
    /// This is the single point where the Exceptions attribute is
    /// repurposed as an annotation channel; nothing else in the loader
    /// gives declared exceptions any meaning.
    pub fn from_exception_class_name(class_name: &str) -> Pragma {
        match class_name {
            "com.sun.squawk.pragma.HostedPragma" => Pragma::HOSTED,
            "com.sun.squawk.pragma.ReplacementConstructorPragma" => {
                Pragma::REPLACEMENT_CONSTRUCTOR
            }
            "com.sun.squawk.pragma.InterpreterInvokedPragma" => Pragma::INTERPRETER_INVOKED,
            "com.sun.squawk.pragma.NativePragma" => Pragma::NATIVE,
            "com.sun.squawk.pragma.ForceInlinedPragma" => Pragma::FORCE_INLINED,
            "com.sun.squawk.pragma.NotInlinedPragma" => Pragma::NOT_INLINED,
            _ => Pragma::empty(),
        }
    }
}
