use std::error::Error;
use std::fmt;

/// Errors raised while loading and linking a class.
///
/// These correspond to the linkage error categories of the JVM
/// specification (§2.17.2 and §5.3). Each variant carries a message with
/// enough context (class name, file path, offending item) for diagnostics.
/// The first violation found aborts the load; errors are never accumulated.
#[derive(Debug)]
pub enum LinkageError {
    /// A structural violation of the class file format: bad magic,
    /// unsupported version, wrong constant pool entry kind, attribute
    /// length mismatches, duplicate members or attributes, a missing
    /// required super type, inconsistent Code attribute presence.
    ClassFormat(String),

    /// The class file could not be located or opened, or the file's
    /// `this_class` item does not denote the class that was requested.
    NoClassDefFound(String),

    /// A class was asked to load while it was already loading.
    ClassCircularity(String),

    /// A resolved class was not of the expected kind, e.g. an entry of the
    /// interfaces table that is not an interface.
    IncompatibleClassChange(String),

    /// A structure that is well-formed but forbidden: extending a final
    /// class, a pragma-bearing method that is virtual, a constructor with
    /// no matching replacement.
    Verify(String),
}

impl LinkageError {
    /// The message carried by the error, without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            LinkageError::ClassFormat(msg)
            | LinkageError::NoClassDefFound(msg)
            | LinkageError::ClassCircularity(msg)
            | LinkageError::IncompatibleClassChange(msg)
            | LinkageError::Verify(msg) => msg,
        }
    }
}

impl fmt::Display for LinkageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            LinkageError::ClassFormat(_) => "ClassFormatError",
            LinkageError::NoClassDefFound(_) => "NoClassDefFoundError",
            LinkageError::ClassCircularity(_) => "ClassCircularityError",
            LinkageError::IncompatibleClassChange(_) => "IncompatibleClassChangeError",
            LinkageError::Verify(_) => "VerifyError",
        };
        write!(f, "{}: {}", kind, self.message())
    }
}

impl Error for LinkageError {}

pub type Result<T> = std::result::Result<T, LinkageError>;
