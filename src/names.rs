use crate::errors::{LinkageError, Result};

/// Gets the file path for a given class name. The path is constructed from
/// the fully qualified dotted name of the class with each (sub)package
/// corresponding to a (sub)directory: `a.b.C` becomes `a/b/C.class`.
pub fn class_file_path(name: &str) -> String {
    let mut path = name.replace('.', "/");
    path.push_str(".class");
    path
}

/// The format against which a name read from a class file is validated.
///
/// See <https://docs.oracle.com/javase/specs/jvms/se8/html/jvms-4.html#jvms-4.2.2>
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum NameFormat {
    Class,
    Field,
    Method,
}

impl NameFormat {
    fn describe(self) -> &'static str {
        match self {
            NameFormat::Class => "class",
            NameFormat::Field => "field",
            NameFormat::Method => "method",
        }
    }
}

/// Checks that a name read from a class file is well formed for its role.
///
/// Field and method names are unqualified names: non-empty and free of
/// `.`, `;`, `[` and `/`. Method names additionally exclude `<` and `>`
/// except for the two special forms `<init>` and `<clinit>`. Class names
/// are dot-separated sequences of unqualified names.
pub fn verify_name(name: &str, format: NameFormat) -> Result<()> {
    let valid = match format {
        NameFormat::Class => {
            !name.is_empty() && name.split('.').all(is_valid_unqualified_name)
        }
        NameFormat::Field => is_valid_unqualified_name(name),
        NameFormat::Method => {
            name == "<init>"
                || name == "<clinit>"
                || (is_valid_unqualified_name(name) && !name.contains(&['<', '>'][..]))
        }
    };
    if valid {
        Ok(())
    } else {
        Err(LinkageError::ClassFormat(format!(
            "invalid {} name: {}",
            format.describe(),
            name
        )))
    }
}

fn is_valid_unqualified_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(&['.', ';', '[', '/'][..])
}
