//! Class file loading and linking for a constrained-device JVM
//!
//! This crate implements the front half of class linking: it parses the
//! JVM class file format (major versions 45-48, the JDK 1.1-1.4 range
//! supported by CLDC), validates it against the structural and semantic
//! rules of the format, resolves symbolic references through the constant
//! pool against a [`Universe`] of interned class handles, and installs
//! the fully linked definition onto the class being loaded.
//!
//! ### Simple example
//!
//! ```
//! use squawk_loader::*;
//!
//! // The universe owns every class handle; classes are interned by name.
//! let arenas = UniverseArenas::new();
//! let universe = Universe::new(&arenas);
//!
//! // Class files are located through a classpath. An empty one means
//! // nothing can be loaded.
//! let classpath = MapClasspath::new();
//! let loader = ClassFileLoader::new(&universe, &classpath);
//!
//! let missing = universe.klass_for_name("com.acme.Missing").unwrap();
//! assert_eq!(missing.state(), KlassState::Defined);
//!
//! // Opening the class file fails, which surfaces as NoClassDefFound
//! // and leaves the handle untouched.
//! let err = loader.load(missing).unwrap_err();
//! assert!(matches!(err, LinkageError::NoClassDefFound(_)));
//! assert_eq!(missing.state(), KlassState::Defined);
//! ```
//!
//! Loading runs to completion on the calling thread. A class that fails
//! to load after its class file was opened is permanently poisoned
//! ([`KlassState::Error`]) and must not be retried.

mod classfile;
mod classpath;
mod descriptors;
mod errors;
mod modifiers;
mod names;
mod pragma;
mod universe;

pub use classfile::*;
pub use classpath::*;
pub use descriptors::*;
pub use errors::*;
pub use modifiers::*;
pub use names::*;
pub use pragma::*;
pub use universe::*;
