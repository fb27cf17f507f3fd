//! Reading class files: the structured reader, the constant pool, the
//! member models and the loader itself.

mod constant_pool;
mod field;
mod loader;
mod method;
mod reader;
mod signature;

pub use constant_pool::*;
pub use field::*;
pub use loader::*;
pub use method::*;
pub use reader::*;
pub use signature::*;
