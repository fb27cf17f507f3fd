use crate::universe::KlassRef;
use std::cell::Cell;
use std::fmt;
use std::fmt::Debug;

/// The type of the value pushed on the operand stack by a *new* bytecode
/// before the corresponding constructor has been called on it.
///
/// The marker is named after the address of the originating *new*
/// instruction, e.g. `new@45`. The class that will eventually be
/// constructed may be unknown when the marker comes from an
/// `ITEM_Uninitialized` entry in a stack map rather than from decoding
/// the *new* instruction itself; in that case it is filled in later,
/// exactly once.
pub struct UninitializedObjectClass<'g> {
    name: String,
    initialized_type: Cell<Option<KlassRef<'g>>>,
}

impl<'g> UninitializedObjectClass<'g> {
    /// Prefix of the synthetic names given to these markers.
    pub const NAME_PREFIX: &'static str = "new@";

    /// Creates a marker for the *new* instruction at `address`.
    pub fn new(address: usize, initialized_type: Option<KlassRef<'g>>) -> Self {
        UninitializedObjectClass {
            name: format!("{}{}", Self::NAME_PREFIX, address),
            initialized_type: Cell::new(initialized_type),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Determines if the initialized type has been set. It will not have
    /// been if this instance came from a stack map entry.
    pub fn has_initialized_type(&self) -> bool {
        self.initialized_type.get().is_some()
    }

    /// Updates the initialized type. This must only be called once per
    /// instance.
    pub fn set_initialized_type(&self, initialized_type: KlassRef<'g>) {
        debug_assert!(
            self.initialized_type.get().is_none(),
            "cannot change initialized type"
        );
        self.initialized_type.set(Some(initialized_type));
    }

    /// The class specified by the operand of the *new* bytecode.
    ///
    /// Panics if the initialized type has not been set yet.
    pub fn initialized_type(&self) -> KlassRef<'g> {
        self.initialized_type
            .get()
            .expect("initialized type not yet set")
    }
}

impl<'g> Debug for UninitializedObjectClass<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
