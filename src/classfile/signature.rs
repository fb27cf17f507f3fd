use crate::universe::KlassRef;
use std::ptr;

/// A method's signature: its return type and declared parameter types,
/// resolved to classes.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MethodSignature<'g> {
    pub return_type: KlassRef<'g>,
    pub parameter_types: Vec<KlassRef<'g>>,
}

impl<'g> MethodSignature<'g> {
    pub fn new(return_type: KlassRef<'g>, parameter_types: Vec<KlassRef<'g>>) -> Self {
        MethodSignature {
            return_type,
            parameter_types,
        }
    }

    /// Gets the number of words used by the parameters, where double and
    /// long parameters use two words. One word is added for the implicit
    /// `this` parameter of a non-static method.
    pub fn parameters_length(&self, is_static: bool) -> usize {
        let mut length = if is_static { 0 } else { 1 };
        for parameter in &self.parameter_types {
            length += if parameter.is_double_word() { 2 } else { 1 };
        }
        length
    }

    /// Changes the return type of the signature. If the new return type
    /// differs from the existing one a new signature is created,
    /// otherwise this one is returned unchanged.
    pub fn modify_return_type(self, return_type: KlassRef<'g>) -> Self {
        if ptr::eq(return_type, self.return_type) {
            self
        } else {
            MethodSignature {
                return_type,
                parameter_types: self.parameter_types,
            }
        }
    }
}
