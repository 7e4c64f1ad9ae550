//! Host object-model delegation
//!
//! Object keys hold [`ObjectHandle`]s into an object system the engine
//! does not own. The engine reports every copy of a non-null handle it
//! creates or destroys through this trait so the host can keep the
//! referenced objects alive; what retain/release actually do (reference
//! counts, pin tables, nothing at all) is the host's business.

use crate::handle::ObjectHandle;

/// Lifetime hints for host objects referenced from blackboard buffers.
///
/// Calls are balanced: the engine issues one `retain` per non-null handle
/// copy it writes into a live buffer and one `release` per copy it
/// destroys or overwrites. Null handles are never reported.
pub trait ObjectModel: Send {
    /// A buffer now holds a copy of `handle`.
    fn retain(&mut self, handle: ObjectHandle);

    /// A buffer no longer holds a copy of `handle`.
    fn release(&mut self, handle: ObjectHandle);
}

/// An object model that ignores all hints.
///
/// The default for hosts that track object lifetimes some other way, and
/// for tests that don't care about object keys.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObjectModel;

impl ObjectModel for NullObjectModel {
    fn retain(&mut self, _handle: ObjectHandle) {}

    fn release(&mut self, _handle: ObjectHandle) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_model_is_inert() {
        let mut model = NullObjectModel;
        let handle = ObjectHandle::new(9, 1);
        model.retain(handle);
        model.release(handle);
        model.release(handle);
    }
}
