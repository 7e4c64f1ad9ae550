//! Opaque handles to host-owned objects
//!
//! Blackboard object keys never store pointers into the host's object
//! system; they store a 4-byte [`ObjectHandle`] and delegate lifetime
//! hints to an [`ObjectModel`](crate::ObjectModel). The handle packs a
//! 24-bit slot index with an 8-bit generation so a recycled slot can be
//! told apart from the object that used to live there.

use core::fmt;
use serde::{Deserialize, Serialize};

/// A 4-byte opaque reference to an object owned by the host application.
///
/// The engine stores and compares only the numeric value; resolving it to
/// an actual object is the host's job. `ObjectHandle::NULL` is the absent
/// value and is what object keys default to unless authored otherwise.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct ObjectHandle(u32);

impl ObjectHandle {
    /// Maximum slot index (24 bits).
    pub const MAX_INDEX: u32 = (1 << 24) - 1;

    /// The absent object.
    pub const NULL: Self = Self(u32::MAX);

    /// Pack a slot index and generation into a handle.
    #[inline]
    pub const fn new(index: u32, generation: u8) -> Self {
        debug_assert!(index <= Self::MAX_INDEX);
        Self((generation as u32) << 24 | index)
    }

    /// Whether this is the null handle.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == u32::MAX
    }

    /// The slot index portion.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0 & Self::MAX_INDEX
    }

    /// The generation portion.
    #[inline]
    pub const fn generation(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// The raw 32-bit value, as stored in a packed blackboard buffer.
    #[inline]
    pub const fn to_bits(self) -> u32 {
        self.0
    }

    /// Rebuild a handle from its raw stored value.
    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }
}

impl Default for ObjectHandle {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "ObjectHandle(null)")
        } else {
            write!(f, "ObjectHandle({}v{})", self.index(), self.generation())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack() {
        let h = ObjectHandle::new(1234, 7);
        assert_eq!(h.index(), 1234);
        assert_eq!(h.generation(), 7);
        assert!(!h.is_null());
    }

    #[test]
    fn test_null_roundtrip() {
        let h = ObjectHandle::NULL;
        assert!(h.is_null());
        assert_eq!(ObjectHandle::from_bits(h.to_bits()), h);
        assert_eq!(ObjectHandle::default(), ObjectHandle::NULL);
    }

    #[test]
    fn test_bits_are_stable() {
        let h = ObjectHandle::new(42, 3);
        assert_eq!(ObjectHandle::from_bits(h.to_bits()), h);
        assert_eq!(core::mem::size_of::<ObjectHandle>(), 4);
    }
}
