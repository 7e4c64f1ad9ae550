//! Unvalidated blackboard access
//!
//! The trusted tier of the accessor API, for callers that resolved their
//! [`KeyInfo`] once at bind time: the scripted-function VM and batch
//! jobs. Nothing here looks up names, checks kinds, or touches object
//! bookkeeping: a wrong offset or kind is undefined behavior, which is
//! why every accessor is an `unsafe fn` and the whole tier lives in this
//! module. Debug builds carry `debug_assert!` checks on the [`KeyInfo`]
//! forms; release builds check nothing.

use glam::{Quat, Vec3};

use slate_core::ObjectHandle;

use crate::key::{KeyInfo, KeyKind};
use crate::value::BlackboardEnum;

#[inline(always)]
unsafe fn read<T: Copy>(bytes: &[u8], offset: u16) -> T {
    debug_assert!(offset as usize + core::mem::size_of::<T>() <= bytes.len());
    core::ptr::read_unaligned(bytes.as_ptr().add(offset as usize) as *const T)
}

#[inline(always)]
unsafe fn write<T: Copy>(bytes: &mut [u8], offset: u16, value: T) {
    debug_assert!(offset as usize + core::mem::size_of::<T>() <= bytes.len());
    core::ptr::write_unaligned(bytes.as_mut_ptr().add(offset as usize) as *mut T, value);
}

/// Read-only unvalidated access to one packed buffer.
#[derive(Clone, Copy)]
pub struct RawView<'a> {
    bytes: &'a [u8],
}

impl<'a> RawView<'a> {
    /// Wrap a packed buffer.
    #[inline]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Buffer length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// # Safety
    /// `offset` must be the compiled offset of a boolean key in this
    /// buffer's layout.
    #[inline]
    pub unsafe fn boolean_at(&self, offset: u16) -> bool {
        self.read_at::<u8>(offset) != 0
    }

    /// # Safety
    /// `offset` must be the compiled offset of an integer key in this
    /// buffer's layout.
    #[inline]
    pub unsafe fn integer_at(&self, offset: u16) -> i32 {
        self.read_at(offset)
    }

    /// # Safety
    /// `offset` must be the compiled offset of a float key in this
    /// buffer's layout.
    #[inline]
    pub unsafe fn float_at(&self, offset: u16) -> f32 {
        self.read_at(offset)
    }

    /// # Safety
    /// `offset` must be the compiled offset of a vector key in this
    /// buffer's layout.
    #[inline]
    pub unsafe fn vector3_at(&self, offset: u16) -> Vec3 {
        Vec3::from_array(self.read_at(offset))
    }

    /// # Safety
    /// `offset` must be the compiled offset of a quaternion key in this
    /// buffer's layout.
    #[inline]
    pub unsafe fn quaternion_at(&self, offset: u16) -> Quat {
        Quat::from_array(self.read_at(offset))
    }

    /// # Safety
    /// `offset` must be the compiled offset of an enum key in this
    /// buffer's layout, and `E` the 1-byte enum the key was authored with.
    #[inline]
    pub unsafe fn enum_at<E: BlackboardEnum>(&self, offset: u16) -> E {
        E::from_byte(self.read_at(offset))
    }

    /// # Safety
    /// `offset` must be the compiled offset of an object key in this
    /// buffer's layout.
    #[inline]
    pub unsafe fn object_at(&self, offset: u16) -> ObjectHandle {
        ObjectHandle::from_bits(self.read_at(offset))
    }

    /// # Safety
    /// `info` must come from the compiled level this buffer belongs to
    /// and describe a boolean key.
    #[inline]
    pub unsafe fn boolean(&self, info: KeyInfo) -> bool {
        debug_assert!(info.kind == KeyKind::Boolean, "key is not a boolean");
        self.boolean_at(info.offset)
    }

    /// # Safety
    /// `info` must come from the compiled level this buffer belongs to
    /// and describe an integer key.
    #[inline]
    pub unsafe fn integer(&self, info: KeyInfo) -> i32 {
        debug_assert!(info.kind == KeyKind::Integer, "key is not an integer");
        self.integer_at(info.offset)
    }

    /// # Safety
    /// `info` must come from the compiled level this buffer belongs to
    /// and describe a float key.
    #[inline]
    pub unsafe fn float(&self, info: KeyInfo) -> f32 {
        debug_assert!(info.kind == KeyKind::Float, "key is not a float");
        self.float_at(info.offset)
    }

    /// # Safety
    /// `info` must come from the compiled level this buffer belongs to
    /// and describe a vector key.
    #[inline]
    pub unsafe fn vector3(&self, info: KeyInfo) -> Vec3 {
        debug_assert!(info.kind == KeyKind::Vector3, "key is not a vector");
        self.vector3_at(info.offset)
    }

    /// # Safety
    /// `info` must come from the compiled level this buffer belongs to
    /// and describe a quaternion key.
    #[inline]
    pub unsafe fn quaternion(&self, info: KeyInfo) -> Quat {
        debug_assert!(info.kind == KeyKind::Quaternion, "key is not a quaternion");
        self.quaternion_at(info.offset)
    }

    /// # Safety
    /// `info` must come from the compiled level this buffer belongs to
    /// and describe an enum key backed by `E`.
    #[inline]
    pub unsafe fn enum_value<E: BlackboardEnum>(&self, info: KeyInfo) -> E {
        debug_assert!(info.kind == KeyKind::Enum8, "key is not an enum");
        self.enum_at(info.offset)
    }

    /// # Safety
    /// `info` must come from the compiled level this buffer belongs to
    /// and describe an object key.
    #[inline]
    pub unsafe fn object(&self, info: KeyInfo) -> ObjectHandle {
        debug_assert!(info.kind == KeyKind::Object, "key is not an object");
        self.object_at(info.offset)
    }

    #[inline(always)]
    unsafe fn read_at<T: Copy>(&self, offset: u16) -> T {
        read(self.bytes, offset)
    }
}

/// Mutable unvalidated access to one packed buffer.
///
/// Writes land directly in the bytes: no change suppression, no
/// synchronization fan-out, no object retain/release. Reads reborrow via
/// [`RawViewMut::view`].
pub struct RawViewMut<'a> {
    bytes: &'a mut [u8],
}

impl<'a> RawViewMut<'a> {
    /// Wrap a packed buffer.
    #[inline]
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    /// Read-only view over the same bytes.
    #[inline]
    pub fn view(&self) -> RawView<'_> {
        RawView::new(self.bytes)
    }

    /// # Safety
    /// `offset` must be the compiled offset of a boolean key in this
    /// buffer's layout.
    #[inline]
    pub unsafe fn set_boolean_at(&mut self, offset: u16, value: bool) {
        write(self.bytes, offset, value as u8);
    }

    /// # Safety
    /// `offset` must be the compiled offset of an integer key in this
    /// buffer's layout.
    #[inline]
    pub unsafe fn set_integer_at(&mut self, offset: u16, value: i32) {
        write(self.bytes, offset, value);
    }

    /// # Safety
    /// `offset` must be the compiled offset of a float key in this
    /// buffer's layout.
    #[inline]
    pub unsafe fn set_float_at(&mut self, offset: u16, value: f32) {
        write(self.bytes, offset, value);
    }

    /// # Safety
    /// `offset` must be the compiled offset of a vector key in this
    /// buffer's layout.
    #[inline]
    pub unsafe fn set_vector3_at(&mut self, offset: u16, value: Vec3) {
        write(self.bytes, offset, value.to_array());
    }

    /// # Safety
    /// `offset` must be the compiled offset of a quaternion key in this
    /// buffer's layout.
    #[inline]
    pub unsafe fn set_quaternion_at(&mut self, offset: u16, value: Quat) {
        write(self.bytes, offset, value.to_array());
    }

    /// # Safety
    /// `offset` must be the compiled offset of an enum key in this
    /// buffer's layout, and `E` the 1-byte enum the key was authored with.
    #[inline]
    pub unsafe fn set_enum_at<E: BlackboardEnum>(&mut self, offset: u16, value: E) {
        write(self.bytes, offset, value.to_byte());
    }

    /// # Safety
    /// `offset` must be the compiled offset of an object key in this
    /// buffer's layout. No retain/release is performed on either the old
    /// or the new handle.
    #[inline]
    pub unsafe fn set_object_at(&mut self, offset: u16, value: ObjectHandle) {
        write(self.bytes, offset, value.to_bits());
    }

    /// # Safety
    /// `info` must come from the compiled level this buffer belongs to
    /// and describe a boolean key.
    #[inline]
    pub unsafe fn set_boolean(&mut self, info: KeyInfo, value: bool) {
        debug_assert!(info.kind == KeyKind::Boolean, "key is not a boolean");
        self.set_boolean_at(info.offset, value);
    }

    /// # Safety
    /// `info` must come from the compiled level this buffer belongs to
    /// and describe an integer key.
    #[inline]
    pub unsafe fn set_integer(&mut self, info: KeyInfo, value: i32) {
        debug_assert!(info.kind == KeyKind::Integer, "key is not an integer");
        self.set_integer_at(info.offset, value);
    }

    /// # Safety
    /// `info` must come from the compiled level this buffer belongs to
    /// and describe a float key.
    #[inline]
    pub unsafe fn set_float(&mut self, info: KeyInfo, value: f32) {
        debug_assert!(info.kind == KeyKind::Float, "key is not a float");
        self.set_float_at(info.offset, value);
    }

    /// # Safety
    /// `info` must come from the compiled level this buffer belongs to
    /// and describe a vector key.
    #[inline]
    pub unsafe fn set_vector3(&mut self, info: KeyInfo, value: Vec3) {
        debug_assert!(info.kind == KeyKind::Vector3, "key is not a vector");
        self.set_vector3_at(info.offset, value);
    }

    /// # Safety
    /// `info` must come from the compiled level this buffer belongs to
    /// and describe a quaternion key.
    #[inline]
    pub unsafe fn set_quaternion(&mut self, info: KeyInfo, value: Quat) {
        debug_assert!(info.kind == KeyKind::Quaternion, "key is not a quaternion");
        self.set_quaternion_at(info.offset, value);
    }

    /// # Safety
    /// `info` must come from the compiled level this buffer belongs to
    /// and describe an enum key backed by `E`.
    #[inline]
    pub unsafe fn set_enum<E: BlackboardEnum>(&mut self, info: KeyInfo, value: E) {
        debug_assert!(info.kind == KeyKind::Enum8, "key is not an enum");
        self.set_enum_at(info.offset, value);
    }

    /// # Safety
    /// `info` must come from the compiled level this buffer belongs to
    /// and describe an object key. No retain/release is performed.
    #[inline]
    pub unsafe fn set_object(&mut self, info: KeyInfo, value: ObjectHandle) {
        debug_assert!(info.kind == KeyKind::Object, "key is not an object");
        self.set_object_at(info.offset, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyTraits;

    #[test]
    fn test_offset_forms_round_trip() {
        let mut bytes = vec![0u8; 37];
        let mut view = RawViewMut::new(&mut bytes);
        unsafe {
            view.set_boolean_at(0, true);
            view.set_integer_at(1, -77);
            view.set_float_at(5, 2.5);
            view.set_vector3_at(9, Vec3::new(1.0, 2.0, 3.0));
            view.set_quaternion_at(21, Quat::from_xyzw(0.0, 1.0, 0.0, 0.0));

            let read = view.view();
            assert!(read.boolean_at(0));
            assert_eq!(read.integer_at(1), -77);
            assert_eq!(read.float_at(5), 2.5);
            assert_eq!(read.vector3_at(9), Vec3::new(1.0, 2.0, 3.0));
            assert_eq!(read.quaternion_at(21), Quat::from_xyzw(0.0, 1.0, 0.0, 0.0));
        }
    }

    #[test]
    fn test_info_forms_check_nothing_in_release() {
        let info = KeyInfo {
            offset: 2,
            index: 0,
            kind: KeyKind::Object,
            traits: KeyTraits::NONE,
        };
        let mut bytes = vec![0u8; 8];
        let handle = ObjectHandle::new(9, 1);
        let mut view = RawViewMut::new(&mut bytes);
        unsafe {
            view.set_object(info, handle);
            assert_eq!(view.view().object(info), handle);
        }
    }
}
