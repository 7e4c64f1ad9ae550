//! Typed values over packed blackboard bytes
//!
//! One [`BlackboardValue`] impl per key kind maps a Rust value onto its
//! fixed-size packed encoding. Layouts are size-sorted rather than
//! alignment-sorted, so every multi-byte access goes through unaligned
//! reads and writes; [`bytemuck`] keeps that safe in the validated tier.
//!
//! Enums are not `BlackboardValue`s: they ride through [`BlackboardEnum`]
//! as a single raw byte so the validated tier can reject backing types
//! wider than the one byte the layout reserves.

use glam::{Quat, Vec3};
use slate_core::ObjectHandle;

use crate::key::KeyKind;

/// A value that can live in a blackboard key.
///
/// `read_from`/`write_to` expect `offset + KIND.size()` to be inside
/// `bytes`; compiled layouts uphold that for every key they hand out.
pub trait BlackboardValue: Copy {
    /// The key kind this value stores as.
    const KIND: KeyKind;

    /// Decode a value from its packed bytes.
    fn read_from(bytes: &[u8], offset: usize) -> Self;

    /// Encode the value into its packed bytes.
    fn write_to(self, bytes: &mut [u8], offset: usize);
}

impl BlackboardValue for bool {
    const KIND: KeyKind = KeyKind::Boolean;

    #[inline]
    fn read_from(bytes: &[u8], offset: usize) -> Self {
        bytes[offset] != 0
    }

    #[inline]
    fn write_to(self, bytes: &mut [u8], offset: usize) {
        bytes[offset] = self as u8;
    }
}

impl BlackboardValue for i32 {
    const KIND: KeyKind = KeyKind::Integer;

    #[inline]
    fn read_from(bytes: &[u8], offset: usize) -> Self {
        bytemuck::pod_read_unaligned(&bytes[offset..offset + 4])
    }

    #[inline]
    fn write_to(self, bytes: &mut [u8], offset: usize) {
        bytes[offset..offset + 4].copy_from_slice(bytemuck::bytes_of(&self));
    }
}

impl BlackboardValue for f32 {
    const KIND: KeyKind = KeyKind::Float;

    #[inline]
    fn read_from(bytes: &[u8], offset: usize) -> Self {
        bytemuck::pod_read_unaligned(&bytes[offset..offset + 4])
    }

    #[inline]
    fn write_to(self, bytes: &mut [u8], offset: usize) {
        bytes[offset..offset + 4].copy_from_slice(bytemuck::bytes_of(&self));
    }
}

impl BlackboardValue for Vec3 {
    const KIND: KeyKind = KeyKind::Vector3;

    #[inline]
    fn read_from(bytes: &[u8], offset: usize) -> Self {
        let array: [f32; 3] = bytemuck::pod_read_unaligned(&bytes[offset..offset + 12]);
        Vec3::from_array(array)
    }

    #[inline]
    fn write_to(self, bytes: &mut [u8], offset: usize) {
        let array = self.to_array();
        bytes[offset..offset + 12].copy_from_slice(bytemuck::bytes_of(&array));
    }
}

impl BlackboardValue for Quat {
    const KIND: KeyKind = KeyKind::Quaternion;

    #[inline]
    fn read_from(bytes: &[u8], offset: usize) -> Self {
        let array: [f32; 4] = bytemuck::pod_read_unaligned(&bytes[offset..offset + 16]);
        Quat::from_array(array)
    }

    #[inline]
    fn write_to(self, bytes: &mut [u8], offset: usize) {
        let array = self.to_array();
        bytes[offset..offset + 16].copy_from_slice(bytemuck::bytes_of(&array));
    }
}

impl BlackboardValue for ObjectHandle {
    const KIND: KeyKind = KeyKind::Object;

    #[inline]
    fn read_from(bytes: &[u8], offset: usize) -> Self {
        let bits: u32 = bytemuck::pod_read_unaligned(&bytes[offset..offset + 4]);
        ObjectHandle::from_bits(bits)
    }

    #[inline]
    fn write_to(self, bytes: &mut [u8], offset: usize) {
        bytes[offset..offset + 4].copy_from_slice(bytemuck::bytes_of(&self.to_bits()));
    }
}

/// A user enum storable in a 1-byte enum key.
///
/// Implementors map their variants onto raw bytes; `from_byte` must accept
/// any byte previously produced by `to_byte`. The validated accessors
/// reject implementors wider than one byte with
/// [`AccessError::Overflow`](crate::AccessError::Overflow).
pub trait BlackboardEnum: Copy {
    /// Decode from the stored byte.
    fn from_byte(byte: u8) -> Self;

    /// Encode to the stored byte.
    fn to_byte(self) -> u8;
}
