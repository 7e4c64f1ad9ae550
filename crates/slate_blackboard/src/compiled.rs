//! Compiled blackboard levels
//!
//! [`CompiledData`] is the packed product of template compilation: one
//! fixed-layout byte buffer holding every key of the inheritance chain,
//! a name→offset map, and an offset→descriptor map. Offsets never change
//! for the lifetime of a compiled level; instances and descendant levels
//! rely on that stability.

use std::collections::HashMap;
use std::ops::Index;

use crate::error::AccessError;
use crate::key::{KeyInfo, KeyKind};
use crate::sync::SyncListener;
use crate::template::TemplateId;
use crate::unchecked::RawView;
use crate::value::{BlackboardEnum, BlackboardValue};

static INVALID_INFO: KeyInfo = KeyInfo::INVALID;

/// One key's compiled record: its name plus the layout descriptor.
#[derive(Debug, Clone)]
pub struct KeyEntry {
    /// Key name, unique across the chain.
    pub name: Box<str>,
    /// Layout descriptor.
    pub info: KeyInfo,
}

/// The compiled form of one blackboard level.
///
/// Reads are validated here; writes to the canonical buffer go through
/// the runtime so synchronized fan-out and object bookkeeping stay in one
/// place.
#[derive(Debug)]
pub struct CompiledData {
    pub(crate) template: TemplateId,
    pub(crate) revision: u32,
    pub(crate) parent: Option<TemplateId>,
    pub(crate) parent_size: u16,
    pub(crate) size: u16,
    pub(crate) key_count: u16,
    pub(crate) buffer: Vec<u8>,
    pub(crate) offsets: HashMap<Box<str>, u16>,
    pub(crate) descriptors: HashMap<u16, KeyEntry>,
    pub(crate) listeners: Vec<SyncListener>,
}

impl CompiledData {
    /// The template this level was compiled from.
    #[inline]
    pub fn template(&self) -> TemplateId {
        self.template
    }

    /// Runtime-wide build counter value assigned to this compile.
    ///
    /// A template freed and compiled again gets a fresh revision, so
    /// instances spawned against the old build stay distinguishable from
    /// the rebuild even though the template id is the same.
    #[inline]
    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// The parent level, if any.
    #[inline]
    pub fn parent(&self) -> Option<TemplateId> {
        self.parent
    }

    /// Total packed size in bytes, inherited prefix included.
    #[inline]
    pub fn size(&self) -> u16 {
        self.size
    }

    /// Size of the inherited prefix in bytes.
    #[inline]
    pub fn parent_size(&self) -> u16 {
        self.parent_size
    }

    /// Number of keys across the chain.
    #[inline]
    pub fn key_count(&self) -> u16 {
        self.key_count
    }

    /// The canonical packed buffer.
    #[inline]
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Look up a key's descriptor by name.
    ///
    /// Absent names return [`KeyInfo::INVALID`] rather than an error, so
    /// callers can probe and cache without a `Result` in the way.
    pub fn key_info(&self, name: &str) -> KeyInfo {
        match self.offsets.get(name) {
            Some(offset) => self.descriptors[offset].info,
            None => KeyInfo::INVALID,
        }
    }

    /// The descriptor record at a packed offset, if a key starts there.
    pub fn key_at(&self, offset: u16) -> Option<&KeyEntry> {
        self.descriptors.get(&offset)
    }

    /// Every compiled key record, own and inherited. Unordered.
    pub fn keys(&self) -> impl Iterator<Item = &KeyEntry> {
        self.descriptors.values()
    }

    /// Resolve a name to its descriptor or report the miss.
    pub fn resolve(&self, name: &str) -> Result<KeyInfo, AccessError> {
        let info = self.key_info(name);
        if info.is_valid() {
            Ok(info)
        } else {
            Err(AccessError::KeyNotFound(name.to_string()))
        }
    }

    pub(crate) fn entry_at(&self, offset: u16) -> Result<&KeyEntry, AccessError> {
        self.descriptors
            .get(&offset)
            .ok_or_else(|| AccessError::KeyNotFound(format!("offset {offset}")))
    }

    /// Read a typed value from the canonical buffer by key name.
    pub fn get<T: BlackboardValue>(&self, name: &str) -> Result<T, AccessError> {
        let info = self.resolve(name)?;
        check_kind(name, info.kind, T::KIND)?;
        Ok(T::read_from(&self.buffer, info.offset as usize))
    }

    /// Read a typed value from the canonical buffer by packed offset.
    pub fn get_at<T: BlackboardValue>(&self, offset: u16) -> Result<T, AccessError> {
        let entry = self.entry_at(offset)?;
        check_kind(&entry.name, entry.info.kind, T::KIND)?;
        Ok(T::read_from(&self.buffer, offset as usize))
    }

    /// Read an enum value from the canonical buffer by key name.
    pub fn get_enum<E: BlackboardEnum>(&self, name: &str) -> Result<E, AccessError> {
        let info = self.resolve(name)?;
        check_kind(name, info.kind, KeyKind::Enum8)?;
        check_enum_width::<E>()?;
        Ok(E::from_byte(self.buffer[info.offset as usize]))
    }

    /// Read an enum value from the canonical buffer by packed offset.
    pub fn get_enum_at<E: BlackboardEnum>(&self, offset: u16) -> Result<E, AccessError> {
        let entry = self.entry_at(offset)?;
        check_kind(&entry.name, entry.info.kind, KeyKind::Enum8)?;
        check_enum_width::<E>()?;
        Ok(E::from_byte(self.buffer[offset as usize]))
    }

    /// Copy the canonical buffer into `destination`, returning the number
    /// of bytes copied. Copies the overlapping prefix when `destination`
    /// is shorter.
    pub fn copy_buffer_to(&self, destination: &mut [u8]) -> usize {
        let copied = self.buffer.len().min(destination.len());
        destination[..copied].copy_from_slice(&self.buffer[..copied]);
        copied
    }

    /// Unvalidated read access to the canonical buffer.
    pub fn raw_view(&self) -> RawView<'_> {
        RawView::new(&self.buffer)
    }

    /// Number of attached sync listeners.
    #[inline]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn add_listener(&mut self, listener: SyncListener) {
        self.listeners.push(listener);
    }

    pub(crate) fn remove_listener(&mut self, listener: SyncListener) {
        self.listeners.retain(|candidate| *candidate != listener);
    }
}

/// Enum accessors demand a 1-byte backing type.
pub(crate) fn check_enum_width<E: BlackboardEnum>() -> Result<(), AccessError> {
    let width = core::mem::size_of::<E>();
    if width == 1 {
        Ok(())
    } else {
        Err(AccessError::Overflow { width })
    }
}

/// A stored kind must match the requested kind exactly.
pub(crate) fn check_kind(key: &str, stored: KeyKind, requested: KeyKind) -> Result<(), AccessError> {
    if stored == requested {
        Ok(())
    } else {
        Err(AccessError::TypeMismatch {
            key: key.to_string(),
            stored,
            requested,
        })
    }
}

impl Index<&str> for CompiledData {
    type Output = KeyInfo;

    /// Sentinel-probing form of [`CompiledData::key_info`].
    fn index(&self, name: &str) -> &KeyInfo {
        match self.offsets.get(name) {
            Some(offset) => &self.descriptors[offset].info,
            None => &INVALID_INFO,
        }
    }
}
