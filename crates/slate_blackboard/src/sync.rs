//! Instance synchronization
//!
//! Keys flagged `instance_synced` hold one value per chain, not one per
//! instance. A synchronized write resolves the owning level (the topmost
//! ancestor declaring the offset), writes the canonical buffer there, and
//! fans the identical bytes out to every registered listener transitively:
//! descendant compiled levels re-broadcast to their own listeners, and
//! instances apply the bytes to their copies. Identical bytes are
//! suppressed before any of that happens.
//!
//! The expectation flag never gates the write; it only decides whether
//! listening instances record the change for planner re-evaluation.

use log::trace;

use slate_core::ObjectHandle;

use crate::error::AccessError;
use crate::instance::InstanceId;
use crate::key::{KeyInfo, KeyKind};
use crate::runtime::BlackboardRuntime;
use crate::template::TemplateId;
use crate::value::{BlackboardEnum, BlackboardValue};

/// Whether the agent that performed a write anticipated it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// The change is part of the agent's own plan.
    Expected,
    /// The change came from outside the plan; listening instances whose
    /// key carries the broadcast trait record it.
    Unexpected,
}

/// One registered receiver of synchronized writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncListener {
    /// A descendant compiled level.
    Level(TemplateId),
    /// A live instance bound at this level.
    Instance(InstanceId),
}

impl BlackboardRuntime {
    /// Synchronized typed write through an instance, by key name.
    pub fn set_synced<T: BlackboardValue>(
        &mut self,
        instance: InstanceId,
        name: &str,
        value: T,
        expectation: Expectation,
    ) -> Result<(), AccessError> {
        let (level, info) = self.resolve_synced(instance, name)?;
        check_synced_kind(name, info, T::KIND)?;
        let mut scratch = [0u8; 16];
        value.write_to(&mut scratch, 0);
        self.broadcast(level, info, &scratch[..info.kind.size() as usize], expectation)
    }

    /// Synchronized typed write through an instance, by packed offset.
    pub fn set_synced_at<T: BlackboardValue>(
        &mut self,
        instance: InstanceId,
        offset: u16,
        value: T,
        expectation: Expectation,
    ) -> Result<(), AccessError> {
        let (level, name, info) = self.resolve_synced_at(instance, offset)?;
        check_synced_kind(&name, info, T::KIND)?;
        let mut scratch = [0u8; 16];
        value.write_to(&mut scratch, 0);
        self.broadcast(level, info, &scratch[..info.kind.size() as usize], expectation)
    }

    /// Synchronized enum write through an instance, by key name.
    pub fn set_synced_enum<E: BlackboardEnum>(
        &mut self,
        instance: InstanceId,
        name: &str,
        value: E,
        expectation: Expectation,
    ) -> Result<(), AccessError> {
        let (level, info) = self.resolve_synced(instance, name)?;
        check_synced_kind(name, info, KeyKind::Enum8)?;
        crate::compiled::check_enum_width::<E>()?;
        self.broadcast(level, info, &[value.to_byte()], expectation)
    }

    /// Synchronized enum write through an instance, by packed offset.
    pub fn set_synced_enum_at<E: BlackboardEnum>(
        &mut self,
        instance: InstanceId,
        offset: u16,
        value: E,
        expectation: Expectation,
    ) -> Result<(), AccessError> {
        let (level, name, info) = self.resolve_synced_at(instance, offset)?;
        check_synced_kind(&name, info, KeyKind::Enum8)?;
        crate::compiled::check_enum_width::<E>()?;
        self.broadcast(level, info, &[value.to_byte()], expectation)
    }

    fn resolve_synced(
        &self,
        instance: InstanceId,
        name: &str,
    ) -> Result<(TemplateId, KeyInfo), AccessError> {
        let instance = self.instances.get(instance).ok_or(AccessError::StaleHandle)?;
        let level = instance.template();
        let data = self.compiled.get(&level).ok_or(AccessError::StaleHandle)?;
        // A writer spawned against an earlier build of the level is not
        // registered on the rebuild; its writes must not reach it either.
        if data.revision != instance.revision() {
            return Err(AccessError::StaleHandle);
        }
        let info = data.resolve(name)?;
        Ok((level, info))
    }

    fn resolve_synced_at(
        &self,
        instance: InstanceId,
        offset: u16,
    ) -> Result<(TemplateId, String, KeyInfo), AccessError> {
        let instance = self.instances.get(instance).ok_or(AccessError::StaleHandle)?;
        let level = instance.template();
        let data = self.compiled.get(&level).ok_or(AccessError::StaleHandle)?;
        if data.revision != instance.revision() {
            return Err(AccessError::StaleHandle);
        }
        let entry = data
            .key_at(offset)
            .ok_or_else(|| AccessError::KeyNotFound(format!("offset {offset}")))?;
        Ok((level, entry.name.to_string(), entry.info))
    }

    /// Write `bytes` at the owning level of `info.offset` and fan them
    /// out. Suppressed entirely when the canonical bytes already match.
    pub(crate) fn broadcast(
        &mut self,
        level: TemplateId,
        info: KeyInfo,
        bytes: &[u8],
        expectation: Expectation,
    ) -> Result<(), AccessError> {
        let start = info.offset as usize;
        let end = start + bytes.len();

        let owning = self
            .owning_level(level, info.offset)
            .ok_or(AccessError::StaleHandle)?;
        let canonical = self.compiled.get(&owning).ok_or(AccessError::StaleHandle)?;
        if &canonical.buffer[start..end] == bytes {
            trace!("synced write at offset {} suppressed, value unchanged", info.offset);
            return Ok(());
        }

        // Phase one: walk listener lists from the owning level down and
        // collect every target id. Phase two mutates, so no borrows of
        // the listener lists may survive the walk.
        let mut levels = vec![owning];
        let mut instances: Vec<InstanceId> = Vec::new();
        let mut cursor = 0;
        while cursor < levels.len() {
            if let Some(data) = self.compiled.get(&levels[cursor]) {
                for listener in &data.listeners {
                    match *listener {
                        SyncListener::Level(child) => {
                            if !levels.contains(&child) {
                                levels.push(child);
                            }
                        }
                        SyncListener::Instance(id) => instances.push(id),
                    }
                }
            }
            cursor += 1;
        }

        let is_object = info.kind == KeyKind::Object;
        let new_handle = if is_object {
            ObjectHandle::read_from(bytes, 0)
        } else {
            ObjectHandle::NULL
        };

        for level_id in &levels {
            if let Some(data) = self.compiled.get_mut(level_id) {
                if is_object {
                    let old = ObjectHandle::read_from(&data.buffer, start);
                    if !old.is_null() {
                        self.objects.release(old);
                    }
                    if !new_handle.is_null() {
                        self.objects.retain(new_handle);
                    }
                }
                data.buffer[start..end].copy_from_slice(bytes);
            }
        }

        let record = expectation == Expectation::Unexpected && info.traits.broadcast_on_unexpected_change;
        for instance_id in &instances {
            if let Some(instance) = self.instances.get_mut(*instance_id) {
                debug_assert!(instance.buffer.len() >= end);
                if is_object {
                    let old = ObjectHandle::read_from(&instance.buffer, start);
                    if !old.is_null() {
                        self.objects.release(old);
                    }
                    if !new_handle.is_null() {
                        self.objects.retain(new_handle);
                    }
                }
                instance.buffer[start..end].copy_from_slice(bytes);
                if record {
                    instance.record_unexpected(info.offset);
                }
            }
        }

        trace!(
            "synced write at offset {} fanned out to {} level(s), {} instance(s)",
            info.offset,
            levels.len(),
            instances.len()
        );
        Ok(())
    }
}

fn check_synced_kind(name: &str, info: KeyInfo, requested: KeyKind) -> Result<(), AccessError> {
    if !info.traits.instance_synced {
        return Err(AccessError::InvalidOperation(format!(
            "key '{name}' is not instance-synced"
        )));
    }
    crate::compiled::check_kind(name, info.kind, requested)
}
