//! Per-agent blackboard access
//!
//! [`AgentBoard`] is the validated accessor surface one agent sees:
//! typed reads from its instance buffer and typed writes that route
//! themselves. Instance-synced keys go through the synchronization
//! broadcaster; everything else lands in the instance's own bytes. The
//! facade borrows the runtime mutably, so an agent's accesses are
//! serialized with every other runtime operation by construction.

use slate_core::ObjectHandle;

use crate::compiled::{check_enum_width, check_kind, CompiledData};
use crate::error::AccessError;
use crate::instance::{BlackboardInstance, InstanceId};
use crate::key::{KeyInfo, KeyKind};
use crate::runtime::BlackboardRuntime;
use crate::sync::Expectation;
use crate::template::TemplateId;
use crate::unchecked::{RawView, RawViewMut};
use crate::value::{BlackboardEnum, BlackboardValue};

/// Validated access to one live instance.
pub struct AgentBoard<'rt> {
    runtime: &'rt mut BlackboardRuntime,
    id: InstanceId,
    template: TemplateId,
}

impl<'rt> AgentBoard<'rt> {
    pub(crate) fn new(
        runtime: &'rt mut BlackboardRuntime,
        id: InstanceId,
        template: TemplateId,
    ) -> Self {
        Self {
            runtime,
            id,
            template,
        }
    }

    /// The instance this facade accesses.
    #[inline]
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// The level the instance is bound to.
    #[inline]
    pub fn template(&self) -> TemplateId {
        self.template
    }

    /// Descriptor probe by name; absent names, freed levels, and levels
    /// rebuilt since the spawn all return [`KeyInfo::INVALID`].
    pub fn key_info(&self, name: &str) -> KeyInfo {
        self.level().map_or(KeyInfo::INVALID, |data| data.key_info(name))
    }

    fn instance(&self) -> Result<&BlackboardInstance, AccessError> {
        self.runtime.instance(self.id).ok_or(AccessError::StaleHandle)
    }

    /// The compiled level this instance was spawned against.
    ///
    /// Fails closed once the level is freed, and stays failed if the
    /// template is compiled again under the same id: the rebuild may lay
    /// keys out differently, so the survivor's bytes cannot be read
    /// through the new descriptors.
    fn level(&self) -> Result<&CompiledData, AccessError> {
        let instance = self.instance()?;
        let data = self
            .runtime
            .compiled(self.template)
            .ok_or(AccessError::StaleHandle)?;
        if data.revision() != instance.revision() {
            return Err(AccessError::StaleHandle);
        }
        Ok(data)
    }

    fn resolve(&self, name: &str) -> Result<KeyInfo, AccessError> {
        self.level()?.resolve(name)
    }

    fn resolve_at(&self, offset: u16) -> Result<(String, KeyInfo), AccessError> {
        let entry = self.level()?.entry_at(offset)?;
        Ok((entry.name.to_string(), entry.info))
    }

    /// Read a typed value by key name.
    pub fn get<T: BlackboardValue>(&self, name: &str) -> Result<T, AccessError> {
        let info = self.resolve(name)?;
        check_kind(name, info.kind, T::KIND)?;
        Ok(T::read_from(self.instance()?.buffer(), info.offset as usize))
    }

    /// Read a typed value by packed offset.
    pub fn get_at<T: BlackboardValue>(&self, offset: u16) -> Result<T, AccessError> {
        let (name, info) = self.resolve_at(offset)?;
        check_kind(&name, info.kind, T::KIND)?;
        Ok(T::read_from(self.instance()?.buffer(), offset as usize))
    }

    /// Read an enum value by key name.
    pub fn get_enum<E: BlackboardEnum>(&self, name: &str) -> Result<E, AccessError> {
        let info = self.resolve(name)?;
        check_kind(name, info.kind, KeyKind::Enum8)?;
        check_enum_width::<E>()?;
        Ok(E::from_byte(self.instance()?.buffer()[info.offset as usize]))
    }

    /// Read an enum value by packed offset.
    pub fn get_enum_at<E: BlackboardEnum>(&self, offset: u16) -> Result<E, AccessError> {
        let (name, info) = self.resolve_at(offset)?;
        check_kind(&name, info.kind, KeyKind::Enum8)?;
        check_enum_width::<E>()?;
        Ok(E::from_byte(self.instance()?.buffer()[offset as usize]))
    }

    /// Write a typed value by key name, treating the change as expected.
    pub fn set<T: BlackboardValue>(&mut self, name: &str, value: T) -> Result<(), AccessError> {
        self.set_with(name, value, Expectation::Expected)
    }

    /// Write a typed value by key name with an explicit expectation.
    pub fn set_with<T: BlackboardValue>(
        &mut self,
        name: &str,
        value: T,
        expectation: Expectation,
    ) -> Result<(), AccessError> {
        let info = self.resolve(name)?;
        check_kind(name, info.kind, T::KIND)?;
        let mut scratch = [0u8; 16];
        value.write_to(&mut scratch, 0);
        self.apply(info, &scratch[..info.kind.size() as usize], expectation)
    }

    /// Write a typed value by packed offset, treating the change as
    /// expected.
    pub fn set_at<T: BlackboardValue>(&mut self, offset: u16, value: T) -> Result<(), AccessError> {
        self.set_at_with(offset, value, Expectation::Expected)
    }

    /// Write a typed value by packed offset with an explicit expectation.
    pub fn set_at_with<T: BlackboardValue>(
        &mut self,
        offset: u16,
        value: T,
        expectation: Expectation,
    ) -> Result<(), AccessError> {
        let (name, info) = self.resolve_at(offset)?;
        check_kind(&name, info.kind, T::KIND)?;
        let mut scratch = [0u8; 16];
        value.write_to(&mut scratch, 0);
        self.apply(info, &scratch[..info.kind.size() as usize], expectation)
    }

    /// Write an enum value by key name, treating the change as expected.
    pub fn set_enum<E: BlackboardEnum>(&mut self, name: &str, value: E) -> Result<(), AccessError> {
        self.set_enum_with(name, value, Expectation::Expected)
    }

    /// Write an enum value by key name with an explicit expectation.
    pub fn set_enum_with<E: BlackboardEnum>(
        &mut self,
        name: &str,
        value: E,
        expectation: Expectation,
    ) -> Result<(), AccessError> {
        let info = self.resolve(name)?;
        check_kind(name, info.kind, KeyKind::Enum8)?;
        check_enum_width::<E>()?;
        self.apply(info, &[value.to_byte()], expectation)
    }

    /// Write an enum value by packed offset, treating the change as
    /// expected.
    pub fn set_enum_at<E: BlackboardEnum>(
        &mut self,
        offset: u16,
        value: E,
    ) -> Result<(), AccessError> {
        self.set_enum_at_with(offset, value, Expectation::Expected)
    }

    /// Write an enum value by packed offset with an explicit expectation.
    pub fn set_enum_at_with<E: BlackboardEnum>(
        &mut self,
        offset: u16,
        value: E,
        expectation: Expectation,
    ) -> Result<(), AccessError> {
        let (name, info) = self.resolve_at(offset)?;
        check_kind(&name, info.kind, KeyKind::Enum8)?;
        check_enum_width::<E>()?;
        self.apply(info, &[value.to_byte()], expectation)
    }

    /// Route an encoded write: synced keys broadcast through the owning
    /// level, local keys land in this instance only. Unchanged bytes are
    /// suppressed on both paths.
    fn apply(
        &mut self,
        info: KeyInfo,
        bytes: &[u8],
        expectation: Expectation,
    ) -> Result<(), AccessError> {
        if info.traits.instance_synced {
            return self.runtime.broadcast(self.template, info, bytes, expectation);
        }

        let start = info.offset as usize;
        let end = start + bytes.len();
        let instance = self
            .runtime
            .instances
            .get_mut(self.id)
            .ok_or(AccessError::StaleHandle)?;
        if &instance.buffer[start..end] == bytes {
            return Ok(());
        }
        if info.kind == KeyKind::Object {
            let old = ObjectHandle::read_from(&instance.buffer, start);
            let new = ObjectHandle::read_from(bytes, 0);
            if !old.is_null() {
                self.runtime.objects.release(old);
            }
            if !new.is_null() {
                self.runtime.objects.retain(new);
            }
        }
        instance.buffer[start..end].copy_from_slice(bytes);
        if expectation == Expectation::Unexpected && info.traits.broadcast_on_unexpected_change {
            instance.record_unexpected(info.offset);
        }
        Ok(())
    }

    /// Whether unexpected changes are pending on this instance.
    pub fn has_unexpected_changes(&self) -> bool {
        self.runtime
            .instance(self.id)
            .is_some_and(|instance| instance.has_unexpected_changes())
    }

    /// Drain the pending unexpected-change offsets.
    pub fn take_unexpected_changes(&mut self) -> Vec<u16> {
        self.runtime
            .instance_mut(self.id)
            .map(|instance| instance.take_unexpected_changes())
            .unwrap_or_default()
    }

    /// Unvalidated read access to the instance buffer. Stale instances
    /// and freed or rebuilt levels are refused at handout; the returned
    /// view itself checks nothing.
    pub fn raw_view(&self) -> Result<RawView<'_>, AccessError> {
        self.level()?;
        Ok(self.instance()?.raw_view())
    }

    /// Unvalidated write access to the instance buffer. Stale instances
    /// and freed or rebuilt levels are refused at handout; the returned
    /// view itself checks nothing.
    pub fn raw_view_mut(&mut self) -> Result<RawViewMut<'_>, AccessError> {
        self.level()?;
        self.runtime
            .instances
            .get_mut(self.id)
            .map(|instance| instance.raw_view_mut())
            .ok_or(AccessError::StaleHandle)
    }
}
