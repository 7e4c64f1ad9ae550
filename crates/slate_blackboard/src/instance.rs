//! Per-agent blackboard instances

use slate_core::SlotKey;

use crate::template::TemplateId;
use crate::unchecked::{RawView, RawViewMut};

/// Registry id of a live instance.
pub type InstanceId = SlotKey<BlackboardInstance>;

/// One agent's working copy of a compiled level's buffer.
///
/// Spawned from the canonical buffer of its bound level and kept
/// registered as a sync listener for as long as it lives. The level's
/// build revision is stamped at spawn; validated access refuses the
/// instance once its level is freed or rebuilt under the same id.
/// Alongside the bytes it accumulates the offsets of keys whose
/// synchronized changes arrived flagged unexpected, for an external
/// planner to poll.
#[derive(Debug)]
pub struct BlackboardInstance {
    template: TemplateId,
    revision: u32,
    pub(crate) buffer: Vec<u8>,
    unexpected: Vec<u16>,
}

impl BlackboardInstance {
    pub(crate) fn new(template: TemplateId, revision: u32, buffer: Vec<u8>) -> Self {
        Self {
            template,
            revision,
            buffer,
            unexpected: Vec::new(),
        }
    }

    /// The level this instance is bound to.
    #[inline]
    pub fn template(&self) -> TemplateId {
        self.template
    }

    /// Build revision of the compiled level this instance was spawned
    /// against.
    #[inline]
    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Packed size of the instance buffer in bytes.
    #[inline]
    pub fn size(&self) -> u16 {
        self.buffer.len() as u16
    }

    /// The instance's packed bytes.
    #[inline]
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Unvalidated read access to the instance buffer.
    pub fn raw_view(&self) -> RawView<'_> {
        RawView::new(&self.buffer)
    }

    /// Unvalidated write access to the instance buffer.
    ///
    /// Writes through this view bypass synchronization and object
    /// bookkeeping entirely.
    pub fn raw_view_mut(&mut self) -> RawViewMut<'_> {
        RawViewMut::new(&mut self.buffer)
    }

    /// Record an unexpected change at `offset`. Deduplicated; a key shows
    /// up once per poll however many times it changed.
    pub(crate) fn record_unexpected(&mut self, offset: u16) {
        if !self.unexpected.contains(&offset) {
            self.unexpected.push(offset);
        }
    }

    /// Whether any unexpected changes are pending.
    #[inline]
    pub fn has_unexpected_changes(&self) -> bool {
        !self.unexpected.is_empty()
    }

    /// Drain the pending unexpected-change offsets.
    pub fn take_unexpected_changes(&mut self) -> Vec<u16> {
        core::mem::take(&mut self.unexpected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slate_core::SlotMap;

    #[test]
    fn test_unexpected_changes_deduplicate_and_drain() {
        let mut templates: SlotMap<crate::template::Template> = SlotMap::new();
        let id = templates.insert(crate::template::Template::new("T"));

        let mut instance = BlackboardInstance::new(id, 0, vec![0; 4]);
        assert!(!instance.has_unexpected_changes());

        instance.record_unexpected(1);
        instance.record_unexpected(1);
        instance.record_unexpected(3);
        assert!(instance.has_unexpected_changes());

        let drained = instance.take_unexpected_changes();
        assert_eq!(drained, vec![1, 3]);
        assert!(!instance.has_unexpected_changes());
    }
}
