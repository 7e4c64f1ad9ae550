//! Authored blackboard templates
//!
//! A template is the designer-facing description of one level of a
//! blackboard hierarchy: a named, ordered list of key slots plus an
//! optional parent level and a backend mask. Templates serialize with
//! serde for the asset pipeline; the runtime-only parent id is re-linked
//! after load from `parent_name`.

use serde::{Deserialize, Serialize};

use slate_core::SlotKey;

use crate::key::KeyDef;

/// Execution backends a template can target.
///
/// Stored as a bitmask so templates can target several at once. A child
/// template must not target backends its parent does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Backends(u8);

impl Backends {
    /// No backends.
    pub const NONE: Self = Self(0);
    /// The compiled packed-buffer backend this crate implements.
    pub const COMPILED: Self = Self(1 << 0);
    /// The external scripted-function VM backend.
    pub const SCRIPTED: Self = Self(1 << 1);
    /// Every backend.
    pub const ALL: Self = Self(Self::COMPILED.0 | Self::SCRIPTED.0);

    /// Raw mask bits.
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Rebuild from raw bits.
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Whether every backend in `other` is also targeted by `self`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether `self` targets no backend outside `other`.
    #[inline]
    pub const fn is_subset_of(self, other: Self) -> bool {
        self.0 & other.0 == self.0
    }

    /// Whether the mask is empty.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for Backends {
    fn default() -> Self {
        Self::ALL
    }
}

impl core::ops::BitOr for Backends {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign for Backends {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Registry id of a template.
pub type TemplateId = SlotKey<Template>;

/// One authored level of a blackboard hierarchy.
///
/// Key slots are ordered as declared. An empty (`None`) slot is an
/// authored-but-unfilled entry, produced by a JSON `null`, and validation
/// reports it rather than silently skipping it. Templates are treated as
/// immutable once compiled; compilation snapshots everything it needs
/// into [`CompiledData`](crate::compiled::CompiledData).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    /// Declared name; identity within a registry.
    pub name: String,
    /// Authored parent reference, resolved to `parent` after load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    /// Runtime link to the parent level, if any.
    #[serde(skip)]
    pub parent: Option<TemplateId>,
    /// Backends this level requires.
    #[serde(default)]
    pub backends: Backends,
    /// Own key slots in declaration order.
    #[serde(default)]
    pub keys: Vec<Option<KeyDef>>,
}

impl Template {
    /// An empty template targeting every backend.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_name: None,
            parent: None,
            backends: Backends::ALL,
            keys: Vec::new(),
        }
    }

    /// Link a parent level.
    pub fn with_parent(mut self, parent: TemplateId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Record an authored parent name for post-load resolution.
    pub fn with_parent_name(mut self, name: impl Into<String>) -> Self {
        self.parent_name = Some(name.into());
        self
    }

    /// Restrict the backend mask.
    pub fn with_backends(mut self, backends: Backends) -> Self {
        self.backends = backends;
        self
    }

    /// Append a key slot.
    pub fn with_key(mut self, key: KeyDef) -> Self {
        self.keys.push(Some(key));
        self
    }

    /// Append an empty slot, as a half-authored asset would carry.
    pub fn with_empty_slot(mut self) -> Self {
        self.keys.push(None);
        self
    }

    /// Filled key slots in declaration order.
    pub fn own_keys(&self) -> impl Iterator<Item = &KeyDef> {
        self.keys.iter().flatten()
    }

    /// Number of filled key slots.
    pub fn key_count(&self) -> u16 {
        self.keys.iter().flatten().count() as u16
    }

    /// Packed size of the filled own keys in bytes.
    pub fn own_size(&self) -> u16 {
        self.own_keys().map(|key| key.size()).sum()
    }

    /// Find an own key by name.
    pub fn find_key(&self, name: &str) -> Option<&KeyDef> {
        self.own_keys().find(|key| key.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_masks() {
        assert!(Backends::ALL.contains(Backends::COMPILED));
        assert!(Backends::ALL.contains(Backends::SCRIPTED));
        assert!(Backends::COMPILED.is_subset_of(Backends::ALL));
        assert!(!Backends::ALL.is_subset_of(Backends::COMPILED));
        assert!(Backends::NONE.is_empty());
        assert_eq!(Backends::COMPILED | Backends::SCRIPTED, Backends::ALL);
    }

    #[test]
    fn test_template_builder() {
        let template = Template::new("Sentry")
            .with_backends(Backends::COMPILED)
            .with_key(KeyDef::boolean("HasTarget", false))
            .with_key(KeyDef::float("AlertLevel", 0.0));
        assert_eq!(template.key_count(), 2);
        assert_eq!(template.own_size(), 5);
        assert!(template.find_key("AlertLevel").is_some());
        assert!(template.find_key("Missing").is_none());
    }

    #[test]
    fn test_empty_slot_survives_json() {
        let json = r#"{
            "name": "Damaged",
            "keys": [
                { "name": "Hits", "default": { "Integer": 0 } },
                null
            ]
        }"#;
        let template: Template = serde_json::from_str(json).unwrap();
        assert_eq!(template.keys.len(), 2);
        assert_eq!(template.key_count(), 1);
        assert!(template.keys[1].is_none());
        assert_eq!(template.backends, Backends::ALL);
    }
}
