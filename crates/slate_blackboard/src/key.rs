//! Key model and descriptors
//!
//! A blackboard key is a named, typed slot in a template. The authored
//! side is [`KeyDef`] (name, trait flags, per-kind default); compilation
//! turns each into a [`KeyInfo`] (offset, index, kind, traits) addressing
//! the packed buffer. Authored descriptors serialize with serde so the
//! asset pipeline can persist them; compiled descriptors never do.

use serde::{Deserialize, Serialize};

use glam::{Quat, Vec3};
use slate_core::ObjectHandle;

use crate::validate::ValidationIssue;
use crate::value::{BlackboardEnum, BlackboardValue};

/// The value kind a key stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// Sentinel kind of [`KeyInfo::INVALID`]; never stored in a layout.
    Invalid,
    /// 1-byte boolean.
    Boolean,
    /// 4-byte signed integer.
    Integer,
    /// 4-byte float.
    Float,
    /// 12-byte vector (three packed floats).
    Vector3,
    /// 16-byte quaternion (four packed floats).
    Quaternion,
    /// 1-byte user enum.
    Enum8,
    /// 4-byte opaque handle to a host object.
    Object,
}

impl KeyKind {
    /// Packed size of this kind in bytes.
    #[inline]
    pub const fn size(self) -> u16 {
        match self {
            KeyKind::Invalid => 0,
            KeyKind::Boolean | KeyKind::Enum8 => 1,
            KeyKind::Integer | KeyKind::Float | KeyKind::Object => 4,
            KeyKind::Vector3 => 12,
            KeyKind::Quaternion => 16,
        }
    }
}

/// Behavior flags on a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct KeyTraits {
    /// The key's value is shared across every live instance of its
    /// declaring level's chain rather than set per instance.
    #[serde(default)]
    pub instance_synced: bool,
    /// Changes flagged unexpected are recorded on listening instances so
    /// an external planner can re-evaluate.
    #[serde(default)]
    pub broadcast_on_unexpected_change: bool,
}

impl KeyTraits {
    /// No flags set.
    pub const NONE: Self = Self {
        instance_synced: false,
        broadcast_on_unexpected_change: false,
    };
}

/// Authored default value, carrying the per-kind configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum KeyDefault {
    /// Boolean default.
    Boolean(bool),
    /// Integer default.
    Integer(i32),
    /// Float default.
    Float(f32),
    /// Vector default.
    Vector3(Vec3),
    /// Quaternion default.
    Quaternion(Quat),
    /// Enum default as its raw byte, plus the authored backing width.
    ///
    /// Width is captured from the enum type at authoring time; validation
    /// rejects anything other than 1.
    Enum {
        /// Raw byte of the default variant.
        value: u8,
        /// Size of the backing type in bytes.
        width: u8,
    },
    /// Object default, optionally required to be non-null.
    Object {
        /// Handle written at compile time.
        value: ObjectHandle,
        /// Whether authoring demands a non-null default.
        #[serde(default)]
        required: bool,
    },
}

impl KeyDefault {
    /// The kind this default compiles to.
    pub const fn kind(&self) -> KeyKind {
        match self {
            KeyDefault::Boolean(_) => KeyKind::Boolean,
            KeyDefault::Integer(_) => KeyKind::Integer,
            KeyDefault::Float(_) => KeyKind::Float,
            KeyDefault::Vector3(_) => KeyKind::Vector3,
            KeyDefault::Quaternion(_) => KeyKind::Quaternion,
            KeyDefault::Enum { .. } => KeyKind::Enum8,
            KeyDefault::Object { .. } => KeyKind::Object,
        }
    }

    /// Write the default value at `offset` in a packed buffer.
    pub fn write_default(&self, bytes: &mut [u8], offset: u16) {
        let offset = offset as usize;
        match *self {
            KeyDefault::Boolean(v) => v.write_to(bytes, offset),
            KeyDefault::Integer(v) => v.write_to(bytes, offset),
            KeyDefault::Float(v) => v.write_to(bytes, offset),
            KeyDefault::Vector3(v) => v.write_to(bytes, offset),
            KeyDefault::Quaternion(v) => v.write_to(bytes, offset),
            KeyDefault::Enum { value, .. } => bytes[offset] = value,
            KeyDefault::Object { value, .. } => value.write_to(bytes, offset),
        }
    }
}

/// An authored key descriptor: one named, typed slot in a template.
///
/// Immutable once its template compiles; the compiled layout refers back
/// to it only through [`KeyInfo`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyDef {
    /// Name, unique within the declaring level and its ancestors.
    pub name: String,
    /// Behavior flags.
    #[serde(default)]
    pub traits: KeyTraits,
    /// Default value and per-kind configuration.
    pub default: KeyDefault,
}

impl KeyDef {
    fn new(name: impl Into<String>, default: KeyDefault) -> Self {
        Self {
            name: name.into(),
            traits: KeyTraits::NONE,
            default,
        }
    }

    /// A boolean key.
    pub fn boolean(name: impl Into<String>, default: bool) -> Self {
        Self::new(name, KeyDefault::Boolean(default))
    }

    /// An integer key.
    pub fn integer(name: impl Into<String>, default: i32) -> Self {
        Self::new(name, KeyDefault::Integer(default))
    }

    /// A float key.
    pub fn float(name: impl Into<String>, default: f32) -> Self {
        Self::new(name, KeyDefault::Float(default))
    }

    /// A vector key.
    pub fn vector3(name: impl Into<String>, default: Vec3) -> Self {
        Self::new(name, KeyDefault::Vector3(default))
    }

    /// A quaternion key.
    pub fn quaternion(name: impl Into<String>, default: Quat) -> Self {
        Self::new(name, KeyDefault::Quaternion(default))
    }

    /// An enum key, capturing the backing width of `E` for validation.
    pub fn enum_key<E: BlackboardEnum>(name: impl Into<String>, default: E) -> Self {
        Self::new(
            name,
            KeyDefault::Enum {
                value: default.to_byte(),
                width: core::mem::size_of::<E>() as u8,
            },
        )
    }

    /// An object key.
    pub fn object(name: impl Into<String>, default: ObjectHandle) -> Self {
        Self::new(
            name,
            KeyDefault::Object {
                value: default,
                required: false,
            },
        )
    }

    /// Mark this key instance-synced.
    pub fn with_instance_sync(mut self) -> Self {
        self.traits.instance_synced = true;
        self
    }

    /// Record unexpected changes to this key on listening instances.
    pub fn with_unexpected_change_broadcast(mut self) -> Self {
        self.traits.broadcast_on_unexpected_change = true;
        self
    }

    /// Require a non-null default (object keys only).
    pub fn with_required(mut self) -> Self {
        match &mut self.default {
            KeyDefault::Object { required, .. } => *required = true,
            _ => debug_assert!(false, "with_required only applies to object keys"),
        }
        self
    }

    /// The kind this key compiles to.
    #[inline]
    pub const fn kind(&self) -> KeyKind {
        self.default.kind()
    }

    /// Packed size of this key in bytes.
    #[inline]
    pub const fn size(&self) -> u16 {
        self.kind().size()
    }

    /// Per-key structural checks, reported into `issues`.
    ///
    /// Enum keys must have a 1-byte backing type; required object keys
    /// must not default to null.
    pub fn validate(&self, issues: &mut Vec<ValidationIssue>) {
        match self.default {
            KeyDefault::Enum { width, .. } if width != 1 => {
                issues.push(ValidationIssue::WideEnumBacking {
                    key: self.name.clone(),
                    width,
                });
            }
            KeyDefault::Object { value, required } if required && value.is_null() => {
                issues.push(ValidationIssue::MissingObjectDefault {
                    key: self.name.clone(),
                });
            }
            _ => {}
        }
    }
}

/// Compiled key descriptor: where and what a key is inside a level.
///
/// `Copy` and cheap to pass around; the scripted-VM hot path resolves
/// these once at bind time and hands them to the unchecked accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInfo {
    /// Byte position inside the compiled buffer. Stable for the lifetime
    /// of the compiled level.
    pub offset: u16,
    /// Key index within the chain (parent keys first).
    pub index: u16,
    /// Stored kind.
    pub kind: KeyKind,
    /// Behavior flags.
    pub traits: KeyTraits,
}

impl KeyInfo {
    /// Sentinel returned when a name probe finds nothing.
    pub const INVALID: Self = Self {
        offset: u16::MAX,
        index: u16::MAX,
        kind: KeyKind::Invalid,
        traits: KeyTraits::NONE,
    };

    /// Whether this describes an actual key.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        !matches!(self.kind, KeyKind::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Stance {
        Idle,
        Alert,
        Engaged,
    }

    impl BlackboardEnum for Stance {
        fn from_byte(byte: u8) -> Self {
            match byte {
                1 => Stance::Alert,
                2 => Stance::Engaged,
                _ => Stance::Idle,
            }
        }

        fn to_byte(self) -> u8 {
            self as u8
        }
    }

    #[test]
    fn test_kind_sizes() {
        assert_eq!(KeyKind::Boolean.size(), 1);
        assert_eq!(KeyKind::Integer.size(), 4);
        assert_eq!(KeyKind::Float.size(), 4);
        assert_eq!(KeyKind::Vector3.size(), 12);
        assert_eq!(KeyKind::Quaternion.size(), 16);
        assert_eq!(KeyKind::Enum8.size(), 1);
        assert_eq!(KeyKind::Object.size(), 4);
        assert_eq!(KeyKind::Invalid.size(), 0);
    }

    #[test]
    fn test_builders_set_traits() {
        let key = KeyDef::boolean("Ready", false)
            .with_instance_sync()
            .with_unexpected_change_broadcast();
        assert_eq!(key.kind(), KeyKind::Boolean);
        assert!(key.traits.instance_synced);
        assert!(key.traits.broadcast_on_unexpected_change);
    }

    #[test]
    fn test_enum_key_captures_width() {
        let key = KeyDef::enum_key("Stance", Stance::Alert);
        match key.default {
            KeyDefault::Enum { value, width } => {
                assert_eq!(value, 1);
                assert_eq!(width, 1);
            }
            _ => panic!("expected enum default"),
        }
    }

    #[test]
    fn test_write_default() {
        let mut bytes = [0u8; 8];
        KeyDef::integer("Level", -2).default.write_default(&mut bytes, 3);
        assert_eq!(i32::read_from(&bytes, 3), -2);
    }

    #[test]
    fn test_per_key_validation() {
        let mut issues = Vec::new();

        // 1-byte enum passes.
        KeyDef::enum_key("Stance", Stance::Idle).validate(&mut issues);
        assert!(issues.is_empty());

        // Hand-authored wide enum is rejected.
        let wide = KeyDef {
            name: "Wide".into(),
            traits: KeyTraits::NONE,
            default: KeyDefault::Enum { value: 0, width: 4 },
        };
        wide.validate(&mut issues);
        assert_eq!(issues.len(), 1);

        // Required object defaulting to null is rejected.
        let missing = KeyDef::object("Target", ObjectHandle::NULL).with_required();
        missing.validate(&mut issues);
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn test_invalid_sentinel() {
        assert!(!KeyInfo::INVALID.is_valid());
        let real = KeyInfo {
            offset: 0,
            index: 0,
            kind: KeyKind::Float,
            traits: KeyTraits::NONE,
        };
        assert!(real.is_valid());
    }
}
