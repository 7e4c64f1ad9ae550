//! Error types for blackboard access and compilation
//!
//! Structural problems with authored templates are not errors; they come
//! back as accumulated diagnostics from validation (see
//! [`crate::validate`]). The enums here cover the two places where an
//! operation itself refuses to proceed: the validated accessor tier, and
//! template compilation ordering.

use thiserror::Error;

use crate::key::KeyKind;

/// Mistakes caught by the validated accessor tier.
///
/// These surface integration bugs during development; the unvalidated
/// tier in [`crate::unchecked`] performs none of these checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// No key with the requested name or offset exists on this level.
    #[error("key not found: {0}")]
    KeyNotFound(String),
    /// A key exists but holds a different kind than the access requested.
    #[error("type mismatch on '{key}': stored {stored:?}, requested {requested:?}")]
    TypeMismatch {
        /// Key name, or the offset rendered as text for offset-form access.
        key: String,
        /// Kind recorded in the compiled layout.
        stored: KeyKind,
        /// Kind the caller asked for.
        requested: KeyKind,
    },
    /// The instance-synchronized write path was used on a key that is not
    /// instance-synced.
    #[error("key '{0}' is not instance-synced")]
    InvalidOperation(String),
    /// An enum accessor was used with a backing type wider than one byte.
    #[error("enum backing type is {width} bytes, expected 1")]
    Overflow {
        /// Size of the enum type the caller supplied.
        width: usize,
    },
    /// The template or instance behind a handle no longer exists.
    #[error("stale handle: the referenced level or instance was freed")]
    StaleHandle,
}

/// Why a compile or spawn request was refused.
///
/// Refusals are logged and leave no partial state behind, so a batch of
/// compilations can keep going past an individual failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The template handle does not resolve to a registered template.
    #[error("unknown template handle")]
    UnknownTemplate,
    /// The template's parent has not been compiled yet.
    #[error("cannot compile '{template}': parent '{parent}' is not compiled")]
    ParentNotCompiled {
        /// Template that was asked to compile.
        template: String,
        /// Its parent, still uncompiled.
        parent: String,
    },
    /// The template does not target the compiled backend.
    #[error("template '{0}' does not target the compiled backend")]
    BackendNotTargeted(String),
    /// An operation that needs compiled data ran before compilation.
    #[error("template '{0}' is not compiled")]
    NotCompiled(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats() {
        let err = AccessError::TypeMismatch {
            key: "Health".into(),
            stored: KeyKind::Float,
            requested: KeyKind::Boolean,
        };
        let text = err.to_string();
        assert!(text.contains("Health"));
        assert!(text.contains("Float"));

        let err = CompileError::ParentNotCompiled {
            template: "Child".into(),
            parent: "Parent".into(),
        };
        assert!(err.to_string().contains("Parent"));
    }
}
