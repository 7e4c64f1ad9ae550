//! # slate_blackboard - Typed, inheritable blackboard memory for AI agents
//!
//! Designers declare hierarchies of typed key sets; each level compiles
//! into one packed, fixed-layout byte buffer addressed by stable offsets.
//! Features:
//! - Size-sorted packed layouts with offsets that never move once compiled
//! - Template inheritance: a child's buffer starts as a byte-identical
//!   copy of its parent's, inherited keys keep their exact offsets
//! - Two accessor tiers: validated (name or offset, `Result`-returning)
//!   and unvalidated (`unsafe`, pre-resolved [`KeyInfo`], zero checks)
//! - Instance-synced keys: one value per chain, fanned out to every
//!   compiled descendant and live instance, identical writes suppressed
//! - Opaque object-handle keys with retain/release delegated to the host
//!
//! ## Example
//!
//! ```ignore
//! use slate_blackboard::prelude::*;
//!
//! let mut runtime = BlackboardRuntime::new();
//! let guard = runtime.register_template(
//!     Template::new("Guard")
//!         .with_key(KeyDef::boolean("HasTarget", false))
//!         .with_key(KeyDef::integer("AlarmLevel", 0).with_instance_sync()),
//! );
//! assert!(runtime.validate(guard).is_valid());
//! runtime.compile(guard)?;
//!
//! let instance = runtime.spawn(guard)?;
//! let mut board = runtime.agent(instance).unwrap();
//! board.set("HasTarget", true)?;
//! let alarm: i32 = board.get("AlarmLevel")?;
//! ```

pub mod agent;
mod compile;
pub mod compiled;
pub mod error;
pub mod instance;
pub mod key;
pub mod runtime;
pub mod sync;
pub mod template;
pub mod unchecked;
pub mod validate;
pub mod value;

pub use agent::AgentBoard;
pub use compiled::{CompiledData, KeyEntry};
pub use error::{AccessError, CompileError};
pub use instance::{BlackboardInstance, InstanceId};
pub use key::{KeyDef, KeyDefault, KeyInfo, KeyKind, KeyTraits};
pub use runtime::BlackboardRuntime;
pub use sync::{Expectation, SyncListener};
pub use template::{Backends, Template, TemplateId};
pub use unchecked::{RawView, RawViewMut};
pub use validate::{ValidationIssue, ValidationReport};
pub use value::{BlackboardEnum, BlackboardValue};

pub use slate_core::{NullObjectModel, ObjectHandle, ObjectModel};

/// Prelude - commonly used types
pub mod prelude {
    pub use crate::agent::AgentBoard;
    pub use crate::compiled::CompiledData;
    pub use crate::error::{AccessError, CompileError};
    pub use crate::instance::InstanceId;
    pub use crate::key::{KeyDef, KeyInfo, KeyKind, KeyTraits};
    pub use crate::runtime::BlackboardRuntime;
    pub use crate::sync::Expectation;
    pub use crate::template::{Backends, Template, TemplateId};
    pub use crate::validate::ValidationReport;
    pub use crate::value::{BlackboardEnum, BlackboardValue};
    pub use slate_core::{ObjectHandle, ObjectModel};
}
