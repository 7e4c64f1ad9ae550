//! # slate_core - Slate Engine Core
//!
//! Ownership and handle primitives shared by the Slate blackboard crates:
//! - **Generational slot storage**: central owners hand out [`SlotKey`]s
//!   instead of references; stale keys fail their generation check instead
//!   of dangling
//! - **Opaque object handles**: 4-byte [`ObjectHandle`]s referencing
//!   host-owned objects
//! - **Object-model delegation**: the [`ObjectModel`] retain/release seam
//!   between blackboard buffers and the host's object system

pub mod handle;
pub mod object_model;
pub mod slot_map;

pub use handle::*;
pub use object_model::*;
pub use slot_map::*;

/// Re-export of the commonly used types.
pub mod prelude {
    pub use crate::handle::ObjectHandle;
    pub use crate::object_model::{NullObjectModel, ObjectModel};
    pub use crate::slot_map::{SlotKey, SlotMap};
}
