//! reload-core — shared identifiers, action-trace, and code-equality types.
//!
//! This crate has no dependency on the rest of the workspace; it exists so
//! that `reload-lang`, `reload-deps`, `reload-model`, `reload-engine`, and
//! `reload-watch` can all agree on a single `ModuleId`, `FullName`, and
//! `ActionTrace` shape without a cyclic crate graph.

pub mod action;
pub mod code;
pub mod file_hash;
pub mod ids;
pub mod name;

pub use action::{ActionKind, ActionTrace, NodeKind};
pub use code::{CodeDescriptor, ConstValue};
pub use file_hash::ContentHash;
pub use ids::{ModuleId, PROJECT_NAMESPACE_UUID};
pub use name::FullName;
