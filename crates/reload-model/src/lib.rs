//! reload-model — the object model.
//!
//! Builds a typed tree mirroring a live `reload_lang::LiveModule`, breaking
//! cycles by promoting repeated-identity occurrences to `Reference` leaves,
//! and structurally diffs two such trees (the live "old" module against an
//! ephemeral "new" re-import) into an ordered list of [`diff::DiffAction`]s.
//! Trees are transient — built at the start of a reload pass and discarded
//! at the end; the runtime objects they mirror persist across reloads.

pub mod diff;
pub mod node;
pub mod parent_reload;
pub mod value_eq;

pub use diff::{diff_trees, DiffAction};
pub use node::{build_tree, Node, Payload};
pub use parent_reload::ParentReloadNeeded;
pub use value_eq::{values_equal, ComparatorRegistry, ValueComparator};

pub use reload_core::action::NodeKind;
pub use reload_core::name::FullName;
