//! reload-deps — the dependency tracker.
//!
//! Records which modules use which symbols of which other modules, by
//! observing `reload-lang`'s `Import` bindings as modules load, so that
//! `reload-engine` can transitively propagate a `Variable` update to every
//! module reachable from it in the import graph.
//!
//! There is no real "import interceptor" to install the way the source
//! system monkey-patches `builtins.__import__`: `reload-lang` never
//! executes import statements itself, so the portable equivalent is a structured event a host feeds
//! in explicitly — [`DependencyTracker::record_module_imports`] — every
//! time it loads or reloads a module.

mod resolve;
mod tracker;

pub use resolve::resolve_under_root;
pub use tracker::{Dependency, DependencyTracker, ImportedNames};
