//! The callback seam: four hooks a host registers per source root,
//! invoked around a reload pass. A no-op implementation is provided for
//! hosts (and tests) that don't need to observe these.

use std::path::Path;

use reload_core::action::ActionTrace;
use reload_error::Error;

pub trait ReloadCallbacks: Send + Sync {
    /// Invoked before planning begins.
    fn on_reload_start(&self, _path: &Path) {}

    /// Invoked after a successful partial reload, with the ordered trace of
    /// actions actually executed.
    fn after_partial_reload(&self, _path: &Path, _actions: &[ActionTrace]) {}

    /// Invoked after a full-reload fallback completes.
    fn after_full_reload(&self, _path: &Path) {}

    /// Invoked when planning fails on a `SyntaxError`; the live module is
    /// left untouched.
    fn on_reload_error(&self, _path: &Path, _err: &Error) {}
}

/// Discards every callback. Useful when a caller only wants the returned
/// action trace and has no host-side hooks to wire up.
pub struct NoopCallbacks;

impl ReloadCallbacks for NoopCallbacks {}
