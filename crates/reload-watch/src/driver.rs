//! `ReloadDriver` — the event-handling protocol: resolve the live
//! module a watcher event names, acquire the reload lock, run the engine,
//! and fall back to a full reload on anything other than a recoverable
//! `SyntaxError`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use reload_deps::DependencyTracker;
use reload_engine::{ModuleRegistry, PartialReloader, ReloadCallbacks, RegistryImportResolver};
use reload_error::{Error, ErrorPolicy, FatalError};

use crate::lock::ReloadLock;
use crate::watcher::{FileChangeEvent, RootKind};

/// What came of handling one watcher event, returned for observability and
/// exercised directly by tests.
#[derive(Debug)]
pub enum ReloadOutcome {
    /// No live module backs this path.
    Dropped,
    /// The engine ran to completion.
    Partial(Vec<reload_core::action::ActionTrace>),
    /// The engine failed on something other than a
    /// `SyntaxError`; the affected source root was fully reloaded.
    FullReload,
    /// `on_reload_error` was already invoked by the
    /// engine; the live module is untouched.
    SyntaxError,
    /// The env-boundary watcher fired; a full host restart is required.
    /// Out of this crate's scope to perform — the caller owns the host
    /// process.
    EnvRestart,
    /// Full-reload fallback itself failed (e.g. the file vanished between
    /// the event and the re-import); recorded via the error policy.
    Failed,
}

pub struct DriverState {
    pub registry: Arc<ModuleRegistry>,
    pub tracker: Arc<DependencyTracker>,
    pub policy: Arc<dyn ErrorPolicy>,
    pub project_root: PathBuf,
    pub max_depth: u32,
    pub lock: ReloadLock,
    dropped_events: AtomicU64,
}

impl DriverState {
    pub fn new(
        project_root: PathBuf,
        registry: Arc<ModuleRegistry>,
        tracker: Arc<DependencyTracker>,
        policy: Arc<dyn ErrorPolicy>,
        max_depth: u32,
    ) -> Self {
        DriverState {
            registry,
            tracker,
            policy,
            project_root,
            max_depth,
            lock: ReloadLock::new(),
            dropped_events: AtomicU64::new(0),
        }
    }

    /// Count of watcher events dropped because no live module's path
    /// matched.
    pub fn dropped_event_count(&self) -> u64 {
        self.dropped_events.load(Ordering::SeqCst)
    }

    /// Loads and registers a module for the first time (outside the
    /// watcher's event stream — the initial boot of a project).
    pub fn load_initial(&self, path: &Path, module_name: impl Into<String>) -> Result<(), Error> {
        let module_name = module_name.into();
        let resolver = RegistryImportResolver {
            registry: self.registry.clone(),
            source_root: self.project_root.clone(),
        };
        let module = reload_lang::import_from_path_with_imports(path, &resolver).map_err(Error::from)?;
        let project_root = self.project_root.clone();
        self.tracker.record_module_imports(path, &module, |dotted| {
            Some(reload_deps::resolve_under_root(&project_root, dotted))
        });
        self.registry
            .insert(path.to_path_buf(), module_name, Arc::new(module));
        Ok(())
    }

    /// Full-reload fallback: tear the module down, drop
    /// it from the registry, re-import it fresh from disk, and
    /// re-register it. Re-running "boot-code hooks" has no separate
    /// meaning in `reload-lang` — the fresh import already re-runs every
    /// module-level initializer in declaration order, which is the
    /// equivalent behavior.
    async fn full_reload(
        &self,
        path: &Path,
        callbacks: &dyn ReloadCallbacks,
    ) -> Result<(), Error> {
        let module_name = self
            .registry
            .remove(path)
            .map(|(name, _)| name)
            .unwrap_or_else(|| module_name_from_path(path));
        self.load_initial(path, module_name)?;
        callbacks.after_full_reload(path);
        Ok(())
    }

    /// Handles exactly one watcher event end to end.
    pub async fn handle_event(
        &self,
        callbacks: &dyn ReloadCallbacks,
        event: FileChangeEvent,
    ) -> ReloadOutcome {
        if event.root_kind == RootKind::Env {
            info!(path = %event.path.display(), "environment root changed; full host restart required");
            return ReloadOutcome::EnvRestart;
        }

        let Some((module_name, _)) = self.registry.get(&event.path) else {
            self.dropped_events.fetch_add(1, Ordering::SeqCst);
            debug!(path = %event.path.display(), "no live module for changed path; dropping event");
            return ReloadOutcome::Dropped;
        };

        // Exclusive with command execution; commands drain first, held
        // for the whole pass.
        let _reload_guard = self.lock.acquire_reload().await;

        let reloader = PartialReloader::new(
            event.path.clone(),
            module_name.clone(),
            self.project_root.clone(),
            self.registry.clone(),
            self.tracker.clone(),
        )
        .with_max_depth(self.max_depth)
        .with_policy(self.policy.clone());

        match reloader.run(callbacks) {
            Ok(trace) => ReloadOutcome::Partial(trace),
            Err(Error::Fatal(FatalError::SyntaxError { .. })) => ReloadOutcome::SyntaxError,
            Err(err) => {
                self.policy.emit(&err);
                match self.full_reload(&event.path, callbacks).await {
                    Ok(()) => ReloadOutcome::FullReload,
                    Err(full_err) => {
                        self.policy.emit(&full_err);
                        ReloadOutcome::Failed
                    }
                }
            }
        }
    }
}

fn module_name_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Keeps the latest event per path: queued events are coalesced to
/// at-most-one pending reload after the current one completes.
fn coalesce_push(pending: &mut Vec<FileChangeEvent>, event: FileChangeEvent) {
    if let Some(existing) = pending.iter_mut().find(|e| e.path == event.path) {
        *existing = event;
    } else {
        pending.push(event);
    }
}

/// Runs forever, draining `events` and dispatching each to
/// [`DriverState::handle_event`]. This is the one reload worker: events
/// are handled strictly one at a time, in delivery order.
pub async fn run_loop(
    state: Arc<DriverState>,
    callbacks: Arc<dyn ReloadCallbacks>,
    mut events: broadcast::Receiver<FileChangeEvent>,
) {
    loop {
        let event = match events.recv().await {
            Ok(ev) => ev,
            Err(broadcast::error::RecvError::Closed) => break,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "reload-watch: event receiver lagged; some edits were coalesced away");
                continue;
            }
        };

        let mut pending = vec![event];
        while let Ok(ev) = events.try_recv() {
            coalesce_push(&mut pending, ev);
        }

        for ev in pending {
            let path = ev.path.clone();
            let outcome = state.handle_event(&*callbacks, ev).await;
            debug!(path = %path.display(), outcome = ?outcome, "reload event handled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reload_engine::NoopCallbacks;
    use reload_error::NoopPolicy;
    use reload_lang::import_from_source;
    use std::path::PathBuf;

    fn state() -> DriverState {
        DriverState::new(
            PathBuf::from("/proj"),
            Arc::new(ModuleRegistry::new()),
            Arc::new(DependencyTracker::new()),
            Arc::new(NoopPolicy),
            64,
        )
    }

    #[tokio::test]
    async fn unregistered_path_is_dropped_and_counted() {
        let state = state();
        let event = FileChangeEvent {
            path: PathBuf::from("/proj/nope.rl"),
            kind: crate::watcher::FileEventKind::Modified,
            old_path: None,
            root_kind: RootKind::Source,
        };
        let outcome = state.handle_event(&NoopCallbacks, event).await;
        assert!(matches!(outcome, ReloadOutcome::Dropped));
        assert_eq!(state.dropped_event_count(), 1);
    }

    #[tokio::test]
    async fn env_root_event_requests_restart_without_touching_registry() {
        let state = state();
        let event = FileChangeEvent {
            path: PathBuf::from("/proj/.env"),
            kind: crate::watcher::FileEventKind::Modified,
            old_path: None,
            root_kind: RootKind::Env,
        };
        let outcome = state.handle_event(&NoopCallbacks, event).await;
        assert!(matches!(outcome, ReloadOutcome::EnvRestart));
        assert_eq!(state.dropped_event_count(), 0);
    }

    #[tokio::test]
    async fn registered_module_with_missing_source_escalates_to_full_reload() {
        let state = state();
        let path = PathBuf::from("/proj/m.rl");
        let module = import_from_source(path.clone(), "def f(x) { return x; }").unwrap();
        state.registry.insert(path.clone(), "m", Arc::new(module));

        let event = FileChangeEvent {
            path: path.clone(),
            kind: crate::watcher::FileEventKind::Modified,
            old_path: None,
            root_kind: RootKind::Source,
        };
        // No file on disk at `path`: this is an unreadable-source failure,
        // not a syntax error in user source, so it must not be reported as
        // the recoverable `SyntaxError` outcome. The fallback full reload
        // also can't read the (still-missing) file, so the pass ends in
        // `Failed` rather than `FullReload` — but it must go through the
        // full-reload attempt rather than leaving the stale module in place
        // under the `SyntaxError` label.
        let outcome = state.handle_event(&NoopCallbacks, event).await;
        assert!(matches!(outcome, ReloadOutcome::Failed));
    }

    #[tokio::test]
    async fn registered_module_with_syntax_error_stays_recoverable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.rl");
        std::fs::write(&path, "def f(x) { return x; }\n").unwrap();

        let state = DriverState::new(
            dir.path().to_path_buf(),
            Arc::new(ModuleRegistry::new()),
            Arc::new(DependencyTracker::new()),
            Arc::new(NoopPolicy),
            64,
        );
        state.load_initial(&path, "m").unwrap();

        std::fs::write(&path, "def f(x { return x; }\n").unwrap();

        let event = FileChangeEvent {
            path: path.clone(),
            kind: crate::watcher::FileEventKind::Modified,
            old_path: None,
            root_kind: RootKind::Source,
        };
        let outcome = state.handle_event(&NoopCallbacks, event).await;
        assert!(matches!(outcome, ReloadOutcome::SyntaxError));
        assert!(state.registry.contains(&path));
    }

    #[tokio::test]
    async fn real_edit_produces_partial_reload_trace() {
        use std::io::Write;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.rl");
        std::fs::write(&path, "def f(x) { return x; }\n").unwrap();

        let state = DriverState::new(
            dir.path().to_path_buf(),
            Arc::new(ModuleRegistry::new()),
            Arc::new(DependencyTracker::new()),
            Arc::new(NoopPolicy),
            64,
        );
        state.load_initial(&path, "m").unwrap();

        let mut file = std::fs::OpenOptions::new().write(true).truncate(true).open(&path).unwrap();
        writeln!(file, "def f(x) {{ return x; }}\ndef g(x) {{ return x; }}").unwrap();
        drop(file);

        let event = FileChangeEvent {
            path: path.clone(),
            kind: crate::watcher::FileEventKind::Modified,
            old_path: None,
            root_kind: RootKind::Source,
        };
        let outcome = state.handle_event(&NoopCallbacks, event).await;
        match outcome {
            ReloadOutcome::Partial(trace) => {
                assert!(trace.iter().any(|t| t.full_name.ends_with("g")));
            }
            other => panic!("expected Partial reload, got {other:?}"),
        }
    }
}
