//! `PartialReloader` — the diff/patch engine: builds the old and new
//! object-model trees for one module, diffs them, and applies the
//! resulting action plan.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use reload_core::action::{ActionKind, ActionTrace, NodeKind};
use reload_core::name::FullName;
use reload_deps::{DependencyTracker, ImportedNames};
use reload_error::{Error, ErrorPolicy, FatalError, Result, TracingPolicy, WarningError};
use reload_lang::LangError;
use reload_model::{diff_trees, DiffAction, Node, Payload};

use crate::apply::apply;
use crate::callbacks::ReloadCallbacks;
use crate::registry::{ModuleRegistry, RegistryImportResolver};

/// Recursive dependent-module cascades are capped at this depth before the
/// engine gives up and records a cycle warning rather than recursing
/// forever.
pub const DEFAULT_MAX_DEPTH: u32 = 64;

/// Maps a re-import failure to its driver-facing `Error`. Only a genuine
/// parse failure is the recoverable "`SyntaxError` in user source" kind
/// (§7); a file that could not even be read (vanished, permissions, not
/// valid UTF-8) is an import-time failure and must escalate to a full
/// reload instead of being reported as if the live module were left
/// untouched by choice.
fn reimport_error(path: &PathBuf, err: LangError) -> Error {
    match err {
        LangError::Syntax { message } => FatalError::SyntaxError {
            path: path.display().to_string(),
            message,
        }
        .into(),
        LangError::Io { message } => FatalError::ImportFailed {
            path: path.display().to_string(),
            message,
        }
        .into(),
    }
}

/// One reload pass over an already-loaded module.
/// `project_root` is the base dotted-import paths resolve against; the
/// module's own identity (path + dotted name) and the registry/tracker it
/// shares with every other reloader in the project round out what a live
/// module handle needs: the services to re-import and record dependencies,
/// since there is no ambient module cache or logging singleton in a Rust
/// binary.
pub struct PartialReloader {
    path: PathBuf,
    module_name: String,
    project_root: PathBuf,
    registry: Arc<ModuleRegistry>,
    tracker: Arc<DependencyTracker>,
    max_depth: u32,
    policy: Arc<dyn ErrorPolicy>,
}

impl PartialReloader {
    pub fn new(
        path: PathBuf,
        module_name: impl Into<String>,
        project_root: PathBuf,
        registry: Arc<ModuleRegistry>,
        tracker: Arc<DependencyTracker>,
    ) -> Self {
        PartialReloader {
            path,
            module_name: module_name.into(),
            project_root,
            registry,
            tracker,
            max_depth: DEFAULT_MAX_DEPTH,
            policy: Arc::new(TracingPolicy),
        }
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_policy(mut self, policy: Arc<dyn ErrorPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Executes one reload pass, returning the ordered list of actions
    /// actually applied.
    pub fn run(&self, callbacks: &dyn ReloadCallbacks) -> Result<Vec<ActionTrace>> {
        callbacks.on_reload_start(&self.path);
        match self.run_at_depth(0, callbacks) {
            Ok(trace) => {
                callbacks.after_partial_reload(&self.path, &trace);
                Ok(trace)
            }
            Err(err) => {
                if let Error::Fatal(FatalError::SyntaxError { .. }) = &err {
                    callbacks.on_reload_error(&self.path, &err);
                }
                Err(err)
            }
        }
    }

    fn run_at_depth(&self, depth: u32, callbacks: &dyn ReloadCallbacks) -> Result<Vec<ActionTrace>> {
        let (_, module) = self
            .registry
            .get(&self.path)
            .ok_or_else(|| FatalError::RegistryCorruption(format!("module not registered: {}", self.path.display())))?;

        // Step 1: disable the tracker for the duration of the re-import so
        // the ephemeral diff copy never records phantom dependencies.
        let resolver = RegistryImportResolver {
            registry: self.registry.clone(),
            source_root: self.project_root.clone(),
        };
        let new_module = self
            .tracker
            .with_tracking_disabled(|| reload_lang::import_from_path_with_imports(&self.path, &resolver))
            .map_err(|e| reimport_error(&self.path, e))?;

        let root = FullName::root(&self.module_name);
        let old_tree = reload_model::build_tree(&module, &self.module_name);
        let new_tree = reload_model::build_tree(&new_module, &self.module_name);
        let actions = diff_trees(&old_tree, &new_tree);

        let mut trace = Vec::new();
        for action in &actions {
            self.apply_and_record(&module, &new_module, &root, action, depth, callbacks, &mut trace)?;
        }
        Ok(trace)
    }

    fn apply_and_record(
        &self,
        module: &reload_lang::runtime::LiveModule,
        new_module: &reload_lang::runtime::LiveModule,
        root: &FullName,
        action: &DiffAction,
        depth: u32,
        callbacks: &dyn ReloadCallbacks,
        trace: &mut Vec<ActionTrace>,
    ) -> Result<()> {
        apply(module, new_module, root, action)?;

        if let DiffAction::Add {
            kind: NodeKind::Import,
            node,
            ..
        } = action
        {
            self.record_new_import(node);
        }

        let (action_kind, variant, full_name) = match action {
            DiffAction::Add { kind, full_name, .. } => (ActionKind::Add, *kind, full_name.clone()),
            DiffAction::Delete { kind, full_name } => (ActionKind::Delete, *kind, full_name.clone()),
            DiffAction::UpdateCode { kind, full_name, .. } => {
                (ActionKind::Update, *kind, full_name.clone())
            }
            DiffAction::UpdateValue { kind, full_name, .. } => {
                (ActionKind::Update, *kind, full_name.clone())
            }
            DiffAction::UpdateClassBases { full_name, .. } => {
                (ActionKind::Update, NodeKind::Class, full_name.clone())
            }
            DiffAction::UpdateImport { full_name, .. } => {
                (ActionKind::Update, NodeKind::Import, full_name.clone())
            }
            DiffAction::ParentReload(p) => (ActionKind::Update, NodeKind::Class, p.full_name.clone()),
        };
        let entry = ActionTrace::new(action_kind, variant, &full_name);
        debug!(action = %entry, "applied reload action");
        trace.push(entry);

        // A top-level Variable update is the one action kind that cascades:
        // every module transitively importing the changed name gets its
        // own sub-reload.
        if let DiffAction::UpdateValue {
            kind: NodeKind::Variable,
            full_name,
            ..
        } = action
        {
            self.cascade(full_name.last_segment(), depth, callbacks, trace)?;
        }
        Ok(())
    }

    /// A newly added `import`/`from … import …` binding widens this
    /// module's own dependency edges; record it the same way the initial
    /// load does, so a later edit to the newly-imported module cascades
    /// here too.
    fn record_new_import(&self, node: &Node) {
        let Payload::Import { path, names } = &node.payload else {
            return;
        };
        let names = ImportedNames::from(names);
        let imported_file = reload_deps::resolve_under_root(&self.project_root, path);
        self.tracker.record_import(&self.path, &imported_file, &names);
    }

    fn cascade(
        &self,
        used_name: &str,
        depth: u32,
        callbacks: &dyn ReloadCallbacks,
        trace: &mut Vec<ActionTrace>,
    ) -> Result<()> {
        if depth + 1 > self.max_depth {
            warn!(
                depth,
                used_name, "dependent-module cascade exceeded max depth; stopping"
            );
            self.policy.emit(&Error::from(WarningError::DependencyCycle {
                depth,
                chain: vec![used_name.to_string()],
            }));
            return Ok(());
        }

        for dep_path in self.tracker.get_dependencies(&self.path, used_name) {
            let Some((dep_name, _)) = self.registry.get(&dep_path) else {
                debug!(path = %dep_path.display(), "dependent module not registered; skipping");
                continue;
            };
            let dep_root = FullName::root(&dep_name);
            trace.push(ActionTrace::new(ActionKind::Update, NodeKind::Module, &dep_root));

            let sub = PartialReloader {
                path: dep_path,
                module_name: dep_name,
                project_root: self.project_root.clone(),
                registry: self.registry.clone(),
                tracker: self.tracker.clone(),
                max_depth: self.max_depth,
                policy: self.policy.clone(),
            };
            let sub_trace = sub.run_at_depth(depth + 1, callbacks)?;
            trace.extend(sub_trace);
        }
        Ok(())
    }
}
