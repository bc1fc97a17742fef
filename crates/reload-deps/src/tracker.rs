use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use smol_str::SmolStr;
use tracing::debug;

use reload_core::ids::ModuleId;
use reload_lang::{LiveImportNames, LiveModule};

/// The set of symbols an importer observed, mirroring
/// [`reload_lang::LiveImportNames`] one layer removed from the language so
/// this crate never needs to import `reload-lang`'s AST types directly in
/// its public surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportedNames {
    Wildcard,
    Explicit(Vec<SmolStr>),
}

impl ImportedNames {
    pub fn contains(&self, name: &str) -> bool {
        match self {
            ImportedNames::Wildcard => true,
            ImportedNames::Explicit(names) => names.iter().any(|n| n.as_str() == name),
        }
    }

    fn merge(&mut self, other: &ImportedNames) {
        match (&mut *self, other) {
            (ImportedNames::Wildcard, _) => {}
            (slot, ImportedNames::Wildcard) => *slot = ImportedNames::Wildcard,
            (ImportedNames::Explicit(a), ImportedNames::Explicit(b)) => {
                for name in b {
                    if !a.iter().any(|existing| existing == name) {
                        a.push(name.clone());
                    }
                }
            }
        }
    }
}

impl From<&LiveImportNames> for ImportedNames {
    fn from(names: &LiveImportNames) -> Self {
        match names {
            LiveImportNames::Wildcard => ImportedNames::Wildcard,
            LiveImportNames::Explicit(names) => ImportedNames::Explicit(names.clone()),
        }
    }
}

/// One importer's relationship to an imported module: who imports it, and
/// which of its symbols they bind.
#[derive(Debug, Clone)]
pub struct Dependency {
    pub importer_file: PathBuf,
    pub imported_names: ImportedNames,
}

/// The import-interception layer. Cheap to share: every
/// method takes `&self`, so a single `Arc<DependencyTracker>` can be held
/// by the driver, the engine, and every sub-reloader it spawns.
#[derive(Debug, Default)]
pub struct DependencyTracker {
    enabled: AtomicBool,
    blacklist: DashMap<PathBuf, ()>,
    /// imported module file -> its importers
    importers: DashMap<PathBuf, Vec<Dependency>>,
    /// module file -> live module ids currently backed by it.
    module_ids: DashMap<PathBuf, Vec<ModuleId>>,
}

impl DependencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the import interceptor: subsequent calls to
    /// [`Self::record_import`]/[`Self::record_module_imports`] actually
    /// record events. `blacklist` is the set of module files to never
    /// record dependencies against (e.g. standard-library-equivalent
    /// modules a host never wants to reload).
    pub fn enable(&self, blacklist: impl IntoIterator<Item = PathBuf>) {
        self.blacklist.clear();
        for path in blacklist {
            self.blacklist.insert(path, ());
        }
        self.enabled.store(true, Ordering::SeqCst);
    }

    /// Restores the untracked state. The engine calls this around its own
    /// re-import of a file for diffing, so that
    /// ephemeral diff copies never pollute the dependency graph.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Runs `f` with recording turned off, then restores whatever state was
    /// in effect before the call (not unconditionally re-enabling), so a
    /// caller that had already disabled the tracker for its own reasons
    /// isn't accidentally re-armed. The engine wraps its re-import of a
    /// file in this so the diff pass's own throwaway
    /// parse never writes dependency edges, without disturbing the
    /// blacklist a host configured via [`Self::enable`].
    pub fn with_tracking_disabled<T>(&self, f: impl FnOnce() -> T) -> T {
        let was_enabled = self.is_enabled();
        self.enabled.store(false, Ordering::SeqCst);
        let result = f();
        if was_enabled {
            self.enabled.store(true, Ordering::SeqCst);
        }
        result
    }

    /// Registers that `file` is currently backing live module `id`.
    pub fn register_module(&self, file: &Path, id: ModuleId) {
        let mut entry = self.module_ids.entry(file.to_path_buf()).or_default();
        if !entry.contains(&id) {
            entry.push(id);
        }
    }

    pub fn unregister_module(&self, file: &Path, id: ModuleId) {
        if let Some(mut entry) = self.module_ids.get_mut(file) {
            entry.retain(|existing| *existing != id);
        }
    }

    pub fn modules_for_file(&self, file: &Path) -> Vec<ModuleId> {
        self.module_ids
            .get(file)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }

    /// Records one import event: `importer_file` binds `names` from the
    /// module backed by `imported_file`.
    /// Silently ignored while disabled or blacklisted — "the tracker never
    /// fails loudly".
    pub fn record_import(&self, importer_file: &Path, imported_file: &Path, names: &ImportedNames) {
        if !self.is_enabled() {
            return;
        }
        if self.blacklist.contains_key(imported_file) {
            return;
        }
        let mut deps = self.importers.entry(imported_file.to_path_buf()).or_default();
        if let Some(existing) = deps
            .iter_mut()
            .find(|d| d.importer_file == importer_file)
        {
            existing.imported_names.merge(names);
        } else {
            deps.push(Dependency {
                importer_file: importer_file.to_path_buf(),
                imported_names: names.clone(),
            });
        }
        debug!(
            importer = %importer_file.display(),
            imported = %imported_file.display(),
            "recorded module dependency"
        );
    }

    /// Walks `module`'s import bindings and records each one, resolving a
    /// dotted path to a file via `resolve`. Also descends each dotted
    /// path's intermediate segments.
    pub fn record_module_imports(
        &self,
        importer_file: &Path,
        module: &LiveModule,
        resolve: impl Fn(&[SmolStr]) -> Option<PathBuf>,
    ) {
        if !self.is_enabled() {
            return;
        }
        for binding in module.imports.load().iter() {
            let Some(imported_file) = resolve(&binding.path) else {
                continue;
            };
            let names = ImportedNames::from(&binding.names);
            self.record_import(importer_file, &imported_file, &names);

            for depth in 1..binding.path.len() {
                if let Some(prefix_file) = resolve(&binding.path[..depth]) {
                    if prefix_file != imported_file {
                        self.record_import(importer_file, &prefix_file, &ImportedNames::Wildcard);
                    }
                }
            }
        }
    }

    /// All modules (transitively) importing `used_name` from `module_file`,
    /// in discovery order, deduplicated by module identity. Never fails: a missing or unreadable
    /// entry simply yields no results for that branch.
    pub fn get_dependencies(&self, module_file: &Path, used_name: &str) -> Vec<PathBuf> {
        let mut explored = HashSet::new();
        let mut added = HashSet::new();
        let mut order = Vec::new();
        self.collect(module_file, used_name, &mut explored, &mut added, &mut order);
        order
    }

    fn collect(
        &self,
        module_file: &Path,
        used_name: &str,
        explored: &mut HashSet<PathBuf>,
        added: &mut HashSet<PathBuf>,
        order: &mut Vec<PathBuf>,
    ) {
        if !explored.insert(module_file.to_path_buf()) {
            return;
        }
        let Some(deps) = self.importers.get(module_file) else {
            return;
        };
        let last_segment = used_name.rsplit('.').next().unwrap_or(used_name);
        for dep in deps.iter() {
            let included = match &dep.imported_names {
                ImportedNames::Wildcard => true,
                ImportedNames::Explicit(names) => {
                    names.iter().any(|n| n.as_str() == used_name)
                        || source_contains_literal(&dep.importer_file, last_segment)
                }
            };
            if !included {
                continue;
            }
            if added.insert(dep.importer_file.clone()) {
                order.push(dep.importer_file.clone());
            }
            self.collect(&dep.importer_file, used_name, explored, added, order);
        }
    }
}

fn source_contains_literal(path: &Path, needle: &str) -> bool {
    std::fs::read_to_string(path)
        .map(|source| source.contains(needle))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn p(s: &str) -> PathBuf {
        PathBuf::from(s)
    }

    #[test]
    fn disabled_tracker_records_nothing() {
        let tracker = DependencyTracker::new();
        tracker.record_import(
            &p("car.rl"),
            &p("carwash.rl"),
            &ImportedNames::Explicit(vec![SmolStr::new("sprinkler_n")]),
        );
        assert!(tracker.get_dependencies(&p("carwash.rl"), "sprinkler_n").is_empty());
    }

    #[test]
    fn wildcard_importer_is_always_included() {
        let tracker = DependencyTracker::new();
        tracker.enable(vec![]);
        tracker.record_import(&p("car.rl"), &p("carwash.rl"), &ImportedNames::Wildcard);
        let deps = tracker.get_dependencies(&p("carwash.rl"), "sprinkler_n");
        assert_eq!(deps, vec![p("car.rl")]);
    }

    #[test]
    fn explicit_importer_included_only_for_named_symbol() {
        let tracker = DependencyTracker::new();
        tracker.enable(vec![]);
        tracker.record_import(
            &p("car.rl"),
            &p("carwash.rl"),
            &ImportedNames::Explicit(vec![SmolStr::new("sprinkler_n")]),
        );
        assert_eq!(
            tracker.get_dependencies(&p("carwash.rl"), "sprinkler_n"),
            vec![p("car.rl")]
        );
        assert!(tracker
            .get_dependencies(&p("carwash.rl"), "other_symbol")
            .is_empty());
    }

    #[test]
    fn transitive_importers_are_discovered_in_order() {
        let tracker = DependencyTracker::new();
        tracker.enable(vec![]);
        tracker.record_import(
            &p("car.rl"),
            &p("carwash.rl"),
            &ImportedNames::Explicit(vec![SmolStr::new("sprinkler_n")]),
        );
        tracker.record_import(&p("garage.rl"), &p("car.rl"), &ImportedNames::Wildcard);
        let deps = tracker.get_dependencies(&p("carwash.rl"), "sprinkler_n");
        assert_eq!(deps, vec![p("car.rl"), p("garage.rl")]);
    }

    #[test]
    fn blacklisted_module_is_never_tracked() {
        let tracker = DependencyTracker::new();
        tracker.enable(vec![p("carwash.rl")]);
        tracker.record_import(&p("car.rl"), &p("carwash.rl"), &ImportedNames::Wildcard);
        assert!(tracker.get_dependencies(&p("carwash.rl"), "sprinkler_n").is_empty());
    }

    #[test]
    fn cyclic_imports_do_not_infinite_loop() {
        let tracker = DependencyTracker::new();
        tracker.enable(vec![]);
        tracker.record_import(&p("b.rl"), &p("a.rl"), &ImportedNames::Wildcard);
        tracker.record_import(&p("a.rl"), &p("b.rl"), &ImportedNames::Wildcard);
        let deps = tracker.get_dependencies(&p("a.rl"), "x");
        assert_eq!(deps, vec![p("b.rl")]);
    }

    #[test]
    fn duplicate_import_events_merge_rather_than_duplicate() {
        let tracker = DependencyTracker::new();
        tracker.enable(vec![]);
        tracker.record_import(
            &p("car.rl"),
            &p("carwash.rl"),
            &ImportedNames::Explicit(vec![SmolStr::new("sprinkler_n")]),
        );
        tracker.record_import(
            &p("car.rl"),
            &p("carwash.rl"),
            &ImportedNames::Explicit(vec![SmolStr::new("cars_n")]),
        );
        assert_eq!(
            tracker.get_dependencies(&p("carwash.rl"), "cars_n"),
            vec![p("car.rl")]
        );
        assert_eq!(
            tracker.get_dependencies(&p("carwash.rl"), "sprinkler_n"),
            vec![p("car.rl")]
        );
    }
}
