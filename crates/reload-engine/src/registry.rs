//! The live module registry: the set of
//! already-loaded modules the engine mutates during a reload pass and the
//! driver consults to map a watcher event's path to the module it affects.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;

use reload_lang::runtime::{ImportResolver, LiveModule};
use reload_lang::Value;

struct Entry {
    name: String,
    module: Arc<LiveModule>,
}

/// Keyed by canonical source path, since that's what both watcher events and
/// import resolution naturally produce; the dotted module name is carried
/// alongside for building `FullName` roots and user-facing traces.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: DashMap<PathBuf, Entry>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: PathBuf, name: impl Into<String>, module: Arc<LiveModule>) {
        self.modules.insert(
            path,
            Entry {
                name: name.into(),
                module,
            },
        );
    }

    pub fn remove(&self, path: &Path) -> Option<(String, Arc<LiveModule>)> {
        self.modules
            .remove(path)
            .map(|(_, entry)| (entry.name, entry.module))
    }

    pub fn get(&self, path: &Path) -> Option<(String, Arc<LiveModule>)> {
        self.modules
            .get(path)
            .map(|entry| (entry.name.clone(), entry.module.clone()))
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.modules.contains_key(path)
    }
}

/// Resolves an import binding's bound name by looking up the module backing
/// its dotted path in the registry and reading the name out of its variable
/// table. Used both for the first load of a project and for every
/// ephemeral re-import the engine performs during a reload pass.
pub struct RegistryImportResolver {
    pub registry: Arc<ModuleRegistry>,
    pub source_root: PathBuf,
}

impl ImportResolver for RegistryImportResolver {
    fn resolve(&self, path: &[smol_str::SmolStr], name: &str) -> Option<Value> {
        let file = reload_deps::resolve_under_root(&self.source_root, path);
        let (_, module) = self.registry.get(&file)?;
        let value = module.variables.get(name)?.load();
        Some((**value).clone())
    }
}
