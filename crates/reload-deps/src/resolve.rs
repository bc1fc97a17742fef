use std::path::{Path, PathBuf};

use smol_str::SmolStr;

/// Resolves a dotted import path (e.g. `["pkg", "mod"]` from `import
/// pkg.mod;`) to a canonical file path under `source_root`, following the
/// toy language's one-file-per-module convention (`pkg/mod.rl`).
///
/// This is only the default layout convention; a host free to lay modules
/// out differently can ignore this and pass its own closure to
/// [`crate::DependencyTracker::record_module_imports`].
pub fn resolve_under_root(source_root: &Path, dotted: &[SmolStr]) -> PathBuf {
    let mut path = source_root.to_path_buf();
    for segment in dotted {
        path.push(segment.as_str());
    }
    path.set_extension("rl");
    path
}
