//! A module importer that can load a source file into an *ephemeral*
//! object graph used for diffing. `reload-engine` calls this to build both
//! the first live module (on initial load) and every throw-away "new tree"
//! copy it diffs against during a reload pass.

use std::fs;
use std::path::{Path, PathBuf};

use reload_core::ids::ModuleId;

use crate::error::LangError;
use crate::parser::parse_module;
use crate::runtime::{ImportResolver, LiveModule};

/// Reads `path`, parses it, and builds a fresh [`LiveModule`] graph rooted
/// at it. Never mutates any existing live module or the dependency
/// tracker: callers are responsible for disabling tracking before calling this for diff purposes.
pub fn import_from_path(path: &Path) -> Result<LiveModule, LangError> {
    let source = read_source(path)?;
    import_from_source(path.to_path_buf(), &source)
}

/// Same as [`import_from_path`], but resolves each `import`/`from … import
/// …` binding through `resolver` so the resulting module's initializers can
/// observe the current values of names imported from already-loaded
/// modules.
pub fn import_from_path_with_imports(
    path: &Path,
    resolver: &dyn ImportResolver,
) -> Result<LiveModule, LangError> {
    let source = read_source(path)?;
    let ast = parse_module(&source)?;
    Ok(LiveModule::from_ast_with_imports(
        path.to_path_buf(),
        &ast,
        resolver,
    ))
}

fn read_source(path: &Path) -> Result<String, LangError> {
    fs::read_to_string(path).map_err(|e| LangError::Io {
        message: format!("failed to read {}: {e}", path.display()),
    })
}

/// Parses `source` as if it were the contents of `path`, without touching
/// the filesystem. Used by tests and by hosts that already hold the new
/// source text in memory (e.g. from an editor buffer).
pub fn import_from_source(path: PathBuf, source: &str) -> Result<LiveModule, LangError> {
    let ast = parse_module(source)?;
    Ok(LiveModule::from_ast(path, &ast))
}

/// A module's identity derived from its canonical path, used as the join
/// key between the dependency tracker's registry and the live module
/// registry a host maintains.
pub fn module_id_for_path(path: &Path) -> ModuleId {
    ModuleId::for_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_from_source_builds_live_module() {
        let module =
            import_from_source(PathBuf::from("m.rl"), "def f(x) { return x; }").unwrap();
        assert!(module.function("f").is_some());
    }

    #[test]
    fn import_from_path_surfaces_syntax_errors() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("reload_lang_importer_test_{}.rl", std::process::id()));
        std::fs::write(&path, "def f( { return 1; }").unwrap();
        let result = import_from_path(&path);
        assert!(matches!(result, Err(LangError::Syntax { .. })));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn import_from_path_reports_unreadable_file_as_io_not_syntax() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("reload_lang_importer_missing_{}.rl", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let result = import_from_path(&path);
        assert!(matches!(result, Err(LangError::Io { .. })));
    }
}
