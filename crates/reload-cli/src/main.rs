//! Demo host: watches a project root for edits to `.rl` source files and
//! prints every applied reload action to stdout. Wires the whole stack
//! together the way a real embedder would — this binary carries no logic
//! of its own beyond discovery, wiring, and a print callback.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use reload_core::action::ActionTrace;
use reload_deps::DependencyTracker;
use reload_engine::{ModuleRegistry, ReloadCallbacks};
use reload_error::{CombinedPolicy, Error, ErrorPolicy, TracingPolicy};
use reload_watch::{DriverState, FilesWatcher, ReloaderConfig};

#[derive(Parser, Debug)]
#[command(name = "reload-cli", version, about = "Watches a project root and hot-reloads its .rl modules")]
struct Args {
    /// Root directory to watch and load modules from.
    project_root: PathBuf,

    /// Glob patterns to watch, relative to the project root.
    #[arg(long, default_value = "**/*.rl")]
    include: Vec<String>,

    /// Glob patterns to never reload, relative to the project root.
    #[arg(long)]
    exclude: Vec<String>,

    /// Debounce window in milliseconds before a burst of edits is flushed.
    #[arg(long, default_value_t = 50)]
    debounce_ms: u64,

    /// Dependent-module cascade depth cap.
    #[arg(long, default_value_t = reload_engine::DEFAULT_MAX_DEPTH)]
    max_depth: u32,
}

/// Prints every action trace line to stdout, prefixed with the module path
/// the reload pass ran against.
struct PrintCallbacks;

impl ReloadCallbacks for PrintCallbacks {
    fn after_partial_reload(&self, path: &Path, actions: &[ActionTrace]) {
        for action in actions {
            println!("{}: {action}", path.display());
        }
    }

    fn after_full_reload(&self, path: &Path) {
        println!("{}: full reload", path.display());
    }

    fn on_reload_error(&self, path: &Path, err: &Error) {
        println!("{}: syntax error: {err}", path.display());
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Walks `root` and loads every `.rl` file under it, deriving each module's
/// dotted name from its path relative to `root` (the same one-file-per-module
/// convention `reload_deps::resolve_under_root` expects on the way back).
fn load_all(driver: &DriverState, root: &Path) -> reload_error::Result<Vec<PathBuf>> {
    let mut loaded = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                info!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                continue;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some("rl") {
                continue;
            }
            let module_name = dotted_name(root, &path);
            driver.load_initial(&path, module_name)?;
            loaded.push(path);
        }
    }
    Ok(loaded)
}

fn dotted_name(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let mut segments: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if let Some(last) = segments.last_mut() {
        if let Some(stem) = last.strip_suffix(".rl") {
            *last = stem.to_string();
        }
    }
    segments.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_name_strips_extension_and_joins_components() {
        let root = Path::new("/proj");
        assert_eq!(dotted_name(root, Path::new("/proj/carwash.rl")), "carwash");
        assert_eq!(dotted_name(root, Path::new("/proj/pkg/mod.rl")), "pkg.mod");
    }

    #[test]
    fn load_all_finds_nested_rl_files_and_skips_others() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("car.rl"), "def drive() { return 1; }").unwrap();
        std::fs::create_dir(dir.path().join("pkg")).unwrap();
        std::fs::write(dir.path().join("pkg/carwash.rl"), "def wash() { return 1; }").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let driver = DriverState::new(
            dir.path().to_path_buf(),
            Arc::new(ModuleRegistry::new()),
            Arc::new(DependencyTracker::new()),
            Arc::new(reload_error::NoopPolicy),
            reload_engine::DEFAULT_MAX_DEPTH,
        );
        let loaded = load_all(&driver, dir.path()).unwrap();
        assert_eq!(loaded.len(), 2);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    let config = ReloaderConfig {
        project_root: args.project_root.clone(),
        source_roots: vec![args.project_root.clone()],
        env_roots: Vec::new(),
        include: args.include,
        exclude: args.exclude,
        debounce_ms: args.debounce_ms,
        max_depth: args.max_depth,
    };

    let registry = Arc::new(ModuleRegistry::new());
    let tracker = Arc::new(DependencyTracker::new());
    tracker.enable(std::iter::empty());

    let policy: Arc<dyn ErrorPolicy> = Arc::new(CombinedPolicy::new().push(TracingPolicy));

    let driver = Arc::new(DriverState::new(
        config.project_root.clone(),
        registry,
        tracker,
        policy,
        config.max_depth,
    ));

    let loaded = load_all(&driver, &config.project_root)?;
    info!(count = loaded.len(), root = %config.project_root.display(), "loaded initial modules");
    for path in &loaded {
        println!("{}: loaded", path.display());
    }

    let watcher = FilesWatcher::start(&config);
    let events = watcher.subscribe();

    let callbacks: Arc<dyn ReloadCallbacks> = Arc::new(PrintCallbacks);

    info!(root = %config.project_root.display(), "watching for changes; press Ctrl+C to stop");
    tokio::select! {
        _ = reload_watch::run_loop(driver, callbacks, events) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
