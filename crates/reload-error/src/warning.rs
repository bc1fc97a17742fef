/// Non-fatal conditions worth surfacing but that never block a reload pass.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WarningError {
    #[error("dependency information missing for {module_file}; assuming not affected")]
    MissingDependencyInfo { module_file: String },

    #[error("recursive dependent-module update cycle detected at depth {depth}: {chain:?}")]
    DependencyCycle { depth: u32, chain: Vec<String> },

    #[error("comparator for {full_name} panicked; treating as equal")]
    ComparatorPanicked { full_name: String },

    #[error("watcher event for untracked path: {path}")]
    UntrackedPath { path: String },
}
