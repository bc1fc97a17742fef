//! `ReloaderConfig` — project root, declared source roots vs.
//! environment-boundary roots, debounce duration, include/exclude glob
//! lists, and the dependent-module cascade depth cap. Loadable from TOML
//! via `serde`.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use reload_engine::DEFAULT_MAX_DEPTH;

fn default_debounce_ms() -> u64 {
    50
}

fn default_max_depth() -> u32 {
    DEFAULT_MAX_DEPTH
}

fn default_include() -> Vec<String> {
    vec!["**/*.rl".to_string()]
}

/// Declares which roots are watched and how a host wires the reload driver
/// up. `source_roots` are candidates for partial reload; any
/// edit under `env_roots` always escalates to a full host restart and is
/// never handed to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloaderConfig {
    pub project_root: PathBuf,
    #[serde(default)]
    pub source_roots: Vec<PathBuf>,
    #[serde(default)]
    pub env_roots: Vec<PathBuf>,
    #[serde(default = "default_include")]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
}

impl ReloaderConfig {
    /// A single-source-root project with every default left in place; the
    /// common case for tests and the CLI demo.
    pub fn single_root(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        ReloaderConfig {
            source_roots: vec![project_root.clone()],
            env_roots: Vec::new(),
            include: default_include(),
            exclude: Vec::new(),
            debounce_ms: default_debounce_ms(),
            max_depth: default_max_depth(),
            project_root,
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
