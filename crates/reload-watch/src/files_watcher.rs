//! Thin owning wrapper around [`crate::watcher::start_watcher`] — the
//! `FilesWatcher` service offered to the host.

use std::thread;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::config::ReloaderConfig;
use crate::watcher::{start_watcher, FileChangeEvent, RootKind, WatchRoot};

pub struct FilesWatcher {
    sender: broadcast::Sender<FileChangeEvent>,
    _thread: thread::JoinHandle<()>,
}

impl FilesWatcher {
    pub fn start(config: &ReloaderConfig) -> Self {
        let mut roots: Vec<WatchRoot> = config
            .source_roots
            .iter()
            .cloned()
            .map(|path| WatchRoot { path, kind: RootKind::Source })
            .collect();
        roots.extend(
            config
                .env_roots
                .iter()
                .cloned()
                .map(|path| WatchRoot { path, kind: RootKind::Env }),
        );
        Self::start_roots(roots, config.include.clone(), config.exclude.clone(), config.debounce())
    }

    pub fn start_roots(
        roots: Vec<WatchRoot>,
        include: Vec<String>,
        exclude: Vec<String>,
        debounce: Duration,
    ) -> Self {
        let (tx, _rx) = broadcast::channel(1024);
        let thread = start_watcher(roots, include, exclude, debounce, tx.clone());
        FilesWatcher { sender: tx, _thread: thread }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FileChangeEvent> {
        self.sender.subscribe()
    }
}
