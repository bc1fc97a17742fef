//! `FilesWatcher` — a recursive file watcher: a dedicated watcher thread
//! feeds a notify callback into an mpsc channel, a single loop coalesces
//! rapid-fire events per path by kind precedence
//! (Removed > Renamed > Created > Modified > Other) and flushes once a path
//! has been quiet for the configured debounce window, broadcasting the
//! normalized result.
//!
//! Every root is tagged as [`RootKind::Source`] or [`RootKind::Env`], and
//! source-root events are filtered through include/exclude globs.

use std::collections::HashMap;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use globset::{Glob, GlobSet, GlobSetBuilder};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::broadcast;

/// Kinds of file events surfaced to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEventKind {
    Created,
    Modified,
    Removed,
    Renamed,
    Other,
}

/// Which watch boundary a root belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    /// A declared source root: candidate for partial reload.
    Source,
    /// The whole-project/environment-definition boundary: always a full
    /// restart, never handed to the engine.
    Env,
}

#[derive(Debug, Clone)]
pub struct WatchRoot {
    pub path: PathBuf,
    pub kind: RootKind,
}

/// A normalized file change event, tagged with the root boundary it fell
/// under.
#[derive(Debug, Clone)]
pub struct FileChangeEvent {
    pub path: PathBuf,
    pub kind: FileEventKind,
    /// For rename events, the previous path when available.
    pub old_path: Option<PathBuf>,
    pub root_kind: RootKind,
}

fn event_rank(k: &FileEventKind) -> u8 {
    match k {
        FileEventKind::Removed => 4,
        FileEventKind::Renamed => 3,
        FileEventKind::Created => 2,
        FileEventKind::Modified => 1,
        FileEventKind::Other => 0,
    }
}

fn build_globset(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        } else {
            tracing::warn!(pattern, "ignoring unparsable watch glob");
        }
    }
    builder.build().unwrap_or_else(|_| GlobSetBuilder::new().build().unwrap())
}

/// Finds the most specific root `path` falls under, or `None` if it is
/// outside every watched root.
fn classify_root<'a>(path: &PathBuf, roots: &'a [WatchRoot]) -> Option<&'a WatchRoot> {
    roots
        .iter()
        .filter(|r| path.starts_with(&r.path))
        .max_by_key(|r| r.path.as_os_str().len())
}

/// Starts a background watcher thread over every root in `roots`,
/// broadcasting debounced, include/exclude-filtered, root-tagged events on
/// `events_tx`. Source-root events are filtered through `include`/`exclude`
/// globs (relative-path match against the source root); env-root events are
/// never filtered, since any change there escalates regardless of content
/// Spawns the watcher thread and returns its join handle.
pub fn start_watcher(
    roots: Vec<WatchRoot>,
    include: Vec<String>,
    exclude: Vec<String>,
    debounce: Duration,
    events_tx: broadcast::Sender<FileChangeEvent>,
) -> thread::JoinHandle<()> {
    let include_set = build_globset(&include);
    let exclude_set = build_globset(&exclude);

    // Synchronize startup so callers don't miss very-early events (like
    // Create) due to watcher registration races.
    let (ready_tx, ready_rx) = std::sync::mpsc::channel::<()>();

    let jh = thread::spawn(move || {
        let config = Config::default().with_poll_interval(debounce);
        let tx_broadcast = events_tx.clone();

        let (notify_tx, notify_rx) = std::sync::mpsc::channel::<Result<Event, notify::Error>>();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                if notify_tx.send(res).is_err() {
                    tracing::warn!("reload-watch: notify channel closed, dropping event");
                }
            },
            config,
        )
        .expect("failed to create file watcher");

        for root in &roots {
            if let Err(e) = watcher.watch(&root.path, RecursiveMode::Recursive) {
                tracing::warn!(root = %root.path.display(), error = %e, "failed to watch root");
            }
        }

        let _ = ready_tx.send(());

        let mut pending: HashMap<PathBuf, (FileEventKind, Option<PathBuf>, Instant)> = HashMap::new();

        loop {
            match notify_rx.recv_timeout(debounce.max(Duration::from_millis(1))) {
                Ok(Ok(event)) => {
                    for (path, kind, old_path) in map_notify_events(event) {
                        let now = Instant::now();
                        use std::collections::hash_map::Entry;
                        match pending.entry(path) {
                            Entry::Occupied(mut occ) => {
                                let (existing_kind, existing_old_path, last_update) = occ.get_mut();
                                if event_rank(&kind) > event_rank(existing_kind) {
                                    *existing_kind = kind;
                                    *existing_old_path = old_path.clone();
                                } else if matches!(existing_kind, FileEventKind::Renamed)
                                    && existing_old_path.is_none()
                                    && old_path.is_some()
                                {
                                    *existing_old_path = old_path.clone();
                                }
                                *last_update = now;
                            }
                            Entry::Vacant(vac) => {
                                vac.insert((kind, old_path, now));
                            }
                        }
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "reload-watch: watcher backend error");
                }
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
            }

            let now = Instant::now();
            let to_flush: Vec<PathBuf> = pending
                .iter()
                .filter(|(_, (_, _, t))| now.duration_since(*t) >= debounce)
                .map(|(p, _)| p.clone())
                .collect();

            for p in to_flush {
                let Some((kind, old_path, _)) = pending.remove(&p) else {
                    continue;
                };
                let Some(root) = classify_root(&p, &roots) else {
                    continue;
                };
                if root.kind == RootKind::Source {
                    let rel = p.strip_prefix(&root.path).unwrap_or(&p);
                    if !include_set.is_match(rel) || exclude_set.is_match(rel) {
                        continue;
                    }
                }
                let _ = tx_broadcast.send(FileChangeEvent {
                    path: p,
                    kind,
                    old_path,
                    root_kind: root.kind,
                });
            }

            thread::park_timeout(Duration::from_millis(5));
        }
    });

    let _ = ready_rx.recv();
    jh
}

fn map_notify_events(event: Event) -> Vec<(PathBuf, FileEventKind, Option<PathBuf>)> {
    use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
    match &event.kind {
        EventKind::Create(CreateKind::Any | CreateKind::File | CreateKind::Folder) => event
            .paths
            .into_iter()
            .map(|p| (p, FileEventKind::Created, None))
            .collect(),
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => event
            .paths
            .into_iter()
            .map(|p| (p, FileEventKind::Modified, None))
            .collect(),
        EventKind::Remove(RemoveKind::Any | RemoveKind::File | RemoveKind::Folder) => event
            .paths
            .into_iter()
            .map(|p| (p, FileEventKind::Removed, None))
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            if event.paths.len() >= 2 {
                let from = event.paths[0].clone();
                let to = event.paths[1].clone();
                vec![(to, FileEventKind::Renamed, Some(from))]
            } else {
                event
                    .paths
                    .into_iter()
                    .map(|p| (p, FileEventKind::Renamed, None))
                    .collect()
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From | RenameMode::To)) => event
            .paths
            .into_iter()
            .map(|p| (p, FileEventKind::Renamed, None))
            .collect(),
        _ => event
            .paths
            .into_iter()
            .map(|p| (p, FileEventKind::Other, None))
            .collect(),
    }
}
