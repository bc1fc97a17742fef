//! File-watcher and reload driver: detects source edits on a
//! dedicated watcher thread, hands each event to [`driver::DriverState`],
//! which resolves the live module, acquires the reload lock, and runs the
//! engine — falling back to a full reload on anything other than a
//! recoverable `SyntaxError`.

pub mod config;
pub mod driver;
pub mod files_watcher;
pub mod lock;
pub mod watcher;

pub use config::ReloaderConfig;
pub use driver::{run_loop, DriverState, ReloadOutcome};
pub use files_watcher::FilesWatcher;
pub use lock::{CommandGuard, ReloadGuard, ReloadLock};
pub use watcher::{start_watcher, FileChangeEvent, FileEventKind, RootKind, WatchRoot};
