//! The reload lock: exclusive with command execution, commands drain
//! first. A `tokio::sync::RwLock` is the natural reading of this: commands
//! hold a shared (read) guard for as long as they run, a reload pass takes
//! the exclusive (write) guard, and tokio's writer-biased fairness means
//! once a reload is queued, newly arriving commands wait behind it rather
//! than starving it.

use std::sync::Arc;

use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

#[derive(Clone, Default)]
pub struct ReloadLock {
    inner: Arc<RwLock<()>>,
}

/// Held by a host while executing a command. Drop it to let a queued
/// reload proceed.
pub struct CommandGuard {
    _guard: OwnedRwLockReadGuard<()>,
}

/// Held by the driver for the entire planning + execution of one reload
/// pass, including every recursive dependent-module update.
pub struct ReloadGuard {
    _guard: OwnedRwLockWriteGuard<()>,
}

impl ReloadLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire_command(&self) -> CommandGuard {
        CommandGuard {
            _guard: self.inner.clone().read_owned().await,
        }
    }

    pub async fn acquire_reload(&self) -> ReloadGuard {
        ReloadGuard {
            _guard: self.inner.clone().write_owned().await,
        }
    }
}
