/// Errors that indicate a bug in the reloader itself rather than a problem
/// with the user's source. Surfaced with a backtrace and routed to a
/// safe-state wait rather than a crash.
#[derive(Debug, thiserror::Error)]
pub enum InternalError {
    #[error("unexpected reloader state: {0}")]
    InvalidState(String),

    #[error("feature not implemented: {0}")]
    NotImplemented(String),

    #[error("unexpected panic during comparator or diff: {0}")]
    Unexpected(String),
}
