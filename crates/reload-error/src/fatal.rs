/// Errors that abort the current reload pass outright. Only `SyntaxError`
/// is recoverable: it leaves the live module untouched and is reported via
/// `on_reload_error`. The other variants are the unrecoverable errors the
/// driver falls back to a full reload on.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FatalError {
    #[error("syntax error in {path}: {message}")]
    SyntaxError { path: String, message: String },

    #[error("failed to re-import {path}: {message}")]
    ImportFailed { path: String, message: String },

    #[error("module registry is corrupted: {0}")]
    RegistryCorruption(String),
}
