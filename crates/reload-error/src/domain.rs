/// Structured, non-fatal domain failures. These are returned from library
/// code and classified/emitted by an [`crate::ErrorPolicy`] at the
/// application boundary rather than logged inline.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DomainError {
    #[error("object model error: {message}")]
    Model { message: String },

    #[error("dependency tracker error: {message}")]
    Deps { message: String },

    #[error("watcher error: {message}")]
    Watch { message: String },

    #[error("lexer/parser error: {message}")]
    Lang { message: String },

    #[error("configuration error: {message}")]
    Config { message: String },
}
