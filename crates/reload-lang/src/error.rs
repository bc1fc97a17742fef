/// Errors raised while loading a module source file: either the file
/// couldn't be read at all, or it was read but failed to lex/parse.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LangError {
    #[error("syntax error: {message}")]
    Syntax { message: String },

    /// The source file itself couldn't be read (vanished, permissions,
    /// not valid UTF-8, …). Distinct from `Syntax` because the driver
    /// treats the two differently: a syntax error is recoverable and
    /// leaves the live module untouched, but an unreadable file is not
    /// a "syntax error in user source" and must escalate to a full
    /// reload.
    #[error("failed to read source: {message}")]
    Io { message: String },
}

impl From<LangError> for reload_error::Error {
    fn from(e: LangError) -> Self {
        match e {
            LangError::Syntax { message } => reload_error::FatalError::SyntaxError {
                path: String::new(),
                message,
            }
            .into(),
            LangError::Io { message } => reload_error::FatalError::ImportFailed {
                path: String::new(),
                message,
            }
            .into(),
        }
    }
}
