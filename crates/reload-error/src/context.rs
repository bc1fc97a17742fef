use std::backtrace::Backtrace;
use std::path::PathBuf;

use super::*;

/// A location in the language `reload-lang` parses (1-indexed line/column).
/// Distinct from a Rust `proc_macro2::Span` since the error being described
/// is almost always in the *reloaded* source, not this crate's own source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceSpan {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug)]
pub struct ErrorContext {
    pub span: Option<SourceSpan>,
    pub file_path: PathBuf,
    pub code_snippet: Option<String>,
    pub backtrace: Option<Backtrace>,
}

#[derive(Debug, thiserror::Error)]
pub enum ContextualError {
    #[error("{source}\nContext: {context:?}")]
    WithContext {
        #[source]
        source: Box<Error>,
        context: ErrorContext,
    },
}

impl ErrorContext {
    pub fn new(file_path: PathBuf) -> Self {
        Self {
            file_path,
            span: None,
            code_snippet: None,
            backtrace: Some(Backtrace::capture()),
        }
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }
}

/// Attach file context to a fallible operation without interleaving side
/// effects (logging, emission) into library code.
pub trait ContextExt<T> {
    fn with_context(self, file_path: PathBuf) -> std::result::Result<T, ContextualError>;
}

impl<T, E: Into<Error>> ContextExt<T> for std::result::Result<T, E> {
    fn with_context(self, file_path: PathBuf) -> std::result::Result<T, ContextualError> {
        self.map_err(|e| ContextualError::WithContext {
            source: Box::new(e.into()),
            context: ErrorContext::new(file_path),
        })
    }
}
