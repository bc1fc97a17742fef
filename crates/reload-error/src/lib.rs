#![doc = r#"
reload-error — workspace-wide error types, severity, and policy-driven emission.

Overview
- A single Error enum shared across the reload-* crates.
- Severity classification for coarse, programmatic handling.
- DomainError for structured, non-fatal domain failures.
- Result alias for ergonomic propagation.
- Context and iterator extensions to reduce boilerplate.
- Policy-driven emission via ErrorPolicy so libraries stay side-effect free.

Library code should return `reload_error::Result<T>`, construct structured
errors, and let the application choose an `ErrorPolicy` (e.g. `TracingPolicy`)
at the boundary rather than logging inline.

Example: policy-driven emission at the boundary
```rust,ignore
use reload_error::{Result, ErrorPolicy, ResultExt, policy::NoopPolicy};

fn handle_request(policy: &impl ErrorPolicy) -> Result<()> {
    do_the_thing().emit_event(policy)?;
    Ok(())
}

fn do_the_thing() -> Result<()> { Ok(()) }
```
"#]

pub mod context;
pub mod domain;
pub mod fatal;
pub mod internal;
pub mod policy;
pub mod result_ext;
pub mod severity;
pub mod warning;

pub use context::{ContextExt, ContextualError, ErrorContext, SourceSpan};
pub use domain::DomainError;
pub use fatal::FatalError;
pub use internal::InternalError;
#[cfg(feature = "tracing")]
pub use policy::TracingPolicy;
pub use policy::{CombinedPolicy, ErrorPolicy, NoopPolicy};
pub use result_ext::{IterResultExt, ResultExt};
pub use severity::Severity;
pub use warning::WarningError;

/// Workspace-wide result alias. Use throughout library code and propagate
/// failures with `?`.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error type used across the reload-* crates.
///
/// Variants group failures into coarse classes; see [`Error::severity`] for
/// programmatic classification. Emission/logging is performed by an
/// application-supplied [`policy::ErrorPolicy`], not inline in libraries.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Fatal(#[from] FatalError),
    #[error(transparent)]
    Warning(#[from] WarningError),
    #[error(transparent)]
    Internal(#[from] InternalError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Context(#[from] ContextualError),
}

impl Error {
    /// Returns true if this error is a Warning variant.
    pub fn is_warning(&self) -> bool {
        matches!(self, Error::Warning(_))
    }

    /// Coarse severity classification for programmatic handling: decide
    /// whether to continue or abort a reload pass, or route to different
    /// handlers in an application.
    pub fn severity(&self) -> Severity {
        match self {
            Error::Warning(_) => Severity::Warning,
            Error::Fatal(_) => Severity::Fatal,
            Error::Internal(_) | Error::Domain(_) | Error::Context(_) => Severity::Error,
        }
    }
}
