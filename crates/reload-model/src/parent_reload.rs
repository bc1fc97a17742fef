use reload_core::name::FullName;

/// Raised when a minimal patch would violate closure/identity invariants:
/// a method's free-variable list differs between old and new code, meaning
/// the function's captured environment changed shape and an in-place code
/// swap would silently corrupt already-captured state. The engine catches this
/// locally and escalates only the affected container rather than failing
/// the whole pass.
#[derive(Debug, Clone)]
pub struct ParentReloadNeeded {
    pub full_name: FullName,
    pub reason: String,
}

impl std::fmt::Display for ParentReloadNeeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "parent reload needed for {}: {}",
            self.full_name, self.reason
        )
    }
}

impl std::error::Error for ParentReloadNeeded {}
