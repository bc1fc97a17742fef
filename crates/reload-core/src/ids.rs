use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable namespace all generated ids are derived from via UUIDv5, so that
/// the same source path always yields the same [`ModuleId`] across process
/// runs (unlike a random v4 id, which would defeat the dependency tracker's
/// "same module" identity check after a full reload re-imports a file).
pub const PROJECT_NAMESPACE_UUID: Uuid = Uuid::from_bytes([
    0xf7, 0xf4, 0xa9, 0xa0, 0x1b, 0x1a, 0x4b, 0x0e, 0x9c, 0x1a, 0x1a, 0x1a, 0x1a, 0x1a, 0x1a, 0x1a,
]);

/// Identity of a loaded module, derived from its canonical source path.
///
/// Two re-imports of the same file share a `ModuleId`; this is what lets the
/// object model treat "foreign object" detection as an exact equality check rather than a name-suffix
/// heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleId(pub Uuid);

impl ModuleId {
    pub fn for_path(path: &Path) -> Self {
        ModuleId(Uuid::new_v5(
            &PROJECT_NAMESPACE_UUID,
            path.to_string_lossy().as_bytes(),
        ))
    }
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
