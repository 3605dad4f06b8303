//! Reload-scope decision for stale routing metadata.

use crate::version::ChunkVersion;

/// How much routing metadata must be discarded to reconcile two versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadScope {
    /// Same epoch, both set: refresh the namespace's routing table in place.
    Incremental,
    /// Epoch changed, or one side knows nothing: rebuild the namespace's table.
    Full,
}

impl ReloadScope {
    pub fn between(received: &ChunkVersion, wanted: &ChunkVersion) -> Self {
        if requires_full_reload(received, wanted) {
            ReloadScope::Full
        } else {
            ReloadScope::Incremental
        }
    }
}

/// True when an incremental refresh cannot reconcile `received` with `wanted`.
pub fn requires_full_reload(received: &ChunkVersion, wanted: &ChunkVersion) -> bool {
    !received.has_compatible_epoch(wanted) || received.is_set() != wanted.is_set()
}
