//! # stalecfg
//!
//! Stale routing metadata signalling for horizontally partitioned stores.
//!
//! Every node caches a chunk-to-shard routing table tagged with a
//! [`ChunkVersion`]. When a request's version disagrees with the responder's,
//! the responder returns a [`StaleConfigError`] that says whose metadata is
//! behind, carries both versions, and tells the caller whether refreshing the
//! namespace's table is enough or the whole table must be rebuilt.

pub mod config;
pub mod legacy;
pub mod recovery;
pub mod reload;
pub mod sharding;
pub mod stale;
pub mod test_support;
pub mod version;

// Re-export main types for convenience
pub use config::{ConfigError, ConfigOverrides, RecoveryConfig};
pub use recovery::{recover, retry_on_stale, RecoveryAction, RecoveryError, RoutingRefresher};
pub use reload::{requires_full_reload, ReloadScope};
pub use sharding::{check_shard_version, RoutingResult};
pub use stale::{StaleConfigError, StaleDirection, RECV_STALE_CONFIG_CODE, SEND_STALE_CONFIG_CODE};
pub use version::{ChunkVersion, Epoch};
