//! Default constants for stale config recovery.
//!
//! All magic numbers are centralized here with documentation.

/// Default number of attempts for an operation that keeps hitting stale
/// metadata, counting the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Reload every namespace when a stale error does not name one.
pub const DEFAULT_RELOAD_ALL_ON_UNKNOWN_NAMESPACE: bool = true;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "STALECFG_";
