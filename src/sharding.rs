//! Responder-side shard version check.
//!
//! A shard compares the version a request was routed with against the version
//! it holds for the namespace and rejects the request when they differ.

use crate::stale::StaleConfigError;
use crate::version::ChunkVersion;
use std::cmp::Ordering;
use tracing::debug;

/// Outcome of routing a request against the responder's version.
pub type RoutingResult<T> = Result<T, StaleConfigError>;

/// Check the version a request carried (`received`) against the responder's
/// own version (`wanted`) for `ns`.
///
/// The caller is stale when it knows nothing, its epoch differs, or its
/// ordinal is behind. The responder is stale when it knows nothing or its
/// ordinal is behind.
pub fn check_shard_version(
    ns: &str,
    received: &ChunkVersion,
    wanted: &ChunkVersion,
) -> RoutingResult<()> {
    if received == wanted {
        return Ok(());
    }

    let err = match (received.is_set(), wanted.is_set()) {
        (false, true) => StaleConfigError::send(
            ns,
            "request carried no shard version",
            *received,
            *wanted,
            false,
        ),
        (true, false) => StaleConfigError::recv(
            ns,
            "shard has no version for namespace",
            *received,
            *wanted,
            false,
        ),
        _ => match received.partial_cmp(wanted) {
            None => StaleConfigError::send(ns, "epoch mismatch", *received, *wanted, false),
            Some(Ordering::Greater) => StaleConfigError::recv(
                ns,
                "shard version is behind request",
                *received,
                *wanted,
                false,
            ),
            Some(_) => StaleConfigError::send(
                ns,
                "request version is behind shard",
                *received,
                *wanted,
                false,
            ),
        },
    };

    debug!(
        ns,
        received = %received,
        wanted = %wanted,
        direction = %err.direction(),
        "shard version mismatch"
    );
    Err(err)
}
