//! # Stale Config Recovery
//!
//! Turns a [`StaleConfigError`] into the cheapest metadata action that
//! resolves it, and drives refresh-then-retry for operations routed with
//! cached versions. Fetching routing tables is left to a [`RoutingRefresher`]
//! implementation supplied by the caller.

use crate::config::RecoveryConfig;
use crate::stale::StaleConfigError;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Metadata work needed before retrying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Re-announce the cached version on this connection; metadata is fine.
    ResyncConnection { ns: String },
    /// Refresh the namespace's routing table within the current epoch.
    RefreshNamespace { ns: String },
    /// Discard and rebuild the namespace's routing table.
    ReloadNamespace { ns: String },
    /// The error named no namespace; reload everything.
    ReloadAll,
}

impl RecoveryAction {
    pub fn for_error(err: &StaleConfigError) -> Self {
        let ns = err.ns();
        if ns.is_empty() {
            return RecoveryAction::ReloadAll;
        }
        if err.requires_full_reload() {
            RecoveryAction::ReloadNamespace { ns: ns.to_string() }
        } else if err.just_connection() {
            RecoveryAction::ResyncConnection { ns: ns.to_string() }
        } else {
            RecoveryAction::RefreshNamespace { ns: ns.to_string() }
        }
    }
}

/// Collaborator that owns the cached routing metadata.
///
/// Implementations serialize concurrent reloads of the same namespace.
pub trait RoutingRefresher {
    type Error: std::error::Error + Send + Sync + 'static;

    fn resync_connection(&mut self, ns: &str) -> Result<(), Self::Error>;

    /// Refresh `ns`; `full` discards the cached table first.
    fn refresh_namespace(&mut self, ns: &str, full: bool) -> Result<(), Self::Error>;

    fn reload_all(&mut self) -> Result<(), Self::Error>;
}

#[derive(Debug, Error)]
pub enum RecoveryError<E: std::error::Error + 'static> {
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: StaleConfigError,
    },

    #[error("stale config error without namespace: {0}")]
    UnknownNamespace(StaleConfigError),

    #[error("routing refresh failed: {0}")]
    Refresh(#[source] E),
}

/// Apply the action `err` calls for and report which one ran.
pub fn recover<R: RoutingRefresher>(
    err: &StaleConfigError,
    refresher: &mut R,
) -> Result<RecoveryAction, R::Error> {
    let action = RecoveryAction::for_error(err);
    debug!(
        ns = err.ns(),
        direction = %err.direction(),
        received = %err.version_received(),
        wanted = %err.version_wanted(),
        ?action,
        "recovering from stale config"
    );
    match &action {
        RecoveryAction::ResyncConnection { ns } => refresher.resync_connection(ns)?,
        RecoveryAction::RefreshNamespace { ns } => refresher.refresh_namespace(ns, false)?,
        RecoveryAction::ReloadNamespace { ns } => refresher.refresh_namespace(ns, true)?,
        RecoveryAction::ReloadAll => refresher.reload_all()?,
    }
    Ok(action)
}

/// Run `op`, recovering and retrying while it fails with stale metadata.
#[instrument(skip(config, refresher, op), level = "debug")]
pub fn retry_on_stale<T, R, F>(
    config: &RecoveryConfig,
    refresher: &mut R,
    mut op: F,
) -> Result<T, RecoveryError<R::Error>>
where
    R: RoutingRefresher,
    F: FnMut() -> Result<T, StaleConfigError>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let err = match op() {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if err.ns().is_empty() && !config.reload_all_on_unknown_namespace {
            return Err(RecoveryError::UnknownNamespace(err));
        }
        if attempt >= max_attempts {
            warn!(attempts = attempt, "{}", err);
            return Err(RecoveryError::Exhausted {
                attempts: attempt,
                last: err,
            });
        }

        recover(&err, refresher).map_err(RecoveryError::Refresh)?;
        attempt += 1;
    }
}
