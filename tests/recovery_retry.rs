use stalecfg_rs::test_support::version;
use stalecfg_rs::{
    check_shard_version, retry_on_stale, RecoveryConfig, RecoveryError, StaleConfigError,
    StaleDirection,
};

mod support;

use support::{lookup, FakeRouter};

#[test]
fn refresh_then_retry_succeeds() -> anyhow::Result<()> {
    let shard_version = version(3, 0, 1);
    let mut router = FakeRouter::with_namespace("app.orders", version(2, 5, 1), shard_version);
    let cache = router.cache_handle();
    let config = RecoveryConfig::default();

    let mut attempts = 0;
    let routed = retry_on_stale(&config, &mut router, || {
        attempts += 1;
        check_shard_version("app.orders", &lookup(&cache, "app.orders"), &shard_version)?;
        Ok("routed")
    })?;

    assert_eq!(routed, "routed");
    assert_eq!(attempts, 2);
    assert_eq!(router.calls, vec!["refresh:app.orders"]);
    assert_eq!(router.cached("app.orders"), shard_version);
    Ok(())
}

#[test]
fn epoch_change_triggers_full_reload_once() -> anyhow::Result<()> {
    let shard_version = version(1, 0, 2);
    let mut router = FakeRouter::with_namespace("app.orders", version(7, 0, 1), shard_version);
    let cache = router.cache_handle();

    retry_on_stale(&RecoveryConfig::default(), &mut router, || {
        check_shard_version("app.orders", &lookup(&cache, "app.orders"), &shard_version)
    })?;

    assert_eq!(router.calls, vec!["reload:app.orders"]);
    assert_eq!(router.cached("app.orders"), shard_version);
    Ok(())
}

#[test]
fn persistent_staleness_exhausts_attempts() {
    let mut router = FakeRouter::with_namespace("app.orders", version(1, 0, 1), version(1, 0, 1));
    let config = RecoveryConfig {
        max_attempts: 4,
        ..RecoveryConfig::default()
    };

    let mut attempts = 0;
    let result: Result<(), _> = retry_on_stale(&config, &mut router, || {
        attempts += 1;
        check_shard_version("app.orders", &version(1, 0, 1), &version(2, 0, 1))
    });

    match result {
        Err(RecoveryError::Exhausted { attempts: n, last }) => {
            assert_eq!(n, 4);
            assert_eq!(last.direction(), StaleDirection::Send);
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(attempts, 4);
    assert_eq!(router.calls.len(), 3);
}

#[test]
fn just_connection_only_resyncs() {
    let mut router = FakeRouter::default();
    let config = RecoveryConfig::default();

    let mut first = true;
    let result = retry_on_stale(&config, &mut router, || {
        if std::mem::take(&mut first) {
            return Err(StaleConfigError::send(
                "app.orders",
                "connection not versioned",
                version(1, 0, 1),
                version(1, 0, 1),
                true,
            ));
        }
        Ok(())
    });

    assert!(result.is_ok());
    assert_eq!(router.calls, vec!["resync:app.orders"]);
}

#[test]
fn unknown_namespace_policy() {
    let stale = || {
        StaleConfigError::from_legacy_message(StaleDirection::Recv, "no namespace here", false)
    };

    let mut router = FakeRouter::default();
    let config = RecoveryConfig {
        reload_all_on_unknown_namespace: false,
        ..RecoveryConfig::default()
    };
    let result: Result<(), _> = retry_on_stale(&config, &mut router, || Err(stale()));
    assert!(matches!(result, Err(RecoveryError::UnknownNamespace(_))));
    assert!(router.calls.is_empty());

    let config = RecoveryConfig {
        max_attempts: 2,
        ..RecoveryConfig::default()
    };
    let result: Result<(), _> = retry_on_stale(&config, &mut router, || Err(stale()));
    assert!(matches!(result, Err(RecoveryError::Exhausted { attempts: 2, .. })));
    assert_eq!(router.calls, vec!["reload_all"]);
}

#[test]
fn refresh_failure_is_surfaced() {
    let mut router = FakeRouter::with_namespace("app.orders", version(1, 0, 1), version(2, 0, 1));
    router.fail_refresh = true;

    let result: Result<(), _> = retry_on_stale(&RecoveryConfig::default(), &mut router, || {
        check_shard_version("app.orders", &version(1, 0, 1), &version(2, 0, 1))
    });

    let err = result.unwrap_err();
    assert!(matches!(err, RecoveryError::Refresh(_)));
    assert_eq!(err.to_string(), "routing refresh failed: config server unavailable");
}

#[test]
fn connection_scoped_error_with_new_epoch_reloads_namespace() -> anyhow::Result<()> {
    let shard_version = version(1, 0, 2);
    let mut router = FakeRouter::with_namespace("app.orders", version(7, 0, 1), shard_version);
    let cache = router.cache_handle();

    retry_on_stale(&RecoveryConfig::default(), &mut router, || {
        let cached = lookup(&cache, "app.orders");
        if cached == shard_version {
            return Ok(());
        }
        Err(StaleConfigError::send(
            "app.orders",
            "connection version rejected",
            cached,
            shard_version,
            true,
        ))
    })?;

    assert_eq!(router.calls, vec!["reload:app.orders"]);
    assert_eq!(router.cached("app.orders"), shard_version);
    Ok(())
}
