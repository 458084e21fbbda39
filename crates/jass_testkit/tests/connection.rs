//! Connection retries against a flaky connector.

use jass_core::{ConnectionProvider, CoreError, DirectoryRegistry, ReconnectPolicy, Settings};
use jass_engine::{HealthStatus, InMemoryEngine};
use jass_testkit::{FlakyConnector, ManualClock};
use std::sync::Arc;
use std::time::Duration;

fn provider(failures: u32, attempts: u32) -> (ConnectionProvider, Arc<FlakyConnector>, Arc<ManualClock>) {
    let connector = Arc::new(FlakyConnector::new(Arc::new(InMemoryEngine::new()), failures));
    let clock = Arc::new(ManualClock::new());
    let conn = ConnectionProvider::new(
        connector.clone(),
        ReconnectPolicy::fixed(attempts, Duration::from_secs(3)),
        Duration::from_secs(1),
    )
    .with_clock(clock.clone());
    (conn, connector, clock)
}

#[test]
fn recovers_within_the_attempt_budget() {
    let (conn, connector, clock) = provider(2, 5);
    assert!(!conn.is_open());
    conn.open().unwrap();
    assert!(conn.is_open());
    assert_eq!(connector.calls(), 3);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(3); 2]);

    conn.engine().unwrap();
    assert_eq!(connector.calls(), 3);
}

#[test]
fn gives_up_after_the_last_attempt() {
    let (conn, connector, clock) = provider(10, 4);
    let err = conn.open().unwrap_err();
    assert!(matches!(err, CoreError::EngineUnavailable { attempts: 4, .. }));
    assert_eq!(connector.calls(), 4);
    assert_eq!(clock.elapsed(), Duration::from_secs(9));
}

#[test]
fn close_forces_a_reconnect() {
    let (conn, connector, _) = provider(0, 1);
    conn.open().unwrap();
    conn.close();
    assert!(!conn.is_open());
    conn.open().unwrap();
    assert_eq!(connector.calls(), 2);
}

#[test]
fn red_cluster_blocks_provisioning() {
    let engine = Arc::new(InMemoryEngine::new());
    engine.set_health(HealthStatus::Red);
    let conn = Arc::new(ConnectionProvider::for_engine(engine.clone()));
    let registry = DirectoryRegistry::new(conn, &Settings::default());
    assert!(matches!(
        registry.create(),
        Err(CoreError::EngineUnavailable { .. })
    ));
    assert!(engine.index_names().is_empty());

    engine.set_health(HealthStatus::Green);
    registry.create().unwrap();
}
