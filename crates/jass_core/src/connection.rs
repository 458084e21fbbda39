//! Engine connection lifecycle.
//!
//! The provider connects lazily on first use and retries failed connects
//! according to a [`ReconnectPolicy`], sleeping through an injected
//! [`Clock`] so the schedule can be tested without waiting.

use crate::error::{CoreError, CoreResult};
use jass_engine::{EngineError, EngineResult, HealthStatus, SearchEngine};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Opens connections to an engine.
pub trait EngineConnector: Send + Sync {
    /// Connects, returning a shareable engine handle.
    fn connect(&self) -> EngineResult<Arc<dyn SearchEngine>>;
}

/// Connector that hands out an engine built elsewhere.
#[derive(Clone)]
pub struct StaticConnector {
    engine: Arc<dyn SearchEngine>,
}

impl StaticConnector {
    /// Wraps an engine.
    pub fn new(engine: Arc<dyn SearchEngine>) -> Self {
        Self { engine }
    }
}

impl EngineConnector for StaticConnector {
    fn connect(&self) -> EngineResult<Arc<dyn SearchEngine>> {
        Ok(Arc::clone(&self.engine))
    }
}

/// Source of sleeps between reconnect attempts.
pub trait Clock: Send + Sync {
    /// Blocks for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Clock backed by the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Reconnect schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Total connect attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub backoff: Duration,
    /// Growth factor applied to each further delay; 1.0 keeps it fixed.
    pub backoff_multiplier: f64,
    /// Upper bound on any single delay.
    pub max_backoff: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(50, Duration::from_secs(3))
    }
}

impl ReconnectPolicy {
    /// Creates a fixed-delay policy.
    #[must_use]
    pub fn fixed(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
            backoff_multiplier: 1.0,
            max_backoff: backoff,
        }
    }

    /// A single attempt with no retry.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::fixed(1, Duration::ZERO)
    }

    /// Sets the attempt count.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        if self.max_backoff < backoff {
            self.max_backoff = backoff;
        }
        self
    }

    /// Sets the growth factor.
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Sets the delay cap.
    #[must_use]
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Delay before the given attempt (0-indexed). The first attempt is
    /// immediate.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let factor = self.backoff_multiplier.powi(exponent);
        if !factor.is_finite() || factor * self.backoff.as_secs_f64() >= self.max_backoff.as_secs_f64()
        {
            return self.max_backoff;
        }
        self.backoff.mul_f64(factor).min(self.max_backoff)
    }
}

/// Lazily opened, shared engine connection.
pub struct ConnectionProvider {
    connector: Arc<dyn EngineConnector>,
    clock: Arc<dyn Clock>,
    policy: ReconnectPolicy,
    health_timeout: Duration,
    engine: Mutex<Option<Arc<dyn SearchEngine>>>,
}

impl ConnectionProvider {
    /// Creates a closed provider.
    pub fn new(
        connector: Arc<dyn EngineConnector>,
        policy: ReconnectPolicy,
        health_timeout: Duration,
    ) -> Self {
        Self {
            connector,
            clock: Arc::new(SystemClock),
            policy,
            health_timeout,
            engine: Mutex::new(None),
        }
    }

    /// Creates a provider around an existing engine with default policy.
    pub fn for_engine(engine: Arc<dyn SearchEngine>) -> Self {
        Self::new(
            Arc::new(StaticConnector::new(engine)),
            ReconnectPolicy::default(),
            Duration::from_secs(60),
        )
    }

    /// Replaces the clock used between attempts.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Connects now if not already connected.
    ///
    /// # Errors
    ///
    /// Returns `EngineUnavailable` once every attempt has failed.
    pub fn open(&self) -> CoreResult<()> {
        self.engine().map(|_| ())
    }

    /// Returns the engine, connecting first if needed.
    pub fn engine(&self) -> CoreResult<Arc<dyn SearchEngine>> {
        let mut slot = self.engine.lock();
        if let Some(engine) = slot.as_ref() {
            return Ok(Arc::clone(engine));
        }

        let attempts = self.policy.max_attempts.max(1);
        let mut last_error = EngineError::unavailable("no connect attempt made");
        for attempt in 0..attempts {
            let delay = self.policy.delay_for_attempt(attempt);
            if !delay.is_zero() {
                self.clock.sleep(delay);
            }
            match self.connector.connect() {
                Ok(engine) => {
                    info!(attempt = attempt + 1, "connected to search engine");
                    *slot = Some(Arc::clone(&engine));
                    return Ok(engine);
                }
                Err(err) => {
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        error = %err,
                        "connection to search engine failed"
                    );
                    last_error = err;
                }
            }
        }
        Err(CoreError::EngineUnavailable {
            attempts,
            message: last_error.to_string(),
        })
    }

    /// Drops the connection. The next use reconnects.
    pub fn close(&self) {
        self.engine.lock().take();
    }

    /// Returns true if a connection is held.
    pub fn is_open(&self) -> bool {
        self.engine.lock().is_some()
    }

    /// Waits for the cluster to reach at least yellow health.
    ///
    /// # Errors
    ///
    /// Returns `EngineUnavailable` if the cluster is not ready in time.
    pub fn wait_ready(&self) -> CoreResult<HealthStatus> {
        let engine = self.engine()?;
        engine
            .cluster_health(HealthStatus::Yellow, self.health_timeout)
            .map_err(|err| match err {
                EngineError::Timeout(_) | EngineError::Unavailable(_) => {
                    CoreError::EngineUnavailable {
                        attempts: 1,
                        message: err.to_string(),
                    }
                }
                other => CoreError::Engine(other),
            })
    }
}

impl fmt::Debug for ConnectionProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProvider")
            .field("policy", &self.policy)
            .field("health_timeout", &self.health_timeout)
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jass_engine::InMemoryEngine;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct RecordingClock {
        sleeps: Mutex<Vec<Duration>>,
    }

    impl Clock for RecordingClock {
        fn sleep(&self, duration: Duration) {
            self.sleeps.lock().push(duration);
        }
    }

    struct FailingConnector {
        failures: u32,
        calls: AtomicU32,
        engine: Arc<InMemoryEngine>,
    }

    impl EngineConnector for FailingConnector {
        fn connect(&self) -> EngineResult<Arc<dyn SearchEngine>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(EngineError::unavailable("connection refused"))
            } else {
                Ok(self.engine.clone())
            }
        }
    }

    fn provider(failures: u32, policy: ReconnectPolicy) -> (ConnectionProvider, Arc<RecordingClock>) {
        let clock = Arc::new(RecordingClock::default());
        let connector = Arc::new(FailingConnector {
            failures,
            calls: AtomicU32::new(0),
            engine: Arc::new(InMemoryEngine::new()),
        });
        let provider = ConnectionProvider::new(connector, policy, Duration::from_secs(1))
            .with_clock(clock.clone());
        (provider, clock)
    }

    #[test]
    fn default_policy_is_fixed() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.max_attempts, 50);
        assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(3));
        assert_eq!(policy.delay_for_attempt(30), Duration::from_secs(3));
    }

    #[test]
    fn exponential_policy_is_capped() {
        let policy = ReconnectPolicy::fixed(5, Duration::from_millis(100))
            .with_backoff_multiplier(2.0)
            .with_max_backoff(Duration::from_millis(300));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(300));
    }

    #[test]
    fn lazily_connects_once() {
        let (provider, clock) = provider(0, ReconnectPolicy::default());
        assert!(!provider.is_open());
        provider.engine().unwrap();
        provider.engine().unwrap();
        assert!(provider.is_open());
        assert!(clock.sleeps.lock().is_empty());
    }

    #[test]
    fn retries_with_backoff_then_succeeds() {
        let (provider, clock) = provider(2, ReconnectPolicy::fixed(5, Duration::from_secs(3)));
        provider.open().unwrap();
        assert_eq!(
            *clock.sleeps.lock(),
            vec![Duration::from_secs(3), Duration::from_secs(3)]
        );
    }

    #[test]
    fn exhausted_retries_are_unavailable() {
        let (provider, clock) = provider(10, ReconnectPolicy::fixed(3, Duration::from_secs(1)));
        let err = provider.open().unwrap_err();
        assert!(matches!(err, CoreError::EngineUnavailable { attempts: 3, .. }));
        assert_eq!(clock.sleeps.lock().len(), 2);
        assert!(!provider.is_open());
    }

    #[test]
    fn close_forces_reconnect() {
        let (provider, _) = provider(0, ReconnectPolicy::no_retry());
        provider.open().unwrap();
        provider.close();
        assert!(!provider.is_open());
        provider.open().unwrap();
        assert!(provider.is_open());
    }

    #[test]
    fn wait_ready_maps_timeout() {
        let engine = Arc::new(InMemoryEngine::new());
        let provider = ConnectionProvider::for_engine(engine.clone());
        assert_eq!(provider.wait_ready().unwrap(), HealthStatus::Green);

        engine.set_health(HealthStatus::Red);
        assert!(matches!(
            provider.wait_ready(),
            Err(CoreError::EngineUnavailable { .. })
        ));
    }
}
