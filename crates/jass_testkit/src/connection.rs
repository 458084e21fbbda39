//! Connection doubles.

use jass_core::{Clock, EngineConnector};
use jass_engine::{EngineError, EngineResult, SearchEngine};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Clock that records sleeps instead of blocking.
#[derive(Debug, Default)]
pub struct ManualClock {
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    /// Creates a clock with no recorded sleeps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }

    /// Sum of every sleep requested so far.
    pub fn elapsed(&self) -> Duration {
        self.sleeps.lock().iter().sum()
    }
}

impl Clock for ManualClock {
    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
    }
}

/// Connector that refuses the first `failures` connects.
pub struct FlakyConnector {
    engine: Arc<dyn SearchEngine>,
    failures: u32,
    calls: AtomicU32,
}

impl FlakyConnector {
    /// Fails `failures` times, then hands out `engine`.
    pub fn new(engine: Arc<dyn SearchEngine>, failures: u32) -> Self {
        Self {
            engine,
            failures,
            calls: AtomicU32::new(0),
        }
    }

    /// Connect attempts made so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EngineConnector for FlakyConnector {
    fn connect(&self) -> EngineResult<Arc<dyn SearchEngine>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            Err(EngineError::unavailable(format!("connection refused ({})", call + 1)))
        } else {
            Ok(Arc::clone(&self.engine))
        }
    }
}

impl std::fmt::Debug for FlakyConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlakyConnector")
            .field("failures", &self.failures)
            .field("calls", &self.calls())
            .finish_non_exhaustive()
    }
}
