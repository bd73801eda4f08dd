// src/resilience/circuit_breaker.rs

//! Circuit breaker guarding calls to the document store.
//!
//! ```text
//! Closed   → Open      failure score reaches the threshold
//! Open     → HalfOpen  reset delay since opening, or recovery timeout since
//!                      the last failure (checked lazily on the next access)
//! HalfOpen → Closed    trial call succeeds
//! HalfOpen → Open      trial call fails
//! ```
//!
//! Network-class failures count half as much as any other failure. The score
//! is kept in half-points so mixed weights add up exactly.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Substrings (lowercase) that mark a failure as a transient network blip.
const NETWORK_MARKERS: [&str; 3] = ["failed to fetch", "network error", "fetch error"];

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Failure score that opens the circuit (a full failure scores 1).
    pub failure_threshold: u32,
    /// Time since the last failure after which an open circuit allows a trial.
    pub recovery_timeout: Duration,
    /// Time since opening after which the circuit moves to half-open.
    pub reset_after: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            reset_after: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Calls pass through.
    Closed,
    /// Calls fail fast without reaching the store.
    Open,
    /// Calls are let through as recovery trials.
    HalfOpen,
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("circuit breaker '{component}' is open")]
    CircuitOpen { component: String },

    #[error("{0}")]
    OperationFailed(E),
}

/// How much a failure counts against the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureWeight {
    Network,
    Full,
}

impl FailureWeight {
    pub fn classify(message: &str) -> Self {
        let message = message.to_lowercase();
        if NETWORK_MARKERS.iter().any(|marker| message.contains(marker)) {
            FailureWeight::Network
        } else {
            FailureWeight::Full
        }
    }

    fn half_points(self) -> u32 {
        match self {
            FailureWeight::Network => 1,
            FailureWeight::Full => 2,
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_points: u32,
    opened_at: Option<Instant>,
    last_failure_at: Option<Instant>,
}

impl BreakerInner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_points: 0,
            opened_at: None,
            last_failure_at: None,
        }
    }

    /// Applies the time-based Open → HalfOpen transition.
    fn refresh(&mut self, name: &str, config: &CircuitBreakerConfig, now: Instant) {
        if self.state != CircuitState::Open {
            return;
        }

        let reset_due = self
            .opened_at
            .is_none_or(|at| now.saturating_duration_since(at) >= config.reset_after);
        let recovery_due = self
            .last_failure_at
            .is_none_or(|at| now.saturating_duration_since(at) >= config.recovery_timeout);

        if reset_due || recovery_due {
            self.state = CircuitState::HalfOpen;
            info!(component = %name, "🟡 Circuit breaker half-open (testing recovery)");
        }
    }

    fn open(&mut self, now: Instant) {
        self.state = CircuitState::Open;
        self.opened_at = Some(now);
        self.last_failure_at = Some(now);
    }
}

/// Explicit, injectable breaker instance. State lives only in memory.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        info!(
            component = %name,
            failure_threshold = config.failure_threshold,
            recovery_timeout_secs = config.recovery_timeout.as_secs(),
            reset_after_secs = config.reset_after.as_secs(),
            "🛡️ Circuit breaker initialized"
        );

        Self {
            name,
            config,
            inner: Mutex::new(BreakerInner::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state, with any due Open → HalfOpen transition applied.
    pub async fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock().await;
        inner.refresh(&self.name, &self.config, Instant::now());
        inner.state
    }

    pub async fn is_available(&self) -> bool {
        self.state().await != CircuitState::Open
    }

    /// Accumulated failure score (network failures count 0.5).
    pub async fn failure_count(&self) -> f64 {
        f64::from(self.inner.lock().await.failure_points) / 2.0
    }

    /// Runs `operation` unless the circuit is open.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        if !self.is_available().await {
            debug!(component = %self.name, "Call rejected, circuit open");
            return Err(CircuitBreakerError::CircuitOpen {
                component: self.name.clone(),
            });
        }

        match operation().await {
            Ok(value) => {
                self.record_success().await;
                Ok(value)
            }
            Err(err) => {
                let weight = FailureWeight::classify(&err.to_string());
                self.record_failure(weight).await;
                Err(CircuitBreakerError::OperationFailed(err))
            }
        }
    }

    async fn record_success(&self) {
        let mut inner = self.inner.lock().await;
        let previous = inner.state;

        inner.state = CircuitState::Closed;
        inner.failure_points = 0;
        inner.opened_at = None;

        if previous != CircuitState::Closed {
            info!(component = %self.name, "🟢 Circuit breaker closed (recovered)");
        }
    }

    async fn record_failure(&self, weight: FailureWeight) {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        inner.last_failure_at = Some(now);

        match inner.state {
            CircuitState::HalfOpen => {
                inner.open(now);
                warn!(component = %self.name, "🔴 Recovery trial failed, circuit re-opened");
            }
            CircuitState::Closed => {
                inner.failure_points += weight.half_points();
                debug!(
                    component = %self.name,
                    ?weight,
                    failure_count = f64::from(inner.failure_points) / 2.0,
                    "Operation failed"
                );

                if inner.failure_points >= self.config.failure_threshold * 2 {
                    inner.open(now);
                    warn!(
                        component = %self.name,
                        failure_count = f64::from(inner.failure_points) / 2.0,
                        failure_threshold = self.config.failure_threshold,
                        "🔴 Circuit breaker opened (failing fast)"
                    );
                }
            }
            // A call admitted before the circuit opened; nothing more to count.
            CircuitState::Open => {}
        }
    }

    pub async fn force_open(&self) {
        warn!(component = %self.name, "🚨 Circuit breaker forced open");
        self.inner.lock().await.open(Instant::now());
    }

    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        *inner = BreakerInner::new();
        info!(component = %self.name, "Circuit breaker reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new("test", CircuitBreakerConfig::default())
    }

    async fn fail(circuit: &CircuitBreaker, message: &str) {
        let message = message.to_string();
        let _ = circuit.execute(|| async move { Err::<(), _>(message) }).await;
    }

    #[test]
    fn classifies_network_failures() {
        assert_eq!(FailureWeight::classify("TypeError: Failed to fetch"), FailureWeight::Network);
        assert_eq!(FailureWeight::classify("network error: connection reset"), FailureWeight::Network);
        assert_eq!(FailureWeight::classify("fetch error"), FailureWeight::Network);
        assert_eq!(FailureWeight::classify("permission denied"), FailureWeight::Full);
    }

    #[tokio::test]
    async fn passes_calls_when_closed() {
        let circuit = breaker();
        let result = circuit.execute(|| async { Ok::<_, String>(42) }).await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(circuit.state().await, CircuitState::Closed);
        assert!(circuit.is_available().await);
    }

    #[tokio::test]
    async fn opens_after_five_full_failures_and_fails_fast() {
        let circuit = breaker();

        for _ in 0..4 {
            fail(&circuit, "permission denied").await;
        }
        assert_eq!(circuit.state().await, CircuitState::Closed);

        fail(&circuit, "permission denied").await;
        assert_eq!(circuit.state().await, CircuitState::Open);
        assert!(!circuit.is_available().await);

        let calls = AtomicUsize::new(0);
        let result = circuit
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(())
            })
            .await;

        assert!(matches!(result, Err(CircuitBreakerError::CircuitOpen { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn network_failures_need_ten_occurrences() {
        let circuit = breaker();

        for _ in 0..9 {
            fail(&circuit, "network error").await;
        }
        assert_eq!(circuit.state().await, CircuitState::Closed);
        assert_eq!(circuit.failure_count().await, 4.5);

        fail(&circuit, "network error").await;
        assert_eq!(circuit.state().await, CircuitState::Open);
    }

    #[tokio::test]
    async fn mixed_weights_accumulate() {
        let circuit = breaker();

        for _ in 0..4 {
            fail(&circuit, "Failed to fetch").await;
        }
        for _ in 0..2 {
            fail(&circuit, "quota exceeded").await;
        }
        assert_eq!(circuit.failure_count().await, 4.0);
        assert_eq!(circuit.state().await, CircuitState::Closed);

        fail(&circuit, "quota exceeded").await;
        assert_eq!(circuit.state().await, CircuitState::Open);
    }

    #[tokio::test]
    async fn success_resets_failure_count() {
        let circuit = breaker();

        for _ in 0..4 {
            fail(&circuit, "boom").await;
        }
        let _ = circuit.execute(|| async { Ok::<_, String>(()) }).await;
        assert_eq!(circuit.failure_count().await, 0.0);

        for _ in 0..4 {
            fail(&circuit, "boom").await;
        }
        assert_eq!(circuit.state().await, CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn stays_open_before_reset_delay() {
        let circuit = breaker();
        circuit.force_open().await;

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(circuit.state().await, CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_trial_failure_reopens_immediately() {
        let circuit = breaker();
        for _ in 0..5 {
            fail(&circuit, "boom").await;
        }

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(circuit.state().await, CircuitState::HalfOpen);
        assert!(circuit.is_available().await);

        fail(&circuit, "boom").await;
        assert_eq!(circuit.state().await, CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_success_closes() {
        let circuit = breaker();
        for _ in 0..5 {
            fail(&circuit, "boom").await;
        }

        tokio::time::advance(Duration::from_secs(11)).await;
        let result = circuit.execute(|| async { Ok::<_, String>("ok") }).await;

        assert!(result.is_ok());
        assert_eq!(circuit.state().await, CircuitState::Closed);
        assert_eq!(circuit.failure_count().await, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn recovery_timeout_applies_when_reset_delay_is_longer() {
        let config = CircuitBreakerConfig {
            failure_threshold: 1,
            recovery_timeout: Duration::from_secs(30),
            reset_after: Duration::from_secs(60),
        };
        let circuit = CircuitBreaker::new("slow-reset", config);
        fail(&circuit, "boom").await;

        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(circuit.state().await, CircuitState::Open);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(circuit.state().await, CircuitState::HalfOpen);
    }
}
