//! Circuit breaker guarding the broker transport (spec's "Connection-breaker").
//!
//! Closed: requests pass through, failures counted. Open: requests fail
//! immediately for a cooldown. `HalfOpen`: after the cooldown, a limited
//! number of probes test recovery before closing again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

/// Circuit breaker configuration.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening the circuit.
    pub failure_threshold: usize,
    /// How long to wait in `Open` before probing `HalfOpen`.
    pub timeout: Duration,
    /// Number of successes in `HalfOpen` before closing the circuit.
    pub success_threshold: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(60),
            success_threshold: 2,
        }
    }
}

impl CircuitBreakerConfig {
    #[must_use]
    pub const fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder {
            failure_threshold: Some(5),
            timeout: Some(Duration::from_secs(60)),
            success_threshold: Some(2),
        }
    }
}

/// Builder for [`CircuitBreakerConfig`].
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfigBuilder {
    failure_threshold: Option<usize>,
    timeout: Option<Duration>,
    success_threshold: Option<usize>,
}

impl CircuitBreakerConfigBuilder {
    #[must_use]
    pub const fn failure_threshold(mut self, threshold: usize) -> Self {
        self.failure_threshold = Some(threshold);
        self
    }

    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    #[must_use]
    pub const fn success_threshold(mut self, threshold: usize) -> Self {
        self.success_threshold = Some(threshold);
        self
    }

    #[must_use]
    pub fn build(self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold.unwrap_or(5),
            timeout: self.timeout.unwrap_or(Duration::from_secs(60)),
            success_threshold: self.success_threshold.unwrap_or(2),
        }
    }
}

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Closed,
    Open,
    HalfOpen,
}

/// Errors surfaced by [`CircuitBreaker::call`].
#[derive(Error, Debug)]
pub enum CircuitBreakerError<E> {
    #[error("circuit breaker is open")]
    Open,
    #[error("operation failed: {0}")]
    Inner(E),
}

#[derive(Debug)]
struct CircuitBreakerState {
    state: State,
    failure_count: usize,
    success_count: usize,
    last_failure_time: Option<Instant>,
}

/// Wraps a fallible async operation (here, a broker publish) and short-circuits
/// it once failures exceed `failure_threshold`, so a broker outage fails fast
/// instead of hanging every publishing caller.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    config: Arc<CircuitBreakerConfig>,
    state: Arc<RwLock<CircuitBreakerState>>,
    total_calls: Arc<AtomicU64>,
    total_successes: Arc<AtomicU64>,
    total_failures: Arc<AtomicU64>,
    total_rejections: Arc<AtomicU64>,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config: Arc::new(config),
            state: Arc::new(RwLock::new(CircuitBreakerState {
                state: State::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure_time: None,
            })),
            total_calls: Arc::new(AtomicU64::new(0)),
            total_successes: Arc::new(AtomicU64::new(0)),
            total_failures: Arc::new(AtomicU64::new(0)),
            total_rejections: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn state(&self) -> State {
        self.state.read().await.state
    }

    /// Calls `operation` through the breaker.
    ///
    /// # Errors
    ///
    /// Returns [`CircuitBreakerError::Open`] if the circuit is open, or
    /// [`CircuitBreakerError::Inner`] if the operation itself fails.
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        self.total_calls.fetch_add(1, Ordering::Relaxed);

        if !self.can_attempt().await {
            self.total_rejections.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("circuit breaker is open, rejecting publish");
            return Err(CircuitBreakerError::Open);
        }

        match operation().await {
            Ok(result) => {
                self.on_success().await;
                self.total_successes.fetch_add(1, Ordering::Relaxed);
                Ok(result)
            },
            Err(err) => {
                self.on_failure().await;
                self.total_failures.fetch_add(1, Ordering::Relaxed);
                Err(CircuitBreakerError::Inner(err))
            },
        }
    }

    async fn can_attempt(&self) -> bool {
        let mut state = self.state.write().await;

        match state.state {
            State::Closed | State::HalfOpen => true,
            State::Open => {
                if let Some(last_failure) = state.last_failure_time {
                    if last_failure.elapsed() >= self.config.timeout {
                        tracing::info!("circuit breaker transitioning open -> half_open");
                        state.state = State::HalfOpen;
                        state.success_count = 0;
                        true
                    } else {
                        false
                    }
                } else {
                    false
                }
            },
        }
    }

    async fn on_success(&self) {
        let mut state = self.state.write().await;

        match state.state {
            State::Closed => {
                state.failure_count = 0;
            },
            State::HalfOpen => {
                state.success_count += 1;
                if state.success_count >= self.config.success_threshold {
                    tracing::info!(successes = state.success_count, "circuit breaker transitioning half_open -> closed");
                    state.state = State::Closed;
                    state.failure_count = 0;
                    state.success_count = 0;
                    state.last_failure_time = None;
                }
            },
            State::Open => {
                state.failure_count = 0;
            },
        }
    }

    async fn on_failure(&self) {
        let mut state = self.state.write().await;
        state.last_failure_time = Some(Instant::now());

        match state.state {
            State::Closed => {
                state.failure_count += 1;
                if state.failure_count >= self.config.failure_threshold {
                    tracing::warn!(
                        failures = state.failure_count,
                        threshold = self.config.failure_threshold,
                        "circuit breaker transitioning closed -> open"
                    );
                    state.state = State::Open;
                }
            },
            State::HalfOpen => {
                tracing::warn!("circuit breaker transitioning half_open -> open (recovery failed)");
                state.state = State::Open;
                state.failure_count = 1;
                state.success_count = 0;
            },
            State::Open => {
                state.failure_count += 1;
            },
        }
    }

    #[must_use]
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        CircuitBreakerMetrics {
            total_calls: self.total_calls.load(Ordering::Relaxed),
            total_successes: self.total_successes.load(Ordering::Relaxed),
            total_failures: self.total_failures.load(Ordering::Relaxed),
            total_rejections: self.total_rejections.load(Ordering::Relaxed),
        }
    }

    /// Resets the breaker to `Closed`. Useful for tests or manual recovery.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        state.state = State::Closed;
        state.failure_count = 0;
        state.success_count = 0;
        state.last_failure_time = None;
    }
}

/// Snapshot of call counters for monitoring.
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerMetrics {
    pub total_calls: u64,
    pub total_successes: u64,
    pub total_failures: u64,
    pub total_rejections: u64,
}

impl CircuitBreakerMetrics {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.total_calls == 0 {
            return 1.0;
        }
        self.total_successes as f64 / self.total_calls as f64
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rejection_rate(&self) -> f64 {
        if self.total_calls == 0 {
            return 0.0;
        }
        self.total_rejections as f64 / self.total_calls as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closed_on_success() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig::default());
        let result = breaker.call(|| async { Ok::<_, String>(42) }).await;
        assert!(result.is_ok());
        assert_eq!(breaker.state().await, State::Closed);
    }

    #[tokio::test]
    async fn opens_after_threshold() {
        let config = CircuitBreakerConfig::builder().failure_threshold(3).build();
        let breaker = CircuitBreaker::new(config);

        for _ in 0..3 {
            let _ = breaker.call(|| async { Err::<i32, _>("broker down") }).await;
        }

        assert_eq!(breaker.state().await, State::Open);
    }

    #[tokio::test]
    async fn rejects_when_open() {
        let config = CircuitBreakerConfig::builder().failure_threshold(2).build();
        let breaker = CircuitBreaker::new(config);

        for _ in 0..2 {
            let _ = breaker.call(|| async { Err::<i32, _>("broker down") }).await;
        }

        let result = breaker.call(|| async { Ok::<_, String>(42) }).await;
        assert!(matches!(result, Err(CircuitBreakerError::Open)));
    }

    #[tokio::test]
    async fn transitions_to_half_open_then_closed() {
        let config = CircuitBreakerConfig::builder()
            .failure_threshold(2)
            .timeout(Duration::from_millis(50))
            .success_threshold(1)
            .build();
        let breaker = CircuitBreaker::new(config);

        for _ in 0..2 {
            let _ = breaker.call(|| async { Err::<i32, _>("broker down") }).await;
        }
        assert_eq!(breaker.state().await, State::Open);

        tokio::time::sleep(Duration::from_millis(80)).await;

        let result = breaker.call(|| async { Ok::<_, String>(1) }).await;
        assert!(result.is_ok());
        assert_eq!(breaker.state().await, State::Closed);
    }

    #[tokio::test]
    async fn reopens_on_half_open_failure() {
        let config = CircuitBreakerConfig::builder()
            .failure_threshold(2)
            .timeout(Duration::from_millis(50))
            .build();
        let breaker = CircuitBreaker::new(config);

        for _ in 0..2 {
            let _ = breaker.call(|| async { Err::<i32, _>("broker down") }).await;
        }
        tokio::time::sleep(Duration::from_millis(80)).await;

        let _ = breaker.call(|| async { Err::<i32, _>("still down") }).await;
        assert_eq!(breaker.state().await, State::Open);
    }

    #[tokio::test]
    async fn metrics_track_calls() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig::default());

        for _ in 0..3 {
            let _ = breaker.call(|| async { Ok::<_, String>(1) }).await;
        }
        for _ in 0..2 {
            let _ = breaker.call(|| async { Err::<i32, _>("e") }).await;
        }

        let metrics = breaker.metrics();
        assert_eq!(metrics.total_calls, 5);
        assert_eq!(metrics.total_successes, 3);
        assert_eq!(metrics.total_failures, 2);
        assert!((metrics.success_rate() - 0.6).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn reset_closes_circuit() {
        let config = CircuitBreakerConfig::builder().failure_threshold(1).build();
        let breaker = CircuitBreaker::new(config);

        let _ = breaker.call(|| async { Err::<i32, _>("e") }).await;
        assert_eq!(breaker.state().await, State::Open);

        breaker.reset().await;
        assert_eq!(breaker.state().await, State::Closed);
    }
}
