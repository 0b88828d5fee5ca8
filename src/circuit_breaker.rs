//! # Circuit Breaker Module
//!
//! This module implements the circuit breaker pattern for remote scaling calls.
//! The scaling service is slow and rate-limit sensitive, so repeated failures
//! stop further calls for a while instead of hammering it on every serving change.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use crate::scaling_config::RecoveryConfig;

#[derive(Debug, Default)]
struct BreakerState {
    failure_count: u32,
    last_failure_time: Option<Instant>,
}

/// Circuit breaker for remote scaling calls
///
/// # State Machine
///
/// - **Closed**: Normal operation, calls pass through
/// - **Open**: Failure threshold exceeded, calls fail fast
///
/// Once the reset period has elapsed the breaker returns straight to closed with
/// its failure count cleared, so it takes another full threshold of failures to
/// open it again.
///
/// # Configuration
///
/// Uses `RecoveryConfig` for:
/// - `circuit_breaker_threshold`: Consecutive failures before opening (default: 5)
/// - `circuit_breaker_reset_secs`: Time before attempting reset (default: 60s)
///
/// Uses the tokio clock so paused-time tests can drive the reset period.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    config: RecoveryConfig,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serving_scaler::scaling_config::RecoveryConfig;
    /// use serving_scaler::circuit_breaker::CircuitBreaker;
    ///
    /// let breaker = CircuitBreaker::new(RecoveryConfig::default());
    /// assert!(!breaker.is_open());
    /// ```
    pub fn new(config: RecoveryConfig) -> Self {
        Self {
            state: Mutex::new(BreakerState::default()),
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Check if the circuit is open (blocking calls)
    ///
    /// Returns `true` when the failure count reached the threshold and the reset
    /// period has not elapsed yet. Once it has elapsed the breaker closes again.
    pub fn is_open(&self) -> bool {
        let mut state = self.lock();

        if state.failure_count >= self.config.circuit_breaker_threshold {
            if let Some(last_time) = state.last_failure_time {
                let reset = Duration::from_secs(self.config.circuit_breaker_reset_secs);
                if last_time.elapsed() < reset {
                    return true;
                }
                log::info!(
                    "Scaling circuit breaker reset after {} failures",
                    state.failure_count
                );
                *state = BreakerState::default();
            }
        }
        false
    }

    /// Record a failed remote call
    ///
    /// Cancelled calls are not failures and must not be recorded here.
    pub fn record_failure(&self) {
        let mut state = self.lock();
        state.failure_count += 1;
        state.last_failure_time = Some(Instant::now());
        if state.failure_count == self.config.circuit_breaker_threshold {
            log::warn!(
                "Scaling circuit breaker opened after {} consecutive failures",
                state.failure_count
            );
        }
    }

    /// Record a successful remote call, closing the circuit
    pub fn record_success(&self) {
        *self.lock() = BreakerState::default();
    }

    /// Number of consecutive failures recorded so far
    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }
}
