//! Recovery manager: a registry of per-operation circuit breakers plus one
//! shared retry policy.

use super::{BreakerSnapshot, BreakerState, CircuitBreaker, ErrorClass, ErrorContext};
use crate::types::{BreakerConfig, Error, RecoveryConfig, Result, RetryConfig};
use parking_lot::RwLock;
use rand::Rng;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const CIRCUIT_OPEN_MESSAGE: &str = "circuit breaker open";
const CIRCUIT_OPEN_ACTION: &str = "wait for circuit breaker timeout";
const EXHAUSTED_ACTION: &str = "consider checking system resources or configuration";

// =============================================================================
// Retry policy
// =============================================================================

/// Process-wide retry policy. Immutable after construction.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
    pub jitter_factor: f64,
    retryable: HashSet<ErrorClass>,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
            multiplier: config.backoff_multiplier,
            jitter_factor: config.jitter_factor,
            retryable: config.retryable_codes.iter().copied().collect(),
        }
    }

    pub fn is_retryable(&self, class: ErrorClass) -> bool {
        self.retryable.contains(&class)
    }

    /// Undisturbed exponential backoff for `attempt` (0-based), capped at the max.
    pub fn base_backoff(&self, attempt: u32) -> Duration {
        let initial = self.initial_backoff.as_secs_f64();
        let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
        let raw = initial * self.multiplier.powi(exp);
        Duration::from_secs_f64(raw.min(self.max_backoff.as_secs_f64()).max(0.0))
    }

    /// Backoff with uniform +/- jitter applied, never below the initial backoff.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base = self.base_backoff(attempt).as_secs_f64();
        let spread: f64 = rand::thread_rng().gen_range(-1.0..=1.0);
        let jittered = base + base * self.jitter_factor * spread;
        Duration::from_secs_f64(jittered.max(self.initial_backoff.as_secs_f64()))
    }

    fn retryable_codes(&self) -> Vec<&'static str> {
        let mut codes: Vec<&'static str> = self.retryable.iter().map(ErrorClass::as_str).collect();
        codes.sort_unstable();
        codes
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

// =============================================================================
// Stats
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct BreakerStats {
    pub state: BreakerState,
    pub failure_count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetryStats {
    pub max_retries: u32,
    #[serde(with = "humantime_serde")]
    pub initial_backoff: Duration,
    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
    pub retryable_errors: Vec<&'static str>,
}

/// Snapshot of every breaker plus the retry policy.
#[derive(Debug, Clone, Serialize)]
pub struct RecoveryStats {
    pub total_circuit_breakers: usize,
    pub circuit_breakers: BTreeMap<String, BreakerStats>,
    pub retry_config: RetryStats,
}

// =============================================================================
// Manager
// =============================================================================

/// Wraps operations with a circuit breaker (one per operation name, created on
/// first use) and retries with exponential backoff.
#[derive(Debug)]
pub struct RecoveryManager {
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
    breaker_config: BreakerConfig,
    policy: RetryPolicy,
}

impl Default for RecoveryManager {
    fn default() -> Self {
        Self::new(&RecoveryConfig::default())
    }
}

impl RecoveryManager {
    pub fn new(config: &RecoveryConfig) -> Self {
        Self {
            breakers: RwLock::new(HashMap::new()),
            breaker_config: config.breaker.clone(),
            policy: RetryPolicy::from_config(&config.retry),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Get or lazily create the breaker for `operation`.
    pub fn breaker(&self, operation: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.read().get(operation) {
            return existing.clone();
        }
        let mut breakers = self.breakers.write();
        breakers
            .entry(operation.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(operation, &self.breaker_config)))
            .clone()
    }

    /// Run `call` under the breaker for `operation`, retrying retryable
    /// failures. Cancellation of `cancel` aborts a pending backoff wait with
    /// `Error::Cancelled`; an in-flight call is not interrupted.
    pub async fn execute_with_recovery<T, F, Fut>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        mut call: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let breaker = self.breaker(operation);

        if !breaker.can_execute() {
            tracing::warn!("circuit_open_fail_fast: operation={}", operation);
            return Err(ErrorContext::new(operation, "", CIRCUIT_OPEN_MESSAGE)
                .with_error_code(ErrorClass::CircuitOpen)
                .with_recovery_action(CIRCUIT_OPEN_ACTION)
                .into());
        }

        if breaker.state() == BreakerState::Open {
            breaker.transition_to_half_open();
        }

        let mut last_error: Option<Error> = None;
        let mut attempts = 0u32;

        for attempt in 0..=self.policy.max_retries {
            attempts = attempt + 1;
            let err = match call().await {
                Ok(value) => {
                    breaker.record_success();
                    return Ok(value);
                }
                Err(err) => err,
            };

            breaker.record_failure();
            let class = ErrorClass::from_message(&err.to_string());
            last_error = Some(err);

            if attempt == self.policy.max_retries || !self.policy.is_retryable(class) {
                break;
            }

            let wait = self.policy.backoff(attempt);
            tracing::warn!(
                "retry_scheduled: operation={}, attempt={}, error_code={}, backoff_ms={}",
                operation,
                attempt + 1,
                class,
                wait.as_millis()
            );

            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(Error::cancelled(format!(
                        "operation '{}' cancelled during retry backoff",
                        operation
                    )));
                }
                _ = tokio::time::sleep(wait) => {}
            }
        }

        let last = last_error
            .map(|e| e.to_string())
            .unwrap_or_default();
        let class = ErrorClass::from_message(&last);
        tracing::error!(
            "retries_exhausted: operation={}, attempts={}, last_error_code={}",
            operation,
            attempts,
            class
        );

        Err(ErrorContext::new(operation, "", last)
            .with_error_code(ErrorClass::RetriesExhausted)
            .with_retry_info(attempts, self.policy.max_retries)
            .with_recovery_action(EXHAUSTED_ACTION)
            .with_context("error_class", class.as_str())
            .into())
    }

    /// Snapshots of every breaker, sorted by name.
    pub fn breaker_snapshots(&self) -> Vec<BreakerSnapshot> {
        let mut snapshots: Vec<BreakerSnapshot> =
            self.breakers.read().values().map(|cb| cb.snapshot()).collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }

    pub fn stats(&self) -> RecoveryStats {
        let circuit_breakers: BTreeMap<String, BreakerStats> = self
            .breaker_snapshots()
            .into_iter()
            .map(|snap| {
                (
                    snap.name,
                    BreakerStats {
                        state: snap.state,
                        failure_count: snap.failure_count,
                    },
                )
            })
            .collect();

        RecoveryStats {
            total_circuit_breakers: circuit_breakers.len(),
            circuit_breakers,
            retry_config: RetryStats {
                max_retries: self.policy.max_retries,
                initial_backoff: self.policy.initial_backoff,
                max_backoff: self.policy.max_backoff,
                backoff_multiplier: self.policy.multiplier,
                jitter_factor: self.policy.jitter_factor,
                retryable_errors: self.policy.retryable_codes(),
            },
        }
    }
}
