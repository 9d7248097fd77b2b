//! Three-state circuit breaker for one named operation.
//!
//! ```text
//!            failures >= threshold
//!   Closed ─────────────────────────▶ Open
//!     ▲                                 │ timeout elapsed since last failure
//!     │ success                         ▼
//!     └──────────────────────────── HalfOpen ──failure──▶ Open
//! ```
//!
//! All state lives behind one lock so concurrent callers on the same operation
//! observe linearized transitions. Two callers may both be admitted right at
//! the Open to HalfOpen boundary; the breaker does not serialize trial calls.

use crate::types::BreakerConfig;
use parking_lot::Mutex;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: BreakerState,
    failure_count: u32,
    last_failure: Option<Instant>,
}

/// Point-in-time view of a breaker, used for stats reporting.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: BreakerState,
    pub failure_count: u32,
    pub failure_threshold: u32,
}

/// Circuit breaker for a single operation name.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    timeout: Duration,
    retry_interval: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: &BreakerConfig) -> Self {
        Self {
            name: name.into(),
            failure_threshold: config.failure_threshold,
            timeout: config.timeout,
            retry_interval: config.retry_interval,
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                failure_count: 0,
                last_failure: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    /// Whether a call may proceed. An open breaker answers `true` once the
    /// timeout has elapsed, before any explicit transition to half-open.
    pub fn can_execute(&self) -> bool {
        let inner = self.inner.lock();
        match inner.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => self.timeout_elapsed(&inner),
        }
    }

    /// Move Open to HalfOpen if the timeout has elapsed. Returns whether the
    /// transition happened.
    pub fn transition_to_half_open(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state == BreakerState::Open && self.timeout_elapsed(&inner) {
            inner.state = BreakerState::HalfOpen;
            tracing::info!("breaker_half_open: operation={}", self.name);
            return true;
        }
        false
    }

    /// Record a success: any state becomes Closed with the count reset.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        if inner.state != BreakerState::Closed || inner.failure_count > 0 {
            tracing::info!(
                "breaker_closed: operation={}, previous_state={}, failures={}",
                self.name,
                inner.state.as_str(),
                inner.failure_count
            );
        }
        inner.state = BreakerState::Closed;
        inner.failure_count = 0;
    }

    /// Record a failure. Opens the breaker at the threshold; a failure while
    /// half-open reopens it.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.failure_count = inner.failure_count.saturating_add(1);
        inner.last_failure = Some(Instant::now());

        let should_open = inner.failure_count >= self.failure_threshold
            || inner.state == BreakerState::HalfOpen;
        if should_open && inner.state != BreakerState::Open {
            tracing::warn!(
                "breaker_opened: operation={}, failures={}, threshold={}",
                self.name,
                inner.failure_count,
                self.failure_threshold
            );
            inner.state = BreakerState::Open;
        }
    }

    pub fn state(&self) -> BreakerState {
        self.inner.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.inner.lock().failure_count
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.inner.lock();
        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            failure_threshold: self.failure_threshold,
        }
    }

    fn timeout_elapsed(&self, inner: &BreakerInner) -> bool {
        inner
            .last_failure
            .map_or(true, |at| at.elapsed() > self.timeout)
    }
}
