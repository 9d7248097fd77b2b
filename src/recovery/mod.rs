//! Failure isolation for query-engine calls.
//!
//! - **ErrorContext**: diagnostic record rendered into a single error string
//! - **ErrorClass**: substring classifier deciding which failures are retryable
//! - **CircuitBreaker**: per-operation Closed/Open/HalfOpen state machine
//! - **RecoveryManager**: breaker registry plus exponential-backoff retry loop
//!
//! Breaker state is process-local and owned by the manager value; nothing
//! here is global.

mod breaker;
mod classify;
mod error_context;
mod manager;

pub use breaker::{BreakerSnapshot, BreakerState, CircuitBreaker};
pub use classify::ErrorClass;
pub use error_context::ErrorContext;
pub use manager::{BreakerStats, RecoveryManager, RecoveryStats, RetryPolicy, RetryStats};
