//! Core types for the repository context server.
//!
//! This module provides foundational types used throughout the system:
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for transport, recovery, and tool limits

mod config;
mod errors;

pub use config::{
    BreakerConfig, Config, LimitsConfig, ObservabilityConfig, RecoveryConfig, RetryConfig,
    ServerConfig,
};
pub use errors::{Error, Result};
