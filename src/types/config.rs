//! Configuration structures.
//!
//! Configuration is loaded from a JSON config file; every section falls back
//! to its defaults when omitted.

use crate::recovery::ErrorClass;
use crate::types::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Global server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server identity and transport configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Circuit breaker and retry configuration.
    #[serde(default)]
    pub recovery: RecoveryConfig,

    /// Tool parameter defaults and caps.
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server name reported to callers.
    pub name: String,

    /// Server version reported to callers.
    pub version: String,

    /// Frame transport bind address (TCP).
    pub listen_addr: String,

    /// Maximum concurrent TCP connections. Connections beyond this limit are
    /// rejected.
    pub max_connections: usize,

    /// Maximum frame payload size in bytes.
    pub max_frame_bytes: u32,

    /// Idle read timeout per frame.
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,

    /// Write timeout per frame.
    #[serde(with = "humantime_serde")]
    pub write_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "repocontext".to_string(),
            version: "1.0.0".to_string(),
            listen_addr: "127.0.0.1:50061".to_string(),
            max_connections: 256,
            max_frame_bytes: 5 * 1024 * 1024,
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(10),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Recovery configuration: one retry policy shared by every operation and the
/// settings each lazily created circuit breaker starts with.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RecoveryConfig {
    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub breaker: BreakerConfig,
}

/// Retry policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,

    #[serde(with = "humantime_serde")]
    pub initial_backoff: Duration,

    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,

    pub backoff_multiplier: f64,

    /// Fraction of the backoff applied as uniform +/- jitter.
    pub jitter_factor: f64,

    /// Error classes worth retrying.
    pub retryable_codes: Vec<ErrorClass>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
            retryable_codes: vec![
                ErrorClass::Query,
                ErrorClass::Storage,
                ErrorClass::Network,
                ErrorClass::Timeout,
            ],
        }
    }
}

/// Circuit breaker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures that open the breaker.
    pub failure_threshold: u32,

    /// Time since the last failure after which an open breaker admits calls.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Reported interval between recovery attempts.
    #[serde(with = "humantime_serde")]
    pub retry_interval: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(30),
            retry_interval: Duration::from_secs(10),
        }
    }
}

/// Tool parameter defaults and caps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Token ceiling used when a caller omits `max_tokens`.
    pub default_max_tokens: i64,

    pub default_call_graph_depth: i64,

    pub max_call_graph_depth: i64,

    pub default_context_lines: i64,

    pub max_context_lines: i64,

    /// Cap on usage examples collected for a type.
    pub max_usage_examples: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            default_max_tokens: 2000,
            default_call_graph_depth: 2,
            max_call_graph_depth: 10,
            default_context_lines: 5,
            max_context_lines: 50,
            max_usage_examples: 10,
        }
    }
}
