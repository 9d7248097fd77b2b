//! Substring-based error classification.
//!
//! The classifier inspects the rendered error text. It is a heuristic: any
//! message that merely mentions "query" or "storage" is classified as such,
//! whatever actually went wrong.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification codes for failed operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorClass {
    #[serde(rename = "query_error")]
    Query,
    #[serde(rename = "storage_error")]
    Storage,
    #[serde(rename = "network_error")]
    Network,
    #[serde(rename = "timeout_error")]
    Timeout,
    #[serde(rename = "validation_error")]
    Validation,
    #[serde(rename = "unknown_empty_error")]
    UnknownEmpty,
    #[serde(rename = "unknown_error")]
    Unknown,
    #[serde(rename = "circuit_breaker_open")]
    CircuitOpen,
    #[serde(rename = "max_retries_exhausted")]
    RetriesExhausted,
}

impl ErrorClass {
    /// Classify an error message. Checks run in a fixed order, so a message
    /// mentioning both "query" and "timeout" is a query error.
    pub fn from_message(message: &str) -> Self {
        if message.is_empty() {
            return ErrorClass::UnknownEmpty;
        }
        if message.contains("query") {
            ErrorClass::Query
        } else if message.contains("storage") || message.contains("database") {
            ErrorClass::Storage
        } else if message.contains("network") || message.contains("connection") {
            ErrorClass::Network
        } else if message.contains("timeout") {
            ErrorClass::Timeout
        } else if message.contains("validation") {
            ErrorClass::Validation
        } else {
            ErrorClass::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Query => "query_error",
            ErrorClass::Storage => "storage_error",
            ErrorClass::Network => "network_error",
            ErrorClass::Timeout => "timeout_error",
            ErrorClass::Validation => "validation_error",
            ErrorClass::UnknownEmpty => "unknown_empty_error",
            ErrorClass::Unknown => "unknown_error",
            ErrorClass::CircuitOpen => "circuit_breaker_open",
            ErrorClass::RetriesExhausted => "max_retries_exhausted",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_table() {
        let cases = [
            ("", ErrorClass::UnknownEmpty),
            ("query execution failed", ErrorClass::Query),
            ("storage unavailable", ErrorClass::Storage),
            ("database is locked", ErrorClass::Storage),
            ("network unreachable", ErrorClass::Network),
            ("connection reset by peer", ErrorClass::Network),
            ("timeout after 5s", ErrorClass::Timeout),
            ("validation error: name parameter is required", ErrorClass::Validation),
            ("something odd", ErrorClass::Unknown),
        ];
        for (message, expected) in cases {
            assert_eq!(ErrorClass::from_message(message), expected, "message: {message:?}");
        }
    }

    #[test]
    fn test_first_matching_rule_wins() {
        assert_eq!(
            ErrorClass::from_message("query timeout while reading storage"),
            ErrorClass::Query
        );
        assert_eq!(
            ErrorClass::from_message("database connection lost"),
            ErrorClass::Storage
        );
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        assert_eq!(ErrorClass::from_message("Query failed"), ErrorClass::Unknown);
        assert_eq!(ErrorClass::from_message("Connection reset by peer"), ErrorClass::Unknown);
        assert_eq!(ErrorClass::from_message("Database locked"), ErrorClass::Unknown);
        assert_eq!(ErrorClass::from_message("Network Down"), ErrorClass::Unknown);
    }

    #[test]
    fn test_heuristic_misclassifies_incidental_mentions() {
        // A message that merely names a "query" helper still classifies as
        // a query error.
        assert_eq!(
            ErrorClass::from_message("function 'run_query' has no body"),
            ErrorClass::Query
        );
    }

    #[test]
    fn test_codes_render_as_snake_case() {
        assert_eq!(ErrorClass::CircuitOpen.to_string(), "circuit_breaker_open");
        assert_eq!(
            serde_json::to_value(ErrorClass::RetriesExhausted).unwrap(),
            serde_json::json!("max_retries_exhausted")
        );
    }
}
