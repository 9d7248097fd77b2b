//! Diagnostic record for one failed operation.

use super::ErrorClass;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Everything known about a failed operation, rendered into one error string.
///
/// Built with chainable `with_*` methods that consume and return the value:
///
/// ```
/// use repocontext::recovery::{ErrorClass, ErrorContext};
///
/// let ctx = ErrorContext::new("query_by_name", "query_by_name", "storage offline")
///     .with_error_code(ErrorClass::Storage)
///     .with_retry_info(2, 3)
///     .with_recovery_action("check the index storage");
/// assert!(ctx.to_string().starts_with("operation 'query_by_name' failed: storage offline"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub operation: String,
    pub tool_name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, Value>,
    pub original_error: String,
    pub error_code: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub retry_attempt: u32,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_action: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context_data: BTreeMap<String, String>,
}

impl ErrorContext {
    pub fn new(
        operation: impl Into<String>,
        tool_name: impl Into<String>,
        original_error: impl Into<String>,
    ) -> Self {
        Self {
            operation: operation.into(),
            tool_name: tool_name.into(),
            parameters: BTreeMap::new(),
            original_error: original_error.into(),
            error_code: String::new(),
            timestamp: Utc::now(),
            retry_attempt: 0,
            retry_count: 0,
            recovery_action: None,
            context_data: BTreeMap::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: impl IntoIterator<Item = (String, Value)>) -> Self {
        self.parameters.extend(parameters);
        self
    }

    pub fn with_error_code(mut self, code: ErrorClass) -> Self {
        self.error_code = code.as_str().to_string();
        self
    }

    pub fn with_retry_info(mut self, attempt: u32, count: u32) -> Self {
        self.retry_attempt = attempt;
        self.retry_count = count;
        self
    }

    pub fn with_recovery_action(mut self, action: impl Into<String>) -> Self {
        self.recovery_action = Some(action.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context_data.insert(key.into(), value.into());
        self
    }

    /// RFC 3339 timestamp in UTC with second precision.
    pub fn timestamp_rfc3339(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "operation '{}' failed: {} (error_code: {}, tool: {}, timestamp: {})",
            self.operation,
            self.original_error,
            self.error_code,
            self.tool_name,
            self.timestamp_rfc3339()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn fixed(ctx: ErrorContext) -> ErrorContext {
        ErrorContext {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap(),
            ..ctx
        }
    }

    #[test]
    fn test_render_is_deterministic() {
        let ctx = fixed(
            ErrorContext::new("get_call_graph", "get_call_graph", "query failed")
                .with_error_code(ErrorClass::Query),
        );
        assert_eq!(
            ctx.to_string(),
            "operation 'get_call_graph' failed: query failed (error_code: query_error, \
             tool: get_call_graph, timestamp: 2024-05-17T09:30:00Z)"
        );
    }

    #[test]
    fn test_builder_chain() {
        let ctx = ErrorContext::new("op", "tool", "boom")
            .with_parameters([("name".to_string(), serde_json::json!("Foo"))])
            .with_error_code(ErrorClass::RetriesExhausted)
            .with_retry_info(4, 3)
            .with_recovery_action("check configuration")
            .with_context("error_class", "storage_error");

        assert_eq!(ctx.parameters["name"], serde_json::json!("Foo"));
        assert_eq!(ctx.error_code, "max_retries_exhausted");
        assert_eq!((ctx.retry_attempt, ctx.retry_count), (4, 3));
        assert_eq!(ctx.recovery_action.as_deref(), Some("check configuration"));
        assert_eq!(ctx.context_data["error_class"], "storage_error");
    }

    #[test]
    fn test_empty_tool_name_renders_empty() {
        let ctx = ErrorContext::new("op", "", "circuit breaker open")
            .with_error_code(ErrorClass::CircuitOpen);
        let text = ctx.to_string();
        assert!(text.contains("(error_code: circuit_breaker_open, tool: , timestamp: "));
    }

    #[test]
    fn test_serializes_without_empty_maps() {
        let ctx = fixed(ErrorContext::new("op", "tool", "boom"));
        let json = serde_json::to_value(&ctx).unwrap();
        assert!(json.get("parameters").is_none());
        assert!(json.get("context_data").is_none());
        assert_eq!(json["timestamp"], "2024-05-17T09:30:00Z");
    }
}
