//! Tool-call request with lenient argument readers.
//!
//! Callers are LLM agents, so arguments arrive loosely typed: numbers as
//! strings, integers as floats. Readers coerce what they can and fall back to
//! the default otherwise.

use crate::types::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Map::new(),
        }
    }

    /// Builder-style argument insertion.
    pub fn arg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.to_string(), value.into());
        self
    }

    pub fn get_string(&self, key: &str, default: &str) -> String {
        match self.arguments.get(key) {
            Some(Value::String(s)) => s.clone(),
            _ => default.to_string(),
        }
    }

    /// Trimmed, non-empty string argument.
    pub fn require_string(&self, key: &str) -> Result<String> {
        let value = self.get_string(key, "");
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(Error::validation(format!("{} parameter is required", key)));
        }
        Ok(trimmed.to_string())
    }

    /// Trimmed string argument, `None` when absent or blank.
    pub fn optional_string(&self, key: &str) -> Option<String> {
        let value = self.get_string(key, "");
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.arguments.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => true,
                "false" => false,
                _ => default,
            },
            _ => default,
        }
    }

    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.arguments.get(key) {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                .unwrap_or(default),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }
}
