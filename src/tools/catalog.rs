//! Tool declarations: typed parameter metadata, input schemas and prompt lines.
//!
//! Declarations describe tools, they don't run them; handlers live in the
//! server's registry and are matched up by name.

use crate::types::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

// =============================================================================
// Parameter types
// =============================================================================

/// Parameter type for tool inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Enum(Vec<String>),
}

impl ParamType {
    fn label(&self) -> String {
        match self {
            ParamType::Enum(variants) => variants.join("|"),
            ParamType::String => "string".into(),
            ParamType::Integer => "integer".into(),
            ParamType::Number => "number".into(),
            ParamType::Boolean => "boolean".into(),
        }
    }

    fn json_schema(&self) -> Value {
        match self {
            ParamType::String => json!({"type": "string"}),
            ParamType::Integer => json!({"type": "integer"}),
            ParamType::Number => json!({"type": "number"}),
            ParamType::Boolean => json!({"type": "boolean"}),
            ParamType::Enum(variants) => json!({"type": "string", "enum": variants}),
        }
    }
}

// =============================================================================
// Parameter definition
// =============================================================================

/// A single parameter definition for a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamDef {
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            description: description.to_string(),
            required: true,
            default: None,
        }
    }

    pub fn optional(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

// =============================================================================
// Tool declaration
// =============================================================================

/// Complete tool metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamDef>,
}

impl ToolDeclaration {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters: Vec::new(),
        }
    }

    pub fn param(mut self, def: ParamDef) -> Self {
        self.parameters.push(def);
        self
    }

    /// Shared optional `max_tokens` parameter.
    pub fn max_tokens_param(self, default: i64) -> Self {
        self.param(
            ParamDef::optional(
                "max_tokens",
                ParamType::Integer,
                &format!("Maximum tokens for response (default: {})", default),
            )
            .with_default(json!(default)),
        )
    }

    /// One-line summary, e.g. `list_types(limit?: integer): List all types`.
    pub fn prompt_line(&self) -> String {
        let args = self
            .parameters
            .iter()
            .map(|p| format!("{}{}: {}", p.name, if p.required { "" } else { "?" }, p.param_type.label()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}({}): {}", self.name, args, self.description)
    }

    /// JSON object schema describing the tool's arguments.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for p in &self.parameters {
            let mut schema = p.param_type.json_schema();
            if let Some(obj) = schema.as_object_mut() {
                obj.insert("description".into(), Value::String(p.description.clone()));
                if let Some(default) = &p.default {
                    obj.insert("default".into(), default.clone());
                }
            }
            properties.insert(p.name.clone(), schema);
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

// =============================================================================
// Tool catalog
// =============================================================================

/// Declarations keyed by tool name.
#[derive(Debug, Default)]
pub struct ToolCatalog {
    entries: HashMap<String, ToolDeclaration>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a declaration, replacing any previous one of the same name.
    pub fn register(&mut self, declaration: ToolDeclaration) -> Result<()> {
        if declaration.name.is_empty() {
            return Err(Error::validation("tool name cannot be empty"));
        }
        self.entries.insert(declaration.name.clone(), declaration);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ToolDeclaration> {
        self.entries.get(name)
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// All declarations sorted by name.
    pub fn list(&self) -> Vec<&ToolDeclaration> {
        let mut entries: Vec<&ToolDeclaration> = self.entries.values().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// Prompt lines for every tool, in name order.
    pub fn prompt(&self) -> String {
        self.list()
            .into_iter()
            .map(ToolDeclaration::prompt_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
