//! Result records built by the context and dependency tools.

use crate::engine::{CallGraphEntry, EntityKind, SearchResultEntry};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionImplementation {
    pub body: String,
    /// Source lines immediately preceding the function.
    pub context_lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionReference {
    pub name: String,
    pub file: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeReference {
    pub name: String,
    pub file: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionContextResult {
    pub function_name: String,
    pub signature: String,
    pub location: SourceLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<FunctionImplementation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub callers: Vec<FunctionReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub callees: Vec<FunctionReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_types: Vec<TypeReference>,
    pub token_count: usize,
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldReference {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub file: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodReference {
    pub name: String,
    pub signature: String,
    pub file: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageExample {
    pub description: String,
    pub code: String,
    pub file: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeContextResult {
    pub type_name: String,
    pub signature: String,
    pub location: SourceLocation,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<MethodReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub usage_examples: Vec<UsageExample>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_types: Vec<TypeReference>,
    pub token_count: usize,
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyAnalysisResult {
    pub entity_name: String,
    pub entity_type: EntityKind,
    pub dependency_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub callers: Vec<CallGraphEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub callees: Vec<CallGraphEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_types: Vec<SearchResultEntry>,
    /// Totals before shaping.
    pub total_callers: usize,
    pub total_callees: usize,
    pub total_related_types: usize,
    pub token_count: usize,
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildIndexResult {
    pub path: String,
    pub success: bool,
    pub message: String,
    pub files_processed: usize,
    pub functions_indexed: usize,
    pub types_indexed: usize,
    pub variables_indexed: usize,
    pub constants_indexed: usize,
    pub calls_indexed: usize,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    pub verbose: bool,
}
