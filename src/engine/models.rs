//! Index records and query results exchanged with the query engine.
//!
//! Field names match the JSON the indexer writes, so snapshots produced by
//! other tooling deserialize unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;

// =============================================================================
// Entity kinds
// =============================================================================

/// Kind of an indexed entity. Type definitions are indexed under their
/// specific kind (struct, interface, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Function,
    Type,
    Struct,
    Interface,
    Alias,
    Enum,
    Variable,
    Constant,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Function => "function",
            EntityKind::Type => "type",
            EntityKind::Struct => "struct",
            EntityKind::Interface => "interface",
            EntityKind::Alias => "alias",
            EntityKind::Enum => "enum",
            EntityKind::Variable => "variable",
            EntityKind::Constant => "constant",
        }
    }

    /// Parse a kind name as stored in the index.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "function" => Some(EntityKind::Function),
            "type" => Some(EntityKind::Type),
            "struct" => Some(EntityKind::Struct),
            "interface" => Some(EntityKind::Interface),
            "alias" => Some(EntityKind::Alias),
            "enum" => Some(EntityKind::Enum),
            "variable" => Some(EntityKind::Variable),
            "constant" => Some(EntityKind::Constant),
            _ => None,
        }
    }

    pub fn is_type_like(&self) -> bool {
        matches!(
            self,
            EntityKind::Type
                | EntityKind::Struct
                | EntityKind::Interface
                | EntityKind::Alias
                | EntityKind::Enum
        )
    }

    /// Whether an entry of kind `self` answers a query for `query` ("type"
    /// covers every type-like kind).
    pub fn matches_query(&self, query: EntityKind) -> bool {
        if query == EntityKind::Type {
            self.is_type_like()
        } else {
            *self == query
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Source records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// A type reference in a function signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    pub name: String,
    #[serde(default)]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub signature: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub returns: Vec<TypeRef>,
    pub start_line: u32,
    pub end_line: u32,
    /// Names of functions this one calls.
    #[serde(default)]
    pub calls: Vec<String>,
    #[serde(default)]
    pub called_by: Vec<String>,
    /// Receiver type name for methods.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub signature: String,
    #[serde(default)]
    pub start_line: u32,
    #[serde(default)]
    pub end_line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    /// struct, interface, alias, enum or type.
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<Method>,
    pub start_line: u32,
    pub end_line: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedded: Vec<String>,
}

impl TypeDef {
    /// Index kind for this definition; unknown kinds index as plain types.
    pub fn entity_kind(&self) -> EntityKind {
        EntityKind::parse(&self.kind)
            .filter(EntityKind::is_type_like)
            .unwrap_or(EntityKind::Type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_name: String,
    pub start_line: u32,
    pub end_line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constant {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    pub start_line: u32,
    pub end_line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Export {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_name: String,
    pub kind: String,
}

/// Everything extracted from one source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileContext {
    pub path: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub checksum: String,
    #[serde(default)]
    pub mod_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub functions: Vec<Function>,
    #[serde(default)]
    pub types: Vec<TypeDef>,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub constants: Vec<Constant>,
    #[serde(default)]
    pub imports: Vec<Import>,
    #[serde(default)]
    pub exports: Vec<Export>,
}

/// Detailed semantic data for a group of files, shared between every index
/// entry that points into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticChunk {
    pub id: String,
    pub files: Vec<String>,
    pub file_data: Vec<FileContext>,
    /// Estimated token count for the whole chunk.
    pub token_count: usize,
    pub created_at: DateTime<Utc>,
}

impl SemanticChunk {
    pub fn function(&self, name: &str) -> Option<(&FileContext, &Function)> {
        self.file_data
            .iter()
            .find_map(|fc| fc.functions.iter().find(|f| f.name == name).map(|f| (fc, f)))
    }

    pub fn type_def(&self, name: &str) -> Option<(&FileContext, &TypeDef)> {
        self.file_data
            .iter()
            .find_map(|fc| fc.types.iter().find(|t| t.name == name).map(|t| (fc, t)))
    }
}

/// One searchable entity in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: EntityKind,
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
    pub chunk_id: String,
    #[serde(default)]
    pub signature: String,
}

// =============================================================================
// Query options and results
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    pub include_callers: bool,
    pub include_callees: bool,
    pub include_types: bool,
    /// Traversal depth for call graphs; values <= 0 mean 1.
    pub max_depth: i64,
    /// Engine-side entry budget; 0 means unlimited.
    pub max_tokens: usize,
    pub format: OutputFormat,
}

impl QueryOptions {
    pub fn call_graph(max_depth: i64, include_callers: bool, include_callees: bool) -> Self {
        Self {
            include_callers,
            include_callees,
            max_depth,
            ..Self::default()
        }
    }

    pub fn wants_call_graph(&self) -> bool {
        self.include_callers || self.include_callees
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultEntry {
    pub index_entry: IndexEntry,
    pub chunk_data: Option<Arc<SemanticChunk>>,
}

impl SearchResultEntry {
    pub fn chunk_tokens(&self) -> usize {
        self.chunk_data.as_ref().map_or(0, |c| c.token_count)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallGraphEntry {
    pub function: String,
    pub file: String,
    pub line: u32,
    pub chunk_data: Option<Arc<SemanticChunk>>,
}

impl CallGraphEntry {
    pub fn chunk_tokens(&self) -> usize {
        self.chunk_data.as_ref().map_or(0, |c| c.token_count)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallGraphInfo {
    pub function: String,
    pub callers: Vec<CallGraphEntry>,
    pub callees: Vec<CallGraphEntry>,
    pub depth: i64,
    #[serde(default)]
    pub token_count: usize,
    #[serde(default)]
    pub truncated: bool,
}

impl CallGraphInfo {
    pub fn empty(function: impl Into<String>, depth: i64) -> Self {
        Self {
            function: function.into(),
            callers: Vec::new(),
            callees: Vec::new(),
            depth,
            token_count: 0,
            truncated: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub query: String,
    /// name, pattern, type or file.
    pub search_type: String,
    pub entries: Vec<SearchResultEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_graph: Option<CallGraphInfo>,
    pub token_count: usize,
    pub truncated: bool,
    pub executed_at: DateTime<Utc>,
    /// Options the query ran with; used by the text layout only.
    #[serde(skip)]
    pub options: QueryOptions,
}

impl SearchResult {
    pub fn new(query: impl Into<String>, search_type: &str, options: &QueryOptions) -> Self {
        Self {
            query: query.into(),
            search_type: search_type.to_string(),
            entries: Vec::new(),
            call_graph: None,
            token_count: 0,
            truncated: false,
            executed_at: Utc::now(),
            options: options.clone(),
        }
    }

    /// Render as pretty JSON or the human-readable text layout.
    pub fn render(&self, format: OutputFormat) -> crate::types::Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Text => Ok(self.render_text()),
        }
    }

    fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Query: {} (type: {})", self.query, self.search_type);
        let _ = writeln!(out, "Results: {} entries", self.entries.len());
        let _ = writeln!(out, "Token count: {}", self.token_count);
        if self.truncated {
            out.push_str("Results truncated due to token limit\n");
        }
        out.push('\n');

        for (i, entry) in self.entries.iter().enumerate() {
            let e = &entry.index_entry;
            let _ = writeln!(out, "{}. {} ({})", i + 1, e.name, e.entity_type);
            let _ = writeln!(out, "   File: {}:{}-{}", e.file, e.start_line, e.end_line);
            if !e.signature.is_empty() {
                let _ = writeln!(out, "   Signature: {}", e.signature);
            }
            out.push('\n');
        }

        if let Some(graph) = &self.call_graph {
            out.push_str("Call Graph:\n");
            if self.options.include_callers {
                write_edges(&mut out, "Callers", &graph.callers);
            }
            if self.options.include_callees {
                write_edges(&mut out, "Callees", &graph.callees);
            }
        }
        out
    }
}

fn write_edges(out: &mut String, title: &str, edges: &[CallGraphEntry]) {
    let _ = writeln!(out, "  {}:", title);
    if edges.is_empty() {
        out.push_str("    (none)\n");
    }
    for edge in edges {
        let _ = writeln!(out, "    - {} ({}:{})", edge.function, edge.file, edge.line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, kind: EntityKind) -> SearchResultEntry {
        SearchResultEntry {
            index_entry: IndexEntry {
                name: name.to_string(),
                entity_type: kind,
                file: "main.go".to_string(),
                start_line: 3,
                end_line: 9,
                chunk_id: "c1".to_string(),
                signature: format!("func {}()", name),
            },
            chunk_data: None,
        }
    }

    #[test]
    fn test_type_query_covers_type_like_kinds() {
        assert!(EntityKind::Struct.matches_query(EntityKind::Type));
        assert!(EntityKind::Interface.matches_query(EntityKind::Type));
        assert!(!EntityKind::Function.matches_query(EntityKind::Type));
        assert!(EntityKind::Function.matches_query(EntityKind::Function));
        assert!(!EntityKind::Struct.matches_query(EntityKind::Function));
    }

    #[test]
    fn test_index_entry_serializes_kind_as_type() {
        let json = serde_json::to_value(entry("main", EntityKind::Function).index_entry).unwrap();
        assert_eq!(json["type"], "function");
        assert_eq!(json["start_line"], 3);
    }

    #[test]
    fn test_typedef_unknown_kind_defaults_to_type() {
        let def = TypeDef {
            name: "X".into(),
            kind: "class".into(),
            fields: vec![],
            methods: vec![],
            start_line: 1,
            end_line: 2,
            embedded: vec![],
        };
        assert_eq!(def.entity_kind(), EntityKind::Type);
    }

    #[test]
    fn test_render_text_layout() {
        let options = QueryOptions {
            include_callers: true,
            ..QueryOptions::default()
        };
        let mut result = SearchResult::new("main", "name", &options);
        result.entries.push(entry("main", EntityKind::Function));
        result.token_count = 14;
        result.call_graph = Some(CallGraphInfo::empty("main", 1));

        let text = result.render(OutputFormat::Text).unwrap();
        assert!(text.starts_with("Query: main (type: name)\nResults: 1 entries\nToken count: 14\n\n"));
        assert!(text.contains("1. main (function)\n   File: main.go:3-9\n   Signature: func main()\n"));
        assert!(text.contains("Call Graph:\n  Callers:\n    (none)\n"));
        assert!(!text.contains("Callees"));
    }

    #[test]
    fn test_render_json_skips_options() {
        let result = SearchResult::new("x", "pattern", &QueryOptions::default());
        let json: serde_json::Value =
            serde_json::from_str(&result.render(OutputFormat::Json).unwrap()).unwrap();
        assert!(json.get("options").is_none());
        assert!(json.get("call_graph").is_none());
        assert_eq!(json["search_type"], "pattern");
    }
}
