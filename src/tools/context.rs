//! `get_function_context` and `get_type_context`.

use super::catalog::{ParamDef, ParamType, ToolDeclaration};
use super::params::{FunctionContextParams, ToolParams, TypeContextParams};
use super::pipeline::{ToolContext, ToolOperation};
use super::request::ToolRequest;
use super::results::{
    FieldReference, FunctionContextResult, FunctionImplementation, FunctionReference,
    MethodReference, SourceLocation, TypeContextResult, TypeReference, UsageExample,
};
use crate::budget;
use crate::engine::{
    CallGraphEntry, EntityKind, FileContext, QueryOptions, SearchResultEntry, SemanticChunk,
};
use crate::types::{Error, LimitsConfig, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Entity kinds whose chunks are scanned for usage examples.
const USAGE_SCAN_KINDS: [&str; 4] = ["function", "type", "variable", "constant"];

fn location(entry: &SearchResultEntry) -> SourceLocation {
    SourceLocation {
        file: entry.index_entry.file.clone(),
        start_line: entry.index_entry.start_line,
        end_line: entry.index_entry.end_line,
    }
}

fn function_refs(entries: &[CallGraphEntry]) -> Vec<FunctionReference> {
    entries
        .iter()
        .map(|e| FunctionReference {
            name: e.function.clone(),
            file: e.file.clone(),
            line: e.line,
        })
        .collect()
}

fn type_refs<'a>(entries: impl Iterator<Item = &'a SearchResultEntry>) -> Vec<TypeReference> {
    entries
        .filter(|e| e.index_entry.entity_type.is_type_like())
        .map(|e| TypeReference {
            name: e.index_entry.name.clone(),
            file: e.index_entry.file.clone(),
            line: e.index_entry.start_line,
        })
        .collect()
}

// =============================================================================
// Function context
// =============================================================================

/// Source lines of `file`, resolved against the repository root.
async fn read_source(repo: Option<&Path>, file: &str) -> Option<Vec<String>> {
    let path = match repo {
        Some(root) => root.join(file),
        None => Path::new(file).to_path_buf(),
    };
    match tokio::fs::read_to_string(&path).await {
        Ok(text) => Some(text.lines().map(str::to_string).collect()),
        Err(e) => {
            tracing::debug!("source_unreadable: path={}, error={}", path.display(), e);
            None
        }
    }
}

/// Signatures of every function in the chunk, one per line.
fn chunk_signatures(chunk: Option<&Arc<SemanticChunk>>) -> String {
    chunk
        .map(|c| {
            c.file_data
                .iter()
                .flat_map(|fc| fc.functions.iter().map(|f| f.signature.as_str()))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

/// Body and preceding context lines for the function at `entry`. Falls back
/// to the chunk's signatures when the source lines are unavailable.
pub fn build_implementation(
    entry: &SearchResultEntry,
    source: Option<&[String]>,
    context_lines: usize,
) -> FunctionImplementation {
    let start = entry.index_entry.start_line as usize;
    let end = entry.index_entry.end_line as usize;

    match source {
        Some(lines) if start >= 1 && start <= lines.len() => {
            let end = end.clamp(start, lines.len());
            let context_from = (start - 1).saturating_sub(context_lines);
            FunctionImplementation {
                body: lines[start - 1..end].join("\n"),
                context_lines: lines[context_from..start - 1].to_vec(),
            }
        }
        _ => FunctionImplementation {
            body: chunk_signatures(entry.chunk_data.as_ref()),
            context_lines: Vec::new(),
        },
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GetFunctionContext;

#[async_trait]
impl ToolOperation for GetFunctionContext {
    type Params = FunctionContextParams;
    type Output = FunctionContextResult;

    fn name(&self) -> &'static str {
        "get_function_context"
    }

    fn declaration(&self, limits: &LimitsConfig) -> ToolDeclaration {
        ToolDeclaration::new(
            self.name(),
            "Get comprehensive context for a function including signature, implementation, callers, callees, and related types",
        )
        .param(ParamDef::required(
            "function_name",
            ParamType::String,
            "Name of the function to analyze",
        ))
        .param(ParamDef::optional(
            "include_implementations",
            ParamType::Boolean,
            "Include the function body and surrounding source lines",
        ))
        .param(
            ParamDef::optional(
                "context_lines",
                ParamType::Integer,
                &format!(
                    "Number of source lines before the function to include (max: {})",
                    limits.max_context_lines
                ),
            )
            .with_default(serde_json::json!(limits.default_context_lines)),
        )
        .max_tokens_param(limits.default_max_tokens)
    }

    fn parse(&self, request: &ToolRequest, limits: &LimitsConfig) -> Result<FunctionContextParams> {
        FunctionContextParams::parse(request, limits)
    }

    async fn build(
        &self,
        ctx: &ToolContext<'_>,
        params: &FunctionContextParams,
    ) -> Result<FunctionContextResult> {
        let name = params.function_name.as_str();
        let options = params.inclusion().query_options();
        let found = ctx
            .query(|engine| engine.search_by_name(name, &options))
            .await?;

        let entry = found
            .entries
            .iter()
            .find(|e| e.index_entry.entity_type == EntityKind::Function && e.index_entry.name == name)
            .ok_or_else(|| Error::not_found(format!("function '{}' not found", name)))?;

        let implementation = if params.include_implementations {
            let source = read_source(ctx.repo_path, &entry.index_entry.file).await;
            Some(build_implementation(
                entry,
                source.as_deref(),
                params.context_lines,
            ))
        } else {
            None
        };

        let (callers, callees) = found
            .call_graph
            .as_ref()
            .map(|g| (function_refs(&g.callers), function_refs(&g.callees)))
            .unwrap_or_default();

        Ok(FunctionContextResult {
            function_name: name.to_string(),
            signature: entry.index_entry.signature.clone(),
            location: location(entry),
            implementation,
            callers,
            callees,
            related_types: type_refs(found.entries.iter()),
            token_count: 0,
            truncated: false,
        })
    }

    fn optimize(&self, output: &mut FunctionContextResult, max_tokens: usize) {
        budget::optimize(output, max_tokens);
    }
}

// =============================================================================
// Type context
// =============================================================================

/// Fields of the named type as recorded in its chunk.
fn field_refs(entry: &SearchResultEntry) -> Vec<FieldReference> {
    let Some(chunk) = entry.chunk_data.as_ref() else {
        return Vec::new();
    };
    let Some((file, def)) = chunk.type_def(&entry.index_entry.name) else {
        return Vec::new();
    };
    def.fields
        .iter()
        .enumerate()
        .map(|(idx, field)| FieldReference {
            name: field.name.clone(),
            type_name: field.type_name.clone(),
            file: file.path.clone(),
            line: def.start_line + idx as u32 + 1,
        })
        .collect()
}

fn method_refs(entries: &[SearchResultEntry], type_name: &str) -> Vec<MethodReference> {
    entries
        .iter()
        .filter(|e| {
            e.index_entry.entity_type == EntityKind::Function
                && e.index_entry.signature.contains(type_name)
        })
        .map(|e| MethodReference {
            name: e.index_entry.name.clone(),
            signature: e.index_entry.signature.clone(),
            file: e.index_entry.file.clone(),
            line: e.index_entry.start_line,
        })
        .collect()
}

fn mentions(code: &str, type_name_lower: &str) -> bool {
    !code.is_empty() && code.to_lowercase().contains(type_name_lower)
}

fn example(description: &str, code: String, file: &FileContext, line: u32) -> UsageExample {
    UsageExample {
        description: description.to_string(),
        code,
        file: file.path.clone(),
        line,
    }
}

/// Every place in `file` that mentions `type_name`, skipping its own definition.
fn file_usages(file: &FileContext, type_name: &str) -> Vec<UsageExample> {
    let needle = type_name.to_lowercase();
    let mut out = Vec::new();

    for f in &file.functions {
        if mentions(&f.signature, &needle) {
            out.push(example("Function signature usage", f.signature.clone(), file, f.start_line));
        }
        for p in f.parameters.iter().filter(|p| mentions(&p.type_name, &needle)) {
            out.push(example(
                "Function parameter",
                format!("func {}({} {}) {{ ... }}", f.name, p.name, p.type_name),
                file,
                f.start_line,
            ));
        }
        for r in f.returns.iter().filter(|r| mentions(&r.name, &needle)) {
            out.push(example(
                "Function return type",
                format!("func {}() {} {{ ... }}", f.name, r.name),
                file,
                f.start_line,
            ));
        }
    }

    for t in file.types.iter().filter(|t| t.name != type_name) {
        for field in t.fields.iter().filter(|fd| mentions(&fd.type_name, &needle)) {
            out.push(example(
                "Type field usage",
                format!("type {} struct {{\n    {} {}\n}}", t.name, field.name, field.type_name),
                file,
                t.start_line,
            ));
        }
        for embedded in t.embedded.iter().filter(|e| mentions(e, &needle)) {
            out.push(example(
                "Type embedding",
                format!("type {} struct {{\n    {}\n}}", t.name, embedded),
                file,
                t.start_line,
            ));
        }
    }

    for v in file.variables.iter().filter(|v| mentions(&v.type_name, &needle)) {
        out.push(example(
            "Variable declaration",
            format!("var {} {}", v.name, v.type_name),
            file,
            v.start_line,
        ));
    }

    for c in file.constants.iter().filter(|c| mentions(&c.type_name, &needle)) {
        let value = if c.value.is_empty() {
            String::new()
        } else {
            format!(" = {}", c.value)
        };
        out.push(example(
            "Constant declaration",
            format!("const {} {}{}", c.name, c.type_name, value),
            file,
            c.start_line,
        ));
    }

    out
}

/// Usage examples across `chunks`, deduplicated by normalized code and capped.
pub fn collect_usage_examples<'a>(
    chunks: impl IntoIterator<Item = &'a SemanticChunk>,
    type_name: &str,
    cap: usize,
) -> Vec<UsageExample> {
    let mut seen = HashSet::new();
    let mut examples = Vec::new();
    for chunk in chunks {
        for file in &chunk.file_data {
            for found in file_usages(file, type_name) {
                let key = found.code.trim().to_lowercase();
                if key.is_empty() || !seen.insert(key) {
                    continue;
                }
                examples.push(found);
                if examples.len() >= cap {
                    return examples;
                }
            }
        }
    }
    examples
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GetTypeContext;

impl GetTypeContext {
    /// Distinct chunks behind every indexed entity, in index order.
    async fn indexed_chunks(&self, ctx: &ToolContext<'_>) -> Result<Vec<Arc<SemanticChunk>>> {
        let mut seen = HashSet::new();
        let mut chunks = Vec::new();
        let options = QueryOptions::default();
        for kind in USAGE_SCAN_KINDS {
            let listed = ctx
                .query(|engine| engine.search_by_type(kind, &options))
                .await?;
            for chunk in listed.entries.into_iter().filter_map(|e| e.chunk_data) {
                if seen.insert(chunk.id.clone()) {
                    chunks.push(chunk);
                }
            }
        }
        Ok(chunks)
    }
}

#[async_trait]
impl ToolOperation for GetTypeContext {
    type Params = TypeContextParams;
    type Output = TypeContextResult;

    fn name(&self) -> &'static str {
        "get_type_context"
    }

    fn declaration(&self, limits: &LimitsConfig) -> ToolDeclaration {
        ToolDeclaration::new(
            self.name(),
            "Get comprehensive context for a type including fields, methods, and usage examples",
        )
        .param(ParamDef::required(
            "type_name",
            ParamType::String,
            "Name of the type to analyze",
        ))
        .param(ParamDef::optional(
            "include_methods",
            ParamType::Boolean,
            "Include methods defined on the type",
        ))
        .param(ParamDef::optional(
            "include_usage",
            ParamType::Boolean,
            "Include usage examples found in the repository",
        ))
        .max_tokens_param(limits.default_max_tokens)
    }

    fn parse(&self, request: &ToolRequest, limits: &LimitsConfig) -> Result<TypeContextParams> {
        TypeContextParams::parse(request, limits)
    }

    async fn build(
        &self,
        ctx: &ToolContext<'_>,
        params: &TypeContextParams,
    ) -> Result<TypeContextResult> {
        let name = params.type_name.as_str();
        let options = params.inclusion().query_options();
        let found = ctx
            .query(|engine| engine.search_by_name(name, &options))
            .await?;

        let entry = found
            .entries
            .iter()
            .find(|e| e.index_entry.entity_type.is_type_like() && e.index_entry.name == name)
            .ok_or_else(|| Error::not_found(format!("type '{}' not found", name)))?;

        let methods = if params.include_methods {
            method_refs(&found.entries, name)
        } else {
            Vec::new()
        };

        let usage_examples = if params.include_usage {
            let chunks = self.indexed_chunks(ctx).await?;
            collect_usage_examples(
                chunks.iter().map(|c| c.as_ref()),
                name,
                ctx.limits.max_usage_examples,
            )
        } else {
            Vec::new()
        };

        Ok(TypeContextResult {
            type_name: name.to_string(),
            signature: entry.index_entry.signature.clone(),
            location: location(entry),
            fields: field_refs(entry),
            methods,
            usage_examples,
            related_types: type_refs(found.entries.iter().filter(|e| e.index_entry.name != name)),
            token_count: 0,
            truncated: false,
        })
    }

    fn optimize(&self, output: &mut TypeContextResult, max_tokens: usize) {
        budget::optimize(output, max_tokens);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Constant, Field, Function, IndexEntry, Parameter, TypeDef, TypeRef, Variable};
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn chunk(files: Vec<FileContext>) -> SemanticChunk {
        SemanticChunk {
            id: "chunk-1".into(),
            files: files.iter().map(|f| f.path.clone()).collect(),
            file_data: files,
            token_count: 40,
            created_at: Utc::now(),
        }
    }

    fn config_file() -> FileContext {
        FileContext {
            path: "config.go".into(),
            functions: vec![
                Function {
                    name: "Load".into(),
                    signature: "func Load(path string) (*Config, error)".into(),
                    parameters: vec![Parameter {
                        name: "path".into(),
                        type_name: "string".into(),
                    }],
                    returns: vec![TypeRef {
                        name: "*Config".into(),
                        kind: "pointer".into(),
                    }],
                    start_line: 20,
                    end_line: 30,
                    ..Function::default()
                },
                Function {
                    name: "Apply".into(),
                    signature: "func Apply(cfg Config)".into(),
                    parameters: vec![Parameter {
                        name: "cfg".into(),
                        type_name: "Config".into(),
                    }],
                    start_line: 32,
                    end_line: 34,
                    ..Function::default()
                },
            ],
            types: vec![
                TypeDef {
                    name: "Config".into(),
                    kind: "struct".into(),
                    fields: vec![
                        Field {
                            name: "Name".into(),
                            type_name: "string".into(),
                            tag: String::new(),
                        },
                        Field {
                            name: "Port".into(),
                            type_name: "int".into(),
                            tag: String::new(),
                        },
                    ],
                    methods: vec![],
                    start_line: 5,
                    end_line: 8,
                    embedded: vec![],
                },
                TypeDef {
                    name: "Server".into(),
                    kind: "struct".into(),
                    fields: vec![Field {
                        name: "cfg".into(),
                        type_name: "*Config".into(),
                        tag: String::new(),
                    }],
                    methods: vec![],
                    start_line: 10,
                    end_line: 12,
                    embedded: vec!["Config".into()],
                },
            ],
            variables: vec![Variable {
                name: "defaults".into(),
                type_name: "Config".into(),
                start_line: 14,
                end_line: 14,
            }],
            constants: vec![Constant {
                name: "zero".into(),
                type_name: "config".into(),
                value: String::new(),
                start_line: 16,
                end_line: 16,
            }],
            ..FileContext::default()
        }
    }

    fn entry_for(name: &str, kind: EntityKind, start: u32, end: u32, chunk: Option<SemanticChunk>) -> SearchResultEntry {
        SearchResultEntry {
            index_entry: IndexEntry {
                name: name.into(),
                entity_type: kind,
                file: "config.go".into(),
                start_line: start,
                end_line: end,
                chunk_id: "chunk-1".into(),
                signature: String::new(),
            },
            chunk_data: chunk.map(Arc::new),
        }
    }

    #[test]
    fn test_usage_examples_cover_every_occurrence_kind() {
        let c = chunk(vec![config_file()]);
        let examples = collect_usage_examples([&c], "Config", 10);
        let described: Vec<(&str, &str)> = examples
            .iter()
            .map(|e| (e.description.as_str(), e.code.as_str()))
            .collect();
        assert_eq!(
            described,
            vec![
                ("Function signature usage", "func Load(path string) (*Config, error)"),
                ("Function return type", "func Load() *Config { ... }"),
                ("Function signature usage", "func Apply(cfg Config)"),
                ("Function parameter", "func Apply(cfg Config) { ... }"),
                ("Type field usage", "type Server struct {\n    cfg *Config\n}"),
                ("Type embedding", "type Server struct {\n    Config\n}"),
                ("Variable declaration", "var defaults Config"),
                ("Constant declaration", "const zero config"),
            ]
        );
    }

    #[test]
    fn test_usage_examples_dedupe_and_cap() {
        let c = chunk(vec![config_file(), config_file()]);
        assert_eq!(collect_usage_examples([&c], "Config", 10).len(), 8);
        assert_eq!(collect_usage_examples([&c], "Config", 3).len(), 3);
    }

    #[test]
    fn test_field_refs_use_definition_lines() {
        let e = entry_for("Config", EntityKind::Struct, 5, 8, Some(chunk(vec![config_file()])));
        let fields = field_refs(&e);
        assert_eq!(fields.len(), 2);
        assert_eq!((fields[0].name.as_str(), fields[0].line), ("Name", 6));
        assert_eq!((fields[1].type_name.as_str(), fields[1].line), ("int", 7));
        assert!(field_refs(&entry_for("Config", EntityKind::Struct, 5, 8, None)).is_empty());
    }

    #[test]
    fn test_implementation_from_source() {
        let lines: Vec<String> = (1..=10).map(|i| format!("line {}", i)).collect();
        let e = entry_for("Load", EntityKind::Function, 5, 7, None);
        let imp = build_implementation(&e, Some(&lines), 2);
        assert_eq!(imp.body, "line 5\nline 6\nline 7");
        assert_eq!(imp.context_lines, vec!["line 3", "line 4"]);

        let first = entry_for("Load", EntityKind::Function, 1, 2, None);
        assert!(build_implementation(&first, Some(&lines), 5).context_lines.is_empty());
    }

    #[test]
    fn test_implementation_falls_back_to_chunk_signatures() {
        let e = entry_for("Load", EntityKind::Function, 20, 30, Some(chunk(vec![config_file()])));
        let imp = build_implementation(&e, None, 5);
        assert_eq!(
            imp.body,
            "func Load(path string) (*Config, error)\nfunc Apply(cfg Config)"
        );
        assert!(imp.context_lines.is_empty());
    }
}
