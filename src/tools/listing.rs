//! `list_functions` and `list_types`.

use super::catalog::{ParamDef, ParamType, ToolDeclaration};
use super::params::ListEntitiesParams;
use super::pipeline::{ToolContext, ToolOperation};
use super::request::ToolRequest;
use crate::budget;
use crate::engine::{QueryOptions, SearchResult};
use crate::types::{LimitsConfig, Result};
use async_trait::async_trait;

/// Lists every entity of one kind with offset/limit pagination.
#[derive(Debug, Clone, Copy)]
pub struct ListEntities {
    tool: &'static str,
    entity_type: &'static str,
    plural: &'static str,
}

impl ListEntities {
    pub const fn functions() -> Self {
        Self {
            tool: "list_functions",
            entity_type: "function",
            plural: "functions",
        }
    }

    pub const fn types() -> Self {
        Self {
            tool: "list_types",
            entity_type: "type",
            plural: "types",
        }
    }
}

/// Apply offset then limit. A limit that cuts entries marks the result
/// truncated; an offset past the end empties it.
pub fn paginate(result: &mut SearchResult, limit: usize, offset: usize) {
    if offset > 0 {
        if offset >= result.entries.len() {
            result.entries.clear();
            return;
        }
        result.entries.drain(..offset);
    }
    if limit > 0 && limit < result.entries.len() {
        result.entries.truncate(limit);
        result.truncated = true;
    }
}

#[async_trait]
impl ToolOperation for ListEntities {
    type Params = ListEntitiesParams;
    type Output = SearchResult;

    fn name(&self) -> &'static str {
        self.tool
    }

    fn declaration(&self, limits: &LimitsConfig) -> ToolDeclaration {
        ToolDeclaration::new(
            self.tool,
            &format!(
                "List all {} in the repository with pagination and signature control",
                self.plural
            ),
        )
        .max_tokens_param(limits.default_max_tokens)
        .param(
            ParamDef::optional(
                "include_signatures",
                ParamType::Boolean,
                &format!(
                    "Include {} signatures in the response (default: true)",
                    self.entity_type
                ),
            )
            .with_default(serde_json::json!(true)),
        )
        .param(ParamDef::optional(
            "limit",
            ParamType::Integer,
            &format!("Maximum number of {} to return (0 for no limit)", self.plural),
        ))
        .param(ParamDef::optional(
            "offset",
            ParamType::Integer,
            &format!("Number of {} to skip (for pagination)", self.plural),
        ))
    }

    fn parse(&self, request: &ToolRequest, limits: &LimitsConfig) -> Result<ListEntitiesParams> {
        ListEntitiesParams::parse(request, limits)
    }

    async fn build(&self, ctx: &ToolContext<'_>, params: &ListEntitiesParams) -> Result<SearchResult> {
        let options = QueryOptions::default();
        let mut result = ctx
            .query(|engine| engine.search_by_type(self.entity_type, &options))
            .await?;

        paginate(&mut result, params.limit, params.offset);
        if !params.include_signatures {
            for entry in &mut result.entries {
                entry.index_entry.signature.clear();
            }
        }
        Ok(result)
    }

    fn optimize(&self, output: &mut SearchResult, max_tokens: usize) {
        budget::optimize(output, max_tokens);
    }
}
