//! `query_by_name` and `query_by_pattern`.

use super::catalog::{ParamDef, ParamType, ToolDeclaration};
use super::params::{QueryByNameParams, QueryByPatternParams, ToolParams};
use super::pipeline::{ToolContext, ToolOperation};
use super::request::ToolRequest;
use crate::budget;
use crate::engine::SearchResult;
use crate::types::{LimitsConfig, Result};
use async_trait::async_trait;

fn inclusion_params(decl: ToolDeclaration, subject: &str) -> ToolDeclaration {
    decl.param(ParamDef::optional(
        "include_callers",
        ParamType::Boolean,
        &format!("Include functions that call {}", subject),
    ))
    .param(ParamDef::optional(
        "include_callees",
        ParamType::Boolean,
        &format!("Include functions called by {}", subject),
    ))
    .param(ParamDef::optional(
        "include_types",
        ParamType::Boolean,
        "Include related type definitions",
    ))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QueryByName;

#[async_trait]
impl ToolOperation for QueryByName {
    type Params = QueryByNameParams;
    type Output = SearchResult;

    fn name(&self) -> &'static str {
        "query_by_name"
    }

    fn declaration(&self, limits: &LimitsConfig) -> ToolDeclaration {
        let decl = ToolDeclaration::new(
            self.name(),
            "Search for functions, types, or variables by exact name with advanced options",
        )
        .param(ParamDef::required("name", ParamType::String, "Name to search for"));
        inclusion_params(decl, "this function").max_tokens_param(limits.default_max_tokens)
    }

    fn parse(&self, request: &ToolRequest, limits: &LimitsConfig) -> Result<QueryByNameParams> {
        QueryByNameParams::parse(request, limits)
    }

    async fn build(&self, ctx: &ToolContext<'_>, params: &QueryByNameParams) -> Result<SearchResult> {
        let options = params.inclusion().query_options();
        ctx.query(|engine| engine.search_by_name(&params.name, &options))
            .await
    }

    fn optimize(&self, output: &mut SearchResult, max_tokens: usize) {
        budget::optimize(output, max_tokens);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QueryByPattern;

#[async_trait]
impl ToolOperation for QueryByPattern {
    type Params = QueryByPatternParams;
    type Output = SearchResult;

    fn name(&self) -> &'static str {
        "query_by_pattern"
    }

    fn declaration(&self, limits: &LimitsConfig) -> ToolDeclaration {
        let decl = ToolDeclaration::new(
            self.name(),
            "Search for entities using glob or regex patterns with advanced filtering \
             (supports wildcards *, ?, character classes [abc], brace expansion {a,b}, and regex /pattern/)",
        )
        .param(ParamDef::required(
            "pattern",
            ParamType::String,
            "Search pattern (supports glob and regex patterns)",
        ))
        .param(ParamDef::optional(
            "entity_type",
            ParamType::Enum(
                ["function", "type", "variable", "constant"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            ),
            "Filter by entity type: function, type, variable, constant",
        ));
        inclusion_params(decl, "matched functions").max_tokens_param(limits.default_max_tokens)
    }

    fn parse(&self, request: &ToolRequest, limits: &LimitsConfig) -> Result<QueryByPatternParams> {
        QueryByPatternParams::parse(request, limits)
    }

    async fn build(
        &self,
        ctx: &ToolContext<'_>,
        params: &QueryByPatternParams,
    ) -> Result<SearchResult> {
        let options = params.inclusion().query_options();
        let mut result = ctx
            .query(|engine| engine.search_by_pattern(&params.pattern, &options))
            .await?;
        if let Some(kind) = params.entity_type {
            result
                .entries
                .retain(|e| e.index_entry.entity_type.matches_query(kind));
        }
        Ok(result)
    }

    fn optimize(&self, output: &mut SearchResult, max_tokens: usize) {
        budget::optimize(output, max_tokens);
    }
}
