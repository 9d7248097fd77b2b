//! `find_dependencies`.

use super::catalog::{ParamDef, ParamType, ToolDeclaration};
use super::params::FindDependenciesParams;
use super::pipeline::{ToolContext, ToolOperation};
use super::request::ToolRequest;
use super::results::DependencyAnalysisResult;
use crate::budget;
use crate::engine::{EntityKind, QueryOptions};
use crate::types::{Error, LimitsConfig, Result};
use async_trait::async_trait;

/// Traversal depth used for dependency call graphs.
const DEPENDENCY_DEPTH: i64 = 2;

#[derive(Debug, Clone, Copy, Default)]
pub struct FindDependencies;

#[async_trait]
impl ToolOperation for FindDependencies {
    type Params = FindDependenciesParams;
    type Output = DependencyAnalysisResult;

    fn name(&self) -> &'static str {
        "find_dependencies"
    }

    fn declaration(&self, limits: &LimitsConfig) -> ToolDeclaration {
        ToolDeclaration::new(
            self.name(),
            "Find dependencies and relationships for a given entity (function, type, or variable)",
        )
        .param(ParamDef::required(
            "entity_name",
            ParamType::String,
            "Name of the entity to analyze",
        ))
        .param(
            ParamDef::optional(
                "dependency_type",
                ParamType::Enum(vec!["callers".into(), "callees".into(), "both".into()]),
                "Type of dependencies: callers, callees, both",
            )
            .with_default(serde_json::json!("both")),
        )
        .max_tokens_param(limits.default_max_tokens)
    }

    fn parse(&self, request: &ToolRequest, limits: &LimitsConfig) -> Result<FindDependenciesParams> {
        FindDependenciesParams::parse(request, limits)
    }

    async fn build(
        &self,
        ctx: &ToolContext<'_>,
        params: &FindDependenciesParams,
    ) -> Result<DependencyAnalysisResult> {
        let name = params.entity_name.as_str();
        let found = ctx
            .query(|engine| engine.search_by_name(name, &QueryOptions::default()))
            .await?;
        let Some(first) = found.entries.first() else {
            return Err(Error::not_found(format!(
                "entity '{}' not found in repository",
                name
            )));
        };
        let entity_type = first.index_entry.entity_type;

        let mut result = DependencyAnalysisResult {
            entity_name: name.to_string(),
            entity_type,
            dependency_type: params.dependency_type.to_string(),
            callers: Vec::new(),
            callees: Vec::new(),
            related_types: Vec::new(),
            total_callers: 0,
            total_callees: 0,
            total_related_types: 0,
            token_count: 0,
            truncated: false,
        };

        if entity_type == EntityKind::Function {
            let options = QueryOptions::call_graph(
                DEPENDENCY_DEPTH,
                params.dependency_type.wants_callers(),
                params.dependency_type.wants_callees(),
            );
            let graph = ctx.query(|engine| engine.call_graph(name, &options)).await?;
            result.callers = graph.callers;
            result.callees = graph.callees;
        }

        let with_types = QueryOptions {
            include_types: true,
            ..QueryOptions::default()
        };
        let related = ctx
            .query(|engine| engine.search_by_name(name, &with_types))
            .await?;
        result.related_types = related
            .entries
            .into_iter()
            .filter(|e| e.index_entry.entity_type.is_type_like())
            .collect();

        result.total_callers = result.callers.len();
        result.total_callees = result.callees.len();
        result.total_related_types = result.related_types.len();
        Ok(result)
    }

    fn optimize(&self, output: &mut DependencyAnalysisResult, max_tokens: usize) {
        budget::optimize(output, max_tokens);
    }
}
