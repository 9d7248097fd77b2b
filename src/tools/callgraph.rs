//! `get_call_graph` and `get_call_graph_enhanced`.

use super::catalog::{ParamDef, ParamType, ToolDeclaration};
use super::params::CallGraphParams;
use super::pipeline::{ToolContext, ToolOperation};
use super::request::ToolRequest;
use crate::budget;
use crate::engine::{CallGraphEntry, CallGraphInfo};
use crate::types::{LimitsConfig, Result};
use async_trait::async_trait;

/// Marker the indexer puts on calls it could not resolve inside the repository.
pub const EXTERNAL_CALL_PREFIX: &str = "external:";

/// Standard-library and vendored package prefixes treated as external.
const EXTERNAL_PACKAGE_PREFIXES: [&str; 17] = [
    "fmt.",
    "os.",
    "io.",
    "log.",
    "http.",
    "json.",
    "strings.",
    "strconv.",
    "time.",
    "context.",
    "sync.",
    "errors.",
    "path.",
    "filepath.",
    "github.com/",
    "golang.org/",
    "gopkg.in/",
];

pub fn is_external_call(function: &str) -> bool {
    function.starts_with(EXTERNAL_CALL_PREFIX)
        || EXTERNAL_PACKAGE_PREFIXES
            .iter()
            .any(|prefix| function.starts_with(prefix))
}

/// Drop external callers and callees in place.
pub fn filter_external_calls(graph: &mut CallGraphInfo) {
    let internal = |entry: &CallGraphEntry| !is_external_call(&entry.function);
    graph.callers.retain(internal);
    graph.callees.retain(internal);
}

fn graph_declaration(name: &str, description: &str, depth_hint: &str) -> ToolDeclaration {
    ToolDeclaration::new(name, description)
        .param(ParamDef::required(
            "function_name",
            ParamType::String,
            "Function name to analyze",
        ))
        .param(ParamDef::optional("max_depth", ParamType::Integer, depth_hint))
        .param(ParamDef::optional(
            "include_callers",
            ParamType::Boolean,
            "Include functions that call this function",
        ))
        .param(ParamDef::optional(
            "include_callees",
            ParamType::Boolean,
            "Include functions called by this function",
        ))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GetCallGraph;

#[async_trait]
impl ToolOperation for GetCallGraph {
    type Params = CallGraphParams;
    type Output = CallGraphInfo;

    fn name(&self) -> &'static str {
        "get_call_graph"
    }

    fn declaration(&self, limits: &LimitsConfig) -> ToolDeclaration {
        graph_declaration(
            self.name(),
            "Get detailed call graph for a function with configurable depth and selective inclusion",
            &format!(
                "Maximum traversal depth (default: {})",
                limits.default_call_graph_depth
            ),
        )
        .max_tokens_param(limits.default_max_tokens)
    }

    fn parse(&self, request: &ToolRequest, limits: &LimitsConfig) -> Result<CallGraphParams> {
        CallGraphParams::parse(request, limits)
    }

    async fn build(&self, ctx: &ToolContext<'_>, params: &CallGraphParams) -> Result<CallGraphInfo> {
        let options = params.query_options();
        ctx.query(|engine| engine.call_graph(&params.function_name, &options))
            .await
    }

    fn optimize(&self, output: &mut CallGraphInfo, max_tokens: usize) {
        budget::optimize(output, max_tokens);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GetCallGraphEnhanced;

#[async_trait]
impl ToolOperation for GetCallGraphEnhanced {
    type Params = CallGraphParams;
    type Output = CallGraphInfo;

    fn name(&self) -> &'static str {
        "get_call_graph_enhanced"
    }

    fn declaration(&self, limits: &LimitsConfig) -> ToolDeclaration {
        graph_declaration(
            self.name(),
            "Get detailed call graph for a function with enhanced depth control, \
             external call filtering, and performance optimization",
            &format!(
                "Maximum traversal depth (default: {}, max: {})",
                limits.default_call_graph_depth, limits.max_call_graph_depth
            ),
        )
        .param(ParamDef::optional(
            "include_external",
            ParamType::Boolean,
            "Include external function calls (default: false)",
        ))
        .max_tokens_param(limits.default_max_tokens)
    }

    fn parse(&self, request: &ToolRequest, limits: &LimitsConfig) -> Result<CallGraphParams> {
        CallGraphParams::parse_enhanced(request, limits)
    }

    async fn build(&self, ctx: &ToolContext<'_>, params: &CallGraphParams) -> Result<CallGraphInfo> {
        let options = params.query_options();
        let mut graph = ctx
            .query(|engine| engine.call_graph(&params.function_name, &options))
            .await?;
        if !params.include_external {
            filter_external_calls(&mut graph);
        }
        Ok(graph)
    }

    fn optimize(&self, output: &mut CallGraphInfo, max_tokens: usize) {
        budget::optimize(output, max_tokens);
    }
}
