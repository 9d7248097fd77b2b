//! Generic tool pipeline.
//!
//! Every tool runs the same template:
//!
//! ```text
//! engine attached? ──no──▶ Err(System)            (not an envelope)
//!        │
//! repository valid? ──no──▶ "Repository validation failed: .."
//!        │
//! parse params ──err──▶ "Parameter validation failed: .."
//!        │
//! build (engine calls under the tool's breaker) ──err──▶ "Operation '<tool>' failed: .."
//!        │
//! optimize to the params' token ceiling
//!        │
//! success envelope (pretty JSON)
//! ```
//!
//! Tools only supply parse / build / optimize through [`ToolOperation`].

use super::catalog::ToolDeclaration;
use super::params::ToolParams;
use super::request::ToolRequest;
use super::response::ToolResponse;
use crate::engine::{IndexBuilder, QueryEngine, RepositoryInspector};
use crate::recovery::RecoveryManager;
use crate::types::{Error, LimitsConfig, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

const ENGINE_MISSING: &str = "query engine not initialized - system configuration error";

/// Which checks run before a tool parses its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preconditions {
    pub engine: bool,
    pub repository: bool,
}

impl Preconditions {
    pub const QUERY: Self = Self {
        engine: true,
        repository: true,
    };
    pub const NONE: Self = Self {
        engine: false,
        repository: false,
    };
}

/// Everything a tool may touch while building its result.
#[derive(Clone, Copy)]
pub struct ToolContext<'a> {
    pub tool: &'a str,
    pub engine: Option<&'a dyn QueryEngine>,
    pub builder: Option<&'a dyn IndexBuilder>,
    pub inspector: &'a dyn RepositoryInspector,
    pub repo_path: Option<&'a Path>,
    pub recovery: &'a RecoveryManager,
    pub limits: &'a LimitsConfig,
    pub cancel: &'a CancellationToken,
}

impl std::fmt::Debug for ToolContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("tool", &self.tool)
            .field("engine", &self.engine.is_some())
            .field("builder", &self.builder.is_some())
            .field("repo_path", &self.repo_path)
            .finish()
    }
}

impl<'a> ToolContext<'a> {
    pub fn engine(&self) -> Result<&'a dyn QueryEngine> {
        self.engine.ok_or_else(|| Error::system(ENGINE_MISSING))
    }

    /// One engine call, run under the tool's circuit breaker and retry policy.
    pub async fn query<T, F>(&self, mut call: F) -> Result<T>
    where
        T: Send,
        F: FnMut(&dyn QueryEngine) -> Result<T> + Send,
    {
        let engine = self.engine()?;
        self.recovery
            .execute_with_recovery(self.tool, self.cancel, || std::future::ready(call(engine)))
            .await
    }
}

/// One tool: declaration, parameter parser, result builder and optimizer.
#[async_trait]
pub trait ToolOperation: Send + Sync {
    type Params: ToolParams;
    type Output: Serialize + Send;

    fn name(&self) -> &'static str;

    fn declaration(&self, limits: &LimitsConfig) -> ToolDeclaration;

    fn preconditions(&self) -> Preconditions {
        Preconditions::QUERY
    }

    fn parse(&self, request: &ToolRequest, limits: &LimitsConfig) -> Result<Self::Params>;

    async fn build(&self, ctx: &ToolContext<'_>, params: &Self::Params) -> Result<Self::Output>;

    /// Shape `output` to `max_tokens`. Unshaped by default.
    fn optimize(&self, _output: &mut Self::Output, _max_tokens: usize) {}
}

/// Run `op` through the pipeline.
pub async fn execute<T: ToolOperation>(
    op: &T,
    ctx: &ToolContext<'_>,
    request: &ToolRequest,
) -> Result<ToolResponse> {
    let started = Instant::now();
    let tool = op.name();
    let checks = op.preconditions();
    tracing::debug!("tool_started: tool={}", tool);

    if checks.engine && ctx.engine.is_none() {
        return Err(Error::system(ENGINE_MISSING));
    }

    if checks.repository {
        if let Err(e) = ctx.inspector.validate(ctx.repo_path) {
            tracing::info!("tool_rejected: tool={}, stage=repository, reason={}", tool, e.detail());
            return Ok(ToolResponse::error(format!(
                "Repository validation failed: {}",
                e.detail()
            )));
        }
    }

    let params = match op.parse(request, ctx.limits) {
        Ok(params) => params,
        Err(e) => {
            tracing::info!("tool_rejected: tool={}, stage=parameters, reason={}", tool, e.detail());
            return Ok(ToolResponse::error(format!(
                "Parameter validation failed: {}",
                e.detail()
            )));
        }
    };

    let mut output = match op.build(ctx, &params).await {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!("tool_failed: tool={}, error={}", tool, e);
            return Ok(format_error(tool, &e));
        }
    };

    if let Some(max_tokens) = params.token_ceiling() {
        op.optimize(&mut output, max_tokens);
    }

    let response = format_success(&output);
    tracing::debug!(
        "tool_finished: tool={}, is_error={}, elapsed_ms={}",
        tool,
        response.is_error,
        started.elapsed().as_millis()
    );
    Ok(response)
}

/// Pretty JSON success envelope.
pub fn format_success<T: Serialize + ?Sized>(data: &T) -> ToolResponse {
    match serde_json::to_string_pretty(data) {
        Ok(text) => ToolResponse::text(text),
        Err(e) => ToolResponse::error(format!("Failed to format response: {}", e)),
    }
}

/// Error envelope naming the failed operation.
pub fn format_error(operation: &str, err: &Error) -> ToolResponse {
    ToolResponse::error(format!("Operation '{}' failed: {}", operation, err.detail()))
}

/// Object-safe face of [`ToolOperation`], used by the server registry.
#[async_trait]
pub trait DynTool: Send + Sync {
    fn tool_name(&self) -> &'static str;

    fn describe(&self, limits: &LimitsConfig) -> ToolDeclaration;

    async fn invoke(&self, ctx: &ToolContext<'_>, request: &ToolRequest) -> Result<ToolResponse>;
}

#[async_trait]
impl<T: ToolOperation> DynTool for T {
    fn tool_name(&self) -> &'static str {
        self.name()
    }

    fn describe(&self, limits: &LimitsConfig) -> ToolDeclaration {
        self.declaration(limits)
    }

    async fn invoke(&self, ctx: &ToolContext<'_>, request: &ToolRequest) -> Result<ToolResponse> {
        execute(self, ctx, request).await
    }
}
