//! Tool server: owns the collaborators and the tool registry.
//!
//! ```text
//! call_tool(request)
//!   └─ registry[name] ──▶ DynTool::invoke(ToolContext) ──▶ pipeline::execute
//! ```
//!
//! Every registered tool runs through the same pipeline; the server only
//! supplies the [`ToolContext`] it builds per call.

use super::callgraph::{GetCallGraph, GetCallGraphEnhanced};
use super::catalog::{ToolCatalog, ToolDeclaration};
use super::context::{GetFunctionContext, GetTypeContext};
use super::dependencies::FindDependencies;
use super::listing::ListEntities;
use super::pipeline::{self, DynTool, ToolContext};
use super::query::{QueryByName, QueryByPattern};
use super::repository::{BuildIndex, RepositoryStatusTool};
use super::request::ToolRequest;
use super::response::ToolResponse;
use crate::engine::{FsRepositoryInspector, IndexBuilder, QueryEngine, RepositoryInspector};
use crate::recovery::{RecoveryManager, RecoveryStats};
use crate::types::{Config, Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Identity and defaults reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerConfiguration {
    pub name: String,
    pub version: String,
    pub max_tokens: i64,
    pub max_depth: i64,
}

pub struct RepoContextServer {
    engine: Option<Arc<dyn QueryEngine>>,
    builder: Option<Arc<dyn IndexBuilder>>,
    inspector: Arc<dyn RepositoryInspector>,
    repo_path: Option<PathBuf>,
    recovery: RecoveryManager,
    config: Config,
    registry: HashMap<&'static str, Arc<dyn DynTool>>,
    catalog: ToolCatalog,
}

impl std::fmt::Debug for RepoContextServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoContextServer")
            .field("engine", &self.engine.is_some())
            .field("builder", &self.builder.is_some())
            .field("repo_path", &self.repo_path)
            .field("tools", &self.catalog.len())
            .finish()
    }
}

impl RepoContextServer {
    /// Server with no engine attached and the filesystem repository inspector.
    pub fn new(config: Config) -> Self {
        Self {
            engine: None,
            builder: None,
            inspector: Arc::new(FsRepositoryInspector),
            repo_path: None,
            recovery: RecoveryManager::new(&config.recovery),
            config,
            registry: HashMap::new(),
            catalog: ToolCatalog::new(),
        }
    }

    pub fn with_engine(mut self, engine: Arc<dyn QueryEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn with_builder(mut self, builder: Arc<dyn IndexBuilder>) -> Self {
        self.builder = Some(builder);
        self
    }

    pub fn with_inspector(mut self, inspector: Arc<dyn RepositoryInspector>) -> Self {
        self.inspector = inspector;
        self
    }

    pub fn with_repo_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.repo_path = Some(path.into());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn repo_path(&self) -> Option<&Path> {
        self.repo_path.as_deref()
    }

    pub fn recovery(&self) -> &RecoveryManager {
        &self.recovery
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Register a single tool. A later registration under the same name
    /// replaces the earlier one.
    pub fn register_tool(&mut self, tool: Arc<dyn DynTool>) -> Result<ToolDeclaration> {
        let declaration = tool.describe(&self.config.limits);
        self.catalog.register(declaration.clone())?;
        self.registry.insert(tool.tool_name(), tool);
        Ok(declaration)
    }

    /// Register every built-in tool and return their declarations.
    pub fn register_all_tools(&mut self) -> Result<Vec<ToolDeclaration>> {
        let tools: Vec<Arc<dyn DynTool>> = vec![
            Arc::new(QueryByName),
            Arc::new(QueryByPattern),
            Arc::new(GetCallGraph),
            Arc::new(GetCallGraphEnhanced),
            Arc::new(ListEntities::functions()),
            Arc::new(ListEntities::types()),
            Arc::new(FindDependencies),
            Arc::new(GetFunctionContext),
            Arc::new(GetTypeContext),
            Arc::new(BuildIndex),
            Arc::new(RepositoryStatusTool),
        ];
        let declarations = tools
            .into_iter()
            .map(|tool| self.register_tool(tool))
            .collect::<Result<Vec<_>>>()?;
        tracing::info!("tools_registered: count={}", declarations.len());
        Ok(declarations)
    }

    /// Declarations of the registered tools, sorted by name.
    pub fn list_tools(&self) -> Vec<ToolDeclaration> {
        self.catalog.list().into_iter().cloned().collect()
    }

    /// Dispatch one tool call by name.
    pub async fn call_tool(
        &self,
        request: &ToolRequest,
        cancel: &CancellationToken,
    ) -> Result<ToolResponse> {
        let tool = self
            .registry
            .get(request.name.as_str())
            .ok_or_else(|| Error::not_found(format!("unknown tool: {}", request.name)))?;

        let ctx = ToolContext {
            tool: tool.tool_name(),
            engine: self.engine.as_deref(),
            builder: self.builder.as_deref(),
            inspector: self.inspector.as_ref(),
            repo_path: self.repo_path.as_deref(),
            recovery: &self.recovery,
            limits: &self.config.limits,
            cancel,
        };
        tool.invoke(&ctx, request).await
    }

    pub fn format_success<T: Serialize + ?Sized>(&self, data: &T) -> ToolResponse {
        pipeline::format_success(data)
    }

    pub fn format_error(&self, operation: &str, err: &Error) -> ToolResponse {
        pipeline::format_error(operation, err)
    }

    pub fn recovery_stats(&self) -> RecoveryStats {
        self.recovery.stats()
    }

    pub fn configuration(&self) -> ServerConfiguration {
        ServerConfiguration {
            name: self.config.server.name.clone(),
            version: self.config.server.version.clone(),
            max_tokens: self.config.limits.default_max_tokens,
            max_depth: self.config.limits.max_call_graph_depth,
        }
    }

    pub fn capabilities(&self) -> Value {
        serde_json::json!({
            "tools": { "listChanged": true },
            "experimental": {
                "callGraphAnalysis": true,
                "contextAnalysis": true,
                "repoManagement": true,
            },
        })
    }
}
