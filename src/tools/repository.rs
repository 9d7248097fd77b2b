//! `build_index` and `get_repository_status`.
//!
//! Neither tool needs an attached query engine or an initialized repository,
//! and neither runs under the recovery manager.

use super::catalog::{ParamDef, ParamType, ToolDeclaration};
use super::params::RepositoryParams;
use super::pipeline::{Preconditions, ToolContext, ToolOperation};
use super::request::ToolRequest;
use super::results::BuildIndexResult;
use crate::engine::{QueryEngine, QueryOptions, RepositoryStatistics, RepositoryStatus};
use crate::types::{Error, LimitsConfig, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Requested path, else the configured repository, else the working
/// directory. Relative paths are made absolute.
pub fn resolve_repository_path(requested: Option<&str>, configured: Option<&Path>) -> Result<PathBuf> {
    let path = match (requested, configured) {
        (Some(p), _) => PathBuf::from(p),
        (None, Some(p)) => p.to_path_buf(),
        (None, None) => std::env::current_dir()?,
    };
    if path.is_absolute() {
        return Ok(path);
    }
    Ok(std::env::current_dir()?.join(path))
}

fn path_param(decl: ToolDeclaration, what: &str) -> ToolDeclaration {
    decl.param(ParamDef::optional(
        "path",
        ParamType::String,
        &format!(
            "Path to the repository to {} (defaults to the configured repository)",
            what
        ),
    ))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildIndex;

#[async_trait]
impl ToolOperation for BuildIndex {
    type Params = RepositoryParams;
    type Output = BuildIndexResult;

    fn name(&self) -> &'static str {
        "build_index"
    }

    fn declaration(&self, _limits: &LimitsConfig) -> ToolDeclaration {
        path_param(
            ToolDeclaration::new(self.name(), "Build or rebuild the semantic index for a repository"),
            "index",
        )
        .param(ParamDef::optional(
            "verbose",
            ParamType::Boolean,
            "Report detailed build statistics",
        ))
    }

    fn preconditions(&self) -> Preconditions {
        Preconditions::NONE
    }

    fn parse(&self, request: &ToolRequest, limits: &LimitsConfig) -> Result<RepositoryParams> {
        RepositoryParams::parse(request, limits)
    }

    async fn build(&self, ctx: &ToolContext<'_>, params: &RepositoryParams) -> Result<BuildIndexResult> {
        let builder = ctx
            .builder
            .ok_or_else(|| Error::precondition("index builder not configured"))?;
        let path = resolve_repository_path(params.path.as_deref(), ctx.repo_path)?;
        let stats = builder.build(&path)?;

        Ok(BuildIndexResult {
            path: path.display().to_string(),
            success: true,
            message: "Index built successfully".to_string(),
            files_processed: stats.files_processed,
            functions_indexed: stats.functions_indexed,
            types_indexed: stats.types_indexed,
            variables_indexed: stats.variables_indexed,
            constants_indexed: stats.constants_indexed,
            calls_indexed: stats.calls_indexed,
            duration: stats.duration,
            verbose: params.verbose,
        })
    }
}

/// Entity counts as currently held by the engine.
fn engine_statistics(engine: &dyn QueryEngine, stats: &mut RepositoryStatistics) -> Result<()> {
    let options = QueryOptions::default();
    let mut files = HashSet::new();
    let mut count = |kind: &str| -> Result<usize> {
        let listed = engine.search_by_type(kind, &options)?;
        files.extend(listed.entries.iter().map(|e| e.index_entry.file.clone()));
        Ok(listed.entries.len())
    };
    stats.functions_indexed = count("function")?;
    stats.types_indexed = count("type")?;
    stats.variables_indexed = count("variable")?;
    stats.constants_indexed = count("constant")?;
    stats.files_processed = files.len();
    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RepositoryStatusTool;

#[async_trait]
impl ToolOperation for RepositoryStatusTool {
    type Params = RepositoryParams;
    type Output = RepositoryStatus;

    fn name(&self) -> &'static str {
        "get_repository_status"
    }

    fn declaration(&self, _limits: &LimitsConfig) -> ToolDeclaration {
        path_param(
            ToolDeclaration::new(
                self.name(),
                "Get initialization and indexing status for a repository",
            ),
            "inspect",
        )
    }

    fn preconditions(&self) -> Preconditions {
        Preconditions::NONE
    }

    fn parse(&self, request: &ToolRequest, limits: &LimitsConfig) -> Result<RepositoryParams> {
        RepositoryParams::parse(request, limits)
    }

    async fn build(&self, ctx: &ToolContext<'_>, params: &RepositoryParams) -> Result<RepositoryStatus> {
        let path = resolve_repository_path(params.path.as_deref(), ctx.repo_path)?;
        let mut status = ctx.inspector.status(&path)?;
        if status.is_indexed {
            if let Some(engine) = ctx.engine {
                if let Err(e) = engine_statistics(engine, &mut status.statistics) {
                    tracing::warn!("status_statistics_failed: path={}, error={}", path.display(), e);
                }
            }
        }
        Ok(status)
    }
}
