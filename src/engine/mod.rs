//! Query-engine collaborator surface.
//!
//! The serving layer only talks to the index through the traits below:
//! - [`QueryEngine`]: name / pattern / type / file search plus call graphs
//! - [`RepositoryInspector`]: is there an index at this path?
//! - [`IndexBuilder`]: (re)build the index for a repository
//!
//! [`MemoryIndex`] and [`SnapshotIndexBuilder`] are the in-process
//! implementations used by the server binary and the tests.

mod memory;
mod models;
mod repository;
mod snapshot;

pub use memory::MemoryIndex;
pub use models::{
    CallGraphEntry, CallGraphInfo, Constant, EntityKind, Export, Field, FileContext, Function,
    Import, IndexEntry, Method, OutputFormat, Parameter, QueryOptions, SearchResult,
    SearchResultEntry, SemanticChunk, TypeDef, TypeRef, Variable,
};
pub use repository::{
    FsRepositoryInspector, RepositoryStatistics, RepositoryStatus, INDEX_FILE, REPOCONTEXT_DIR,
};
pub use snapshot::{SnapshotIndexBuilder, SNAPSHOT_FILE};

use crate::types::Result;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// Read access to a repository index. Implementations must be safe to call
/// from concurrent tool invocations.
#[cfg_attr(test, mockall::automock)]
pub trait QueryEngine: Send + Sync {
    /// Exact-name search.
    fn search_by_name(&self, name: &str, options: &QueryOptions) -> Result<SearchResult>;

    /// Glob or regex search over entity names.
    fn search_by_pattern(&self, pattern: &str, options: &QueryOptions) -> Result<SearchResult>;

    /// Every entity of one kind ("type" covers all type-like kinds).
    fn search_by_type(&self, entity_type: &str, options: &QueryOptions) -> Result<SearchResult>;

    /// Every entity defined in a file (matched by full path or base name).
    fn search_in_file(&self, path: &str, options: &QueryOptions) -> Result<SearchResult>;

    /// Callers and/or callees of `function`, depth-bounded.
    fn call_graph(&self, function: &str, options: &QueryOptions) -> Result<CallGraphInfo>;
}

/// Checks whether a repository has been initialised and indexed.
pub trait RepositoryInspector: Send + Sync {
    /// Fails when no path is configured or the repository was never initialised.
    fn validate(&self, path: Option<&Path>) -> Result<()>;

    /// Filesystem status of the repository at `path`.
    fn status(&self, path: &Path) -> Result<RepositoryStatus>;
}

/// Counters reported by an index build.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildStats {
    pub files_processed: usize,
    pub functions_indexed: usize,
    pub types_indexed: usize,
    pub variables_indexed: usize,
    pub constants_indexed: usize,
    pub calls_indexed: usize,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

/// Builds (or rebuilds) the index for a repository.
pub trait IndexBuilder: Send + Sync {
    fn build(&self, repo_path: &Path) -> Result<BuildStats>;
}
