//! Snapshot-backed index builder.

use super::memory::MemoryIndex;
use super::models::FileContext;
use super::repository::{FsRepositoryInspector, INDEX_FILE};
use super::{BuildStats, IndexBuilder};
use crate::types::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// File under `.repocontext` holding a JSON array of `FileContext` records.
pub const SNAPSHOT_FILE: &str = "snapshot.json";

/// Rebuilds a shared [`MemoryIndex`] from `<repo>/.repocontext/snapshot.json`.
#[derive(Debug, Clone)]
pub struct SnapshotIndexBuilder {
    index: Arc<MemoryIndex>,
}

impl SnapshotIndexBuilder {
    pub fn new(index: Arc<MemoryIndex>) -> Self {
        Self { index }
    }

    pub fn snapshot_path(repo: &Path) -> PathBuf {
        FsRepositoryInspector::repocontext_path(repo).join(SNAPSHOT_FILE)
    }

    /// Load the snapshot into the index if one exists. Returns `None` when
    /// the repository has no snapshot yet.
    pub fn load_existing(&self, repo: &Path) -> Result<Option<BuildStats>> {
        if !Self::snapshot_path(repo).is_file() {
            return Ok(None);
        }
        self.build(repo).map(Some)
    }

    fn read_snapshot(repo: &Path) -> Result<Vec<FileContext>> {
        let path = Self::snapshot_path(repo);
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            Error::precondition(format!("cannot read snapshot {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl IndexBuilder for SnapshotIndexBuilder {
    fn build(&self, repo_path: &Path) -> Result<BuildStats> {
        let started = Instant::now();
        FsRepositoryInspector::check_directory(repo_path)?;

        let files = Self::read_snapshot(repo_path)?;
        let mut stats = self.index.ingest(files);

        let marker = FsRepositoryInspector::repocontext_path(repo_path).join(INDEX_FILE);
        let summary = serde_json::to_vec(&stats)?;
        std::fs::write(&marker, summary)?;

        stats.duration = started.elapsed();
        tracing::info!(
            "index_built: path={}, files={}, functions={}, types={}, duration_ms={}",
            repo_path.display(),
            stats.files_processed,
            stats.functions_indexed,
            stats.types_indexed,
            stats.duration.as_millis()
        );
        Ok(stats)
    }
}
