//! Filesystem repository inspector.

use super::RepositoryInspector;
use crate::types::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Per-repository metadata directory.
pub const REPOCONTEXT_DIR: &str = ".repocontext";
/// Marker written by a successful index build.
pub const INDEX_FILE: &str = "index.db";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RepositoryStatistics {
    pub files_processed: usize,
    pub functions_indexed: usize,
    pub types_indexed: usize,
    pub variables_indexed: usize,
    pub constants_indexed: usize,
    pub index_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_build_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repocontext_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub index_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepositoryStatus {
    pub path: String,
    pub is_initialized: bool,
    pub is_indexed: bool,
    pub message: String,
    pub statistics: RepositoryStatistics,
}

/// Inspector that reads `<repo>/.repocontext` on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsRepositoryInspector;

impl FsRepositoryInspector {
    pub fn repocontext_path(repo: &Path) -> PathBuf {
        repo.join(REPOCONTEXT_DIR)
    }

    pub fn index_path(repo: &Path) -> PathBuf {
        repo.join(REPOCONTEXT_DIR).join(INDEX_FILE)
    }

    /// Path must exist and be a directory.
    pub fn check_directory(path: &Path) -> Result<()> {
        let meta = std::fs::metadata(path)
            .map_err(|_| Error::precondition(format!("path does not exist: {}", path.display())))?;
        if !meta.is_dir() {
            return Err(Error::precondition(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }
        Ok(())
    }
}

impl RepositoryInspector for FsRepositoryInspector {
    fn validate(&self, path: Option<&Path>) -> Result<()> {
        let Some(path) = path else {
            return Err(Error::precondition("no repository path configured"));
        };
        if !Self::repocontext_path(path).is_dir() {
            return Err(Error::precondition(
                "repository not initialized - run initialize_repository first",
            ));
        }
        Ok(())
    }

    fn status(&self, path: &Path) -> Result<RepositoryStatus> {
        Self::check_directory(path)?;

        let mut status = RepositoryStatus {
            path: path.display().to_string(),
            is_initialized: false,
            is_indexed: false,
            message: String::new(),
            statistics: RepositoryStatistics::default(),
        };

        let repocontext = Self::repocontext_path(path);
        if !repocontext.is_dir() {
            status.message = "Repository not initialized - run initialize_repository first".into();
            return Ok(status);
        }
        status.is_initialized = true;

        let index = Self::index_path(path);
        let Ok(index_meta) = std::fs::metadata(&index) else {
            status.message =
                "Repository initialized but not indexed - run build_index to create index".into();
            return Ok(status);
        };

        status.is_indexed = true;
        status.message = "Repository fully initialized and indexed".into();
        status.statistics = RepositoryStatistics {
            index_size: index_meta.len(),
            last_build_time: index_meta.modified().ok().map(DateTime::<Utc>::from),
            repository_path: path.display().to_string(),
            repocontext_path: repocontext.display().to_string(),
            index_path: index.display().to_string(),
            ..RepositoryStatistics::default()
        };
        Ok(status)
    }
}
