//! Artifact store contract.
//!
//! The planner and executor treat storage as a durable sink/source keyed
//! by run id and artifact path. The JSON-on-disk implementation lives in
//! the rollout-stores crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{JobCategory, JobGraph, JobResult, RunSummary};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("run '{0}' not found")]
    RunNotFound(String),
    #[error("artifact '{0}' not found")]
    ArtifactNotFound(String),
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("internal store error: {0}")]
    Internal(String),
}

/// Metadata about one persisted artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub name: String,
    /// Path relative to the run directory.
    pub path: String,
    /// Category subdirectory the artifact lives in, or "general".
    pub artifact_type: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

/// Durable storage for run artifacts.
pub trait RunStore: Send + Sync {
    /// Create the directory layout for a new run.
    fn create_run(&self, run_id: &str) -> Result<(), StoreError>;

    fn run_exists(&self, run_id: &str) -> bool;

    /// All known run ids, newest first.
    fn list_runs(&self) -> Result<Vec<String>, StoreError>;

    /// Remove a run and everything under it.
    fn delete_run(&self, run_id: &str) -> Result<(), StoreError>;

    fn save_plan(&self, run_id: &str, graph: &JobGraph) -> Result<String, StoreError>;

    fn load_plan(&self, run_id: &str) -> Result<JobGraph, StoreError>;

    /// Persist one job result under its category subdirectory. The file
    /// name is derived from `name`, sanitized to alphanumerics, hyphen
    /// and underscore. Returns the stored path.
    fn save_job_result(
        &self,
        run_id: &str,
        category: JobCategory,
        name: &str,
        result: &JobResult,
    ) -> Result<String, StoreError>;

    fn save_summary(&self, run_id: &str, summary: &RunSummary) -> Result<String, StoreError>;

    fn load_summary(&self, run_id: &str) -> Result<RunSummary, StoreError>;

    /// Persist an intermediate state snapshot.
    fn save_state(&self, run_id: &str, state: &serde_json::Value) -> Result<String, StoreError>;

    fn load_state(&self, run_id: &str) -> Result<serde_json::Value, StoreError>;

    /// All JSON artifacts of a run, sorted by path.
    fn list_artifacts(&self, run_id: &str) -> Result<Vec<ArtifactInfo>, StoreError>;

    /// Raw content of one artifact, addressed by its run-relative path.
    fn artifact_content(
        &self,
        run_id: &str,
        path: &str,
    ) -> Result<serde_json::Value, StoreError>;
}
