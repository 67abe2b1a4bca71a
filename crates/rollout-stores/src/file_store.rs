//! JSON-on-disk run store.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info};

use rollout_core::store::{ArtifactInfo, RunStore, StoreError};
use rollout_core::types::{JobCategory, JobGraph, JobResult, RunSummary};

const CATEGORY_DIRS: [&str; 3] = ["customizing", "migration", "testing"];

/// Stores run artifacts as JSON files under a base directory.
pub struct FileRunStore {
    base_path: PathBuf,
}

impl FileRunStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;
        info!(path = %base_path.display(), "file store initialized");
        Ok(Self { base_path })
    }

    fn run_path(&self, run_id: &str) -> PathBuf {
        self.base_path.join(run_id)
    }

    fn ensure_run_dirs(&self, run_id: &str) -> Result<PathBuf, StoreError> {
        let run_path = self.run_path(run_id);
        for subdir in CATEGORY_DIRS {
            fs::create_dir_all(run_path.join(subdir))?;
        }
        Ok(run_path)
    }

    fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(value)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn read_json<T: serde::de::DeserializeOwned>(
        path: &Path,
        run_id: &str,
    ) -> Result<T, StoreError> {
        if !path.exists() {
            return Err(StoreError::RunNotFound(run_id.to_string()));
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn scan_artifacts(
        dir: &Path,
        prefix: Option<&str>,
        artifacts: &mut Vec<ArtifactInfo>,
    ) -> Result<(), StoreError> {
        if !dir.exists() {
            return Ok(());
        }
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            if path.is_file() && path.extension().is_some_and(|e| e == "json") {
                let rel_path = match prefix {
                    Some(prefix) => format!("{prefix}/{name}"),
                    None => name.clone(),
                };
                let metadata = entry.metadata()?;
                let created_at: DateTime<Utc> = metadata
                    .modified()
                    .map(DateTime::from)
                    .unwrap_or_else(|_| Utc::now());
                artifacts.push(ArtifactInfo {
                    name,
                    path: rel_path,
                    artifact_type: artifact_type(prefix),
                    size_bytes: metadata.len(),
                    created_at,
                });
            } else if path.is_dir() && !name.starts_with('.') {
                Self::scan_artifacts(&path, Some(&name), artifacts)?;
            }
        }
        Ok(())
    }
}

/// Replace anything outside alphanumerics, hyphen and underscore.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn artifact_type(prefix: Option<&str>) -> String {
    match prefix {
        None => "summary".to_string(),
        Some(p) if CATEGORY_DIRS.contains(&p) => p.to_string(),
        Some(_) => "other".to_string(),
    }
}

impl RunStore for FileRunStore {
    fn create_run(&self, run_id: &str) -> Result<(), StoreError> {
        self.ensure_run_dirs(run_id)?;
        info!(run_id, "created run");
        Ok(())
    }

    fn run_exists(&self, run_id: &str) -> bool {
        self.run_path(run_id).exists()
    }

    fn list_runs(&self) -> Result<Vec<String>, StoreError> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }
        let mut runs = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if entry.path().is_dir() && !name.starts_with('.') {
                runs.push(name);
            }
        }
        runs.sort_by(|a, b| b.cmp(a));
        Ok(runs)
    }

    fn delete_run(&self, run_id: &str) -> Result<(), StoreError> {
        let run_path = self.run_path(run_id);
        if !run_path.exists() {
            return Err(StoreError::RunNotFound(run_id.to_string()));
        }
        fs::remove_dir_all(run_path)?;
        info!(run_id, "deleted run");
        Ok(())
    }

    fn save_plan(&self, run_id: &str, graph: &JobGraph) -> Result<String, StoreError> {
        let run_path = self.ensure_run_dirs(run_id)?;
        let path = run_path.join("plan.json");
        Self::write_json(&path, graph)?;
        info!(run_id, "saved execution plan");
        Ok(path.display().to_string())
    }

    fn load_plan(&self, run_id: &str) -> Result<JobGraph, StoreError> {
        Self::read_json(&self.run_path(run_id).join("plan.json"), run_id)
    }

    fn save_job_result(
        &self,
        run_id: &str,
        category: JobCategory,
        name: &str,
        result: &JobResult,
    ) -> Result<String, StoreError> {
        let run_path = self.ensure_run_dirs(run_id)?;
        let dir = run_path.join(category.as_str());
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.json", sanitize_name(name)));
        Self::write_json(&path, result)?;
        debug!(run_id, path = %path.display(), "saved job result");
        Ok(path.display().to_string())
    }

    fn save_summary(&self, run_id: &str, summary: &RunSummary) -> Result<String, StoreError> {
        let run_path = self.ensure_run_dirs(run_id)?;
        let path = run_path.join("summary.json");
        Self::write_json(&path, summary)?;
        debug!(run_id, "saved summary");
        Ok(path.display().to_string())
    }

    fn load_summary(&self, run_id: &str) -> Result<RunSummary, StoreError> {
        Self::read_json(&self.run_path(run_id).join("summary.json"), run_id)
    }

    fn save_state(&self, run_id: &str, state: &Value) -> Result<String, StoreError> {
        let run_path = self.ensure_run_dirs(run_id)?;
        let path = run_path.join("state.json");
        Self::write_json(&path, state)?;
        Ok(path.display().to_string())
    }

    fn load_state(&self, run_id: &str) -> Result<Value, StoreError> {
        Self::read_json(&self.run_path(run_id).join("state.json"), run_id)
    }

    fn list_artifacts(&self, run_id: &str) -> Result<Vec<ArtifactInfo>, StoreError> {
        let run_path = self.run_path(run_id);
        if !run_path.exists() {
            return Ok(Vec::new());
        }
        let mut artifacts = Vec::new();
        Self::scan_artifacts(&run_path, None, &mut artifacts)?;
        artifacts.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(artifacts)
    }

    fn artifact_content(&self, run_id: &str, path: &str) -> Result<Value, StoreError> {
        // Keep lookups inside the run directory.
        if path.split('/').any(|part| part == "..") {
            return Err(StoreError::ArtifactNotFound(path.to_string()));
        }
        let full_path = self.run_path(run_id).join(path);
        if !full_path.exists() {
            return Err(StoreError::ArtifactNotFound(path.to_string()));
        }
        let content = fs::read_to_string(full_path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rollout_core::types::{JobDefinition, JobStatus};
    use serde_json::json;
    use tempfile::TempDir;

    fn store() -> (TempDir, FileRunStore) {
        let dir = TempDir::new().unwrap();
        let store = FileRunStore::new(dir.path()).unwrap();
        (dir, store)
    }

    fn sample_result(name: &str) -> JobResult {
        let job = JobDefinition {
            id: format!("cust_{name}_abc123"),
            category: JobCategory::Customizing,
            name: format!("Customizing: {name}"),
            target_system: "DEV".to_string(),
            config: json!({"id": name}),
            dependencies: vec![],
        };
        let mut result = JobResult::begin(&job);
        result.status = JobStatus::Completed;
        result.finish();
        result
    }

    fn sample_graph(run_id: &str) -> JobGraph {
        JobGraph {
            run_id: run_id.to_string(),
            created_at: Utc::now(),
            jobs: vec![],
            total_jobs: 0,
            estimated_duration_minutes: 0,
        }
    }

    #[test]
    fn run_lifecycle() {
        let (_dir, store) = store();
        assert!(!store.run_exists("run_1"));
        store.create_run("run_1").unwrap();
        assert!(store.run_exists("run_1"));
        assert_eq!(store.list_runs().unwrap(), vec!["run_1"]);

        store.delete_run("run_1").unwrap();
        assert!(!store.run_exists("run_1"));
        assert!(matches!(
            store.delete_run("run_1"),
            Err(StoreError::RunNotFound(_))
        ));
    }

    #[test]
    fn plan_round_trip() {
        let (_dir, store) = store();
        let graph = sample_graph("run_1");
        store.save_plan("run_1", &graph).unwrap();
        let loaded = store.load_plan("run_1").unwrap();
        assert_eq!(loaded.run_id, "run_1");
    }

    #[test]
    fn job_result_lands_in_category_dir_with_sanitized_name() {
        let (dir, store) = store();
        let result = sample_result("FI BASE/01");
        let path = store
            .save_job_result("run_1", JobCategory::Customizing, "FI BASE/01", &result)
            .unwrap();
        assert!(path.ends_with("customizing/FI_BASE_01.json"));
        assert!(dir
            .path()
            .join("run_1/customizing/FI_BASE_01.json")
            .exists());
    }

    #[test]
    fn summary_round_trip() {
        let (_dir, store) = store();
        let summary = RunSummary::executing("run_1", "Alpha", "ACME", 2);
        store.save_summary("run_1", &summary).unwrap();
        let loaded = store.load_summary("run_1").unwrap();
        assert_eq!(loaded.project_name, "Alpha");
        assert_eq!(loaded.total_jobs, 2);
    }

    #[test]
    fn missing_summary_is_run_not_found() {
        let (_dir, store) = store();
        assert!(matches!(
            store.load_summary("nope"),
            Err(StoreError::RunNotFound(_))
        ));
    }

    #[test]
    fn artifacts_listed_recursively_sorted_with_types() {
        let (_dir, store) = store();
        let summary = RunSummary::executing("run_1", "Alpha", "ACME", 1);
        store.save_summary("run_1", &summary).unwrap();
        store
            .save_job_result(
                "run_1",
                JobCategory::Customizing,
                "P1",
                &sample_result("P1"),
            )
            .unwrap();
        store
            .save_job_result(
                "run_1",
                JobCategory::Migration,
                "CUSTOMER",
                &sample_result("CUSTOMER"),
            )
            .unwrap();

        let artifacts = store.list_artifacts("run_1").unwrap();
        let paths: Vec<&str> = artifacts.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "customizing/P1.json",
                "migration/CUSTOMER.json",
                "summary.json"
            ]
        );
        assert_eq!(artifacts[0].artifact_type, "customizing");
        assert_eq!(artifacts[2].artifact_type, "summary");
        assert!(artifacts.iter().all(|a| a.size_bytes > 0));
    }

    #[test]
    fn artifact_content_by_relative_path() {
        let (_dir, store) = store();
        store
            .save_job_result(
                "run_1",
                JobCategory::Testing,
                "SMOKE",
                &sample_result("SMOKE"),
            )
            .unwrap();
        let content = store
            .artifact_content("run_1", "testing/SMOKE.json")
            .unwrap();
        assert_eq!(content["status"], json!("completed"));

        assert!(matches!(
            store.artifact_content("run_1", "testing/missing.json"),
            Err(StoreError::ArtifactNotFound(_))
        ));
        assert!(matches!(
            store.artifact_content("run_1", "../run_2/summary.json"),
            Err(StoreError::ArtifactNotFound(_))
        ));
    }

    #[test]
    fn state_round_trip() {
        let (_dir, store) = store();
        let state = json!({"status": "executing", "current_job": "Migration: CUSTOMER"});
        store.save_state("run_1", &state).unwrap();
        assert_eq!(store.load_state("run_1").unwrap(), state);
    }
}
