//! Job graph, job results and run summary types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The closed set of job categories the pipeline knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobCategory {
    Customizing,
    Migration,
    Testing,
}

impl JobCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobCategory::Customizing => "customizing",
            JobCategory::Migration => "migration",
            JobCategory::Testing => "testing",
        }
    }
}

impl fmt::Display for JobCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of an individual job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

/// Overall status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Created,
    Planning,
    Executing,
    Completed,
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Created => "created",
            RunStatus::Planning => "planning",
            RunStatus::Executing => "executing",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A planned unit of work.
///
/// `config` is an opaque JSON payload interpreted by the handler for
/// `category`; the executor never looks inside it beyond the `id` field
/// used for artifact naming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDefinition {
    pub id: String,
    pub category: JobCategory,
    pub name: String,
    pub target_system: String,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// Ordered, dependency-annotated job list for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobGraph {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub jobs: Vec<JobDefinition>,
    pub total_jobs: usize,
    pub estimated_duration_minutes: u64,
}

/// One structured log line captured during job execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub run_id: String,
    pub system: String,
    pub message: String,
}

/// Result of a single job execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: String,
    pub job_category: JobCategory,
    pub job_name: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_seconds: f64,
    #[serde(default)]
    pub records_processed: u64,
    #[serde(default)]
    pub records_success: u64,
    #[serde(default)]
    pub records_failed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub artifacts: Vec<String>,
    #[serde(default)]
    pub kpis: Value,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

impl JobResult {
    /// Fresh result for a job that is about to run.
    pub fn begin(job: &JobDefinition) -> Self {
        Self {
            job_id: job.id.clone(),
            job_category: job.category,
            job_name: job.name.clone(),
            status: JobStatus::Running,
            started_at: Some(Utc::now()),
            completed_at: None,
            duration_seconds: 0.0,
            records_processed: 0,
            records_success: 0,
            records_failed: 0,
            error_message: None,
            artifacts: Vec::new(),
            kpis: Value::Null,
            logs: Vec::new(),
        }
    }

    /// Terminal result for a job that never ran.
    pub fn skipped(job: &JobDefinition, message: impl Into<String>) -> Self {
        Self {
            job_id: job.id.clone(),
            job_category: job.category,
            job_name: job.name.clone(),
            status: JobStatus::Skipped,
            started_at: None,
            completed_at: None,
            duration_seconds: 0.0,
            records_processed: 0,
            records_success: 0,
            records_failed: 0,
            error_message: Some(message.into()),
            artifacts: Vec::new(),
            kpis: Value::Null,
            logs: Vec::new(),
        }
    }

    /// Terminal result for a job rejected or aborted before/while running.
    pub fn failed(job: &JobDefinition, message: impl Into<String>) -> Self {
        let mut result = Self::begin(job);
        result.status = JobStatus::Failed;
        result.error_message = Some(message.into());
        result.finish();
        result
    }

    /// Stamp the completion time and derive the duration.
    pub fn finish(&mut self) {
        let now = Utc::now();
        if let Some(started) = self.started_at {
            self.duration_seconds = (now - started).num_milliseconds() as f64 / 1000.0;
        }
        self.completed_at = Some(now);
    }
}

/// Summary of a full run, persisted as the final artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub project_name: String,
    pub customer: String,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_seconds: f64,

    // Job statistics
    #[serde(default)]
    pub total_jobs: usize,
    #[serde(default)]
    pub completed_jobs: usize,
    #[serde(default)]
    pub failed_jobs: usize,
    #[serde(default)]
    pub skipped_jobs: usize,

    // Record statistics
    #[serde(default)]
    pub total_records: u64,
    #[serde(default)]
    pub success_records: u64,
    #[serde(default)]
    pub failed_records: u64,

    // KPIs
    #[serde(default)]
    pub success_rate: f64,
    #[serde(default)]
    pub automation_rate: f64,
    #[serde(default)]
    pub estimated_manual_hours: f64,
    #[serde(default)]
    pub actual_hours: f64,
    #[serde(default)]
    pub cost_savings_percent: f64,

    #[serde(default)]
    pub job_results: Vec<JobResult>,
    #[serde(default)]
    pub artifacts: Vec<String>,
}

impl RunSummary {
    /// Summary at the moment execution starts.
    pub fn executing(
        run_id: impl Into<String>,
        project_name: impl Into<String>,
        customer: impl Into<String>,
        total_jobs: usize,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            project_name: project_name.into(),
            customer: customer.into(),
            status: RunStatus::Executing,
            started_at: Some(Utc::now()),
            completed_at: None,
            duration_seconds: 0.0,
            total_jobs,
            completed_jobs: 0,
            failed_jobs: 0,
            skipped_jobs: 0,
            total_records: 0,
            success_records: 0,
            failed_records: 0,
            success_rate: 0.0,
            automation_rate: 100.0,
            estimated_manual_hours: 0.0,
            actual_hours: 0.0,
            cost_savings_percent: 0.0,
            job_results: Vec::new(),
            artifacts: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job() -> JobDefinition {
        JobDefinition {
            id: "cust_FI_BASE_a1b2c3".to_string(),
            category: JobCategory::Customizing,
            name: "Customizing: FI_BASE".to_string(),
            target_system: "DEV".to_string(),
            config: json!({"id": "FI_BASE"}),
            dependencies: vec![],
        }
    }

    #[test]
    fn category_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&JobCategory::Customizing).unwrap(),
            "\"customizing\""
        );
        assert_eq!(JobCategory::Migration.to_string(), "migration");
    }

    #[test]
    fn skipped_result_carries_message_without_timestamps() {
        let result = JobResult::skipped(&job(), "Skipped due to previous failure");
        assert_eq!(result.status, JobStatus::Skipped);
        assert!(result.started_at.is_none());
        assert!(result.completed_at.is_none());
        assert_eq!(
            result.error_message.as_deref(),
            Some("Skipped due to previous failure")
        );
    }

    #[test]
    fn finish_sets_completion_and_duration() {
        let mut result = JobResult::begin(&job());
        result.status = JobStatus::Completed;
        result.finish();
        assert!(result.completed_at.is_some());
        assert!(result.duration_seconds >= 0.0);
    }

    #[test]
    fn fresh_summary_reports_full_automation() {
        let summary = RunSummary::executing("run_1", "Alpha", "ACME", 3);
        assert_eq!(summary.status, RunStatus::Executing);
        assert_eq!(summary.automation_rate, 100.0);
        assert_eq!(summary.total_jobs, 3);
    }
}
