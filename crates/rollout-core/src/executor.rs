//! Job executor.
//!
//! Drives one run end to end: resolves handlers up front, maintains the
//! per-run adapter pool, traverses the planned jobs strictly in order and
//! applies the fail-fast policy. The first job failure guarantees every
//! remaining job is marked skipped rather than attempted.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::adapter::{AdapterError, AdapterFactory, SystemAdapter};
use crate::handler::{HandlerContext, HandlerRegistry, JobHandler};
use crate::planner::ExecutionPlanner;
use crate::store::{RunStore, StoreError};
use crate::types::{
    JobCategory, JobDefinition, JobGraph, JobResult, JobStatus, ProjectModel, RunStatus,
    RunSummary,
};

/// Client used when a target system is not declared in the landscape.
const DEFAULT_CLIENT: &str = "100";

const SKIP_MESSAGE: &str = "Skipped due to previous failure";

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("no handler registered for category '{0}'")]
    MissingHandler(JobCategory),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Advisory progress observer. Reported before each job and once at the
/// end; never affects control flow.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, run_id: &str, percent: u8, current_job: &str);
}

/// Executes job graphs sequentially against a set of target systems.
pub struct JobExecutor {
    store: Arc<dyn RunStore>,
    registry: Arc<HandlerRegistry>,
    adapter_factory: Arc<dyn AdapterFactory>,
    progress: Option<Arc<dyn ProgressReporter>>,
}

impl JobExecutor {
    pub fn new(
        store: Arc<dyn RunStore>,
        registry: Arc<HandlerRegistry>,
        adapter_factory: Arc<dyn AdapterFactory>,
    ) -> Self {
        Self {
            store,
            registry,
            adapter_factory,
            progress: None,
        }
    }

    pub fn with_progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress = Some(reporter);
        self
    }

    fn report_progress(&self, run_id: &str, percent: u8, current_job: &str) {
        if let Some(reporter) = &self.progress {
            reporter.report(run_id, percent, current_job);
        }
    }

    /// Execute one run. Blocks until every job has reached a terminal
    /// status, then returns the persisted summary.
    pub fn execute(
        &self,
        run_id: &str,
        graph: &JobGraph,
        model: &ProjectModel,
    ) -> Result<RunSummary, ExecutionError> {
        let mut summary = RunSummary::executing(
            run_id,
            model.project.name.clone(),
            model.project.customer.clone(),
            graph.total_jobs,
        );
        info!(run_id, total_jobs = graph.total_jobs, "starting execution");

        // Resolve handlers before anything runs. A missing category fails
        // the whole run without touching any system.
        let handlers = self.resolve_handlers()?;

        // One adapter per distinct target system, connected up front and
        // reused for every job against that system.
        let mut adapters: HashMap<String, Arc<dyn SystemAdapter>> = HashMap::new();
        for job in &graph.jobs {
            if !adapters.contains_key(&job.target_system) {
                let adapter = self.create_adapter(&job.target_system, model)?;
                adapters.insert(job.target_system.clone(), adapter);
            }
        }

        let shared: Arc<Mutex<HashMap<String, Value>>> = Arc::new(Mutex::new(HashMap::new()));

        let mut job_results: Vec<JobResult> = Vec::new();
        let mut completed = 0usize;
        let mut failed = 0usize;
        let mut skipped = 0usize;
        let mut stop = false;

        for (i, job) in graph.jobs.iter().enumerate() {
            let percent = (i as f64 / graph.total_jobs as f64 * 100.0) as u8;
            self.report_progress(run_id, percent, &job.name);

            if stop {
                job_results.push(JobResult::skipped(job, SKIP_MESSAGE));
                skipped += 1;
                continue;
            }

            info!(run_id, job = %job.name, "executing job {}/{}", i + 1, graph.total_jobs);

            let mut result = self.run_job(run_id, job, model, &handlers, &adapters, &shared);

            // Persist the result regardless of status; a storage failure
            // counts as a job failure.
            match self.persist_result(run_id, job, &result) {
                Ok(path) => result.artifacts.push(path),
                Err(err) => {
                    error!(run_id, job = %job.name, %err, "failed to persist job result");
                    result.status = JobStatus::Failed;
                    result.error_message = Some(format!("Failed to persist result: {err}"));
                }
            }

            if result.status == JobStatus::Completed {
                completed += 1;
                info!(run_id, job = %job.name, "job completed");
            } else {
                failed += 1;
                stop = true;
                error!(
                    run_id,
                    job = %job.name,
                    error = result.error_message.as_deref().unwrap_or("unknown"),
                    "job failed"
                );
            }
            job_results.push(result);
        }

        // Finalize
        let completed_at = Utc::now();
        let duration = summary
            .started_at
            .map(|s| (completed_at - s).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);

        summary.completed_at = Some(completed_at);
        summary.duration_seconds = duration;
        summary.completed_jobs = completed;
        summary.failed_jobs = failed;
        summary.skipped_jobs = skipped;
        summary.total_records = job_results.iter().map(|r| r.records_processed).sum();
        summary.success_records = job_results.iter().map(|r| r.records_success).sum();
        summary.failed_records = job_results.iter().map(|r| r.records_failed).sum();

        summary.success_rate = if graph.total_jobs > 0 {
            completed as f64 / graph.total_jobs as f64 * 100.0
        } else {
            0.0
        };
        summary.automation_rate = 100.0;

        let manual_hours = ExecutionPlanner::new().estimate_manual_hours(model);
        let actual_hours = duration / 3600.0;
        summary.estimated_manual_hours = manual_hours;
        summary.actual_hours = (actual_hours * 100.0).round() / 100.0;
        summary.cost_savings_percent = if manual_hours > 0.0 {
            ((1.0 - actual_hours / manual_hours) * 1000.0).round() / 10.0
        } else {
            0.0
        };

        summary.status = if failed == 0 && skipped == 0 {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };

        summary.artifacts = job_results
            .iter()
            .flat_map(|r| r.artifacts.iter().cloned())
            .collect();
        summary.job_results = job_results;

        // Adapters are disconnected even when the summary cannot be
        // persisted; only then does the store error propagate.
        let saved = self.store.save_summary(run_id, &summary);
        self.cleanup(adapters);
        saved?;

        self.report_progress(run_id, 100, "Complete");
        info!(
            run_id,
            completed,
            total = graph.total_jobs,
            cost_savings_percent = summary.cost_savings_percent,
            "execution finished"
        );

        Ok(summary)
    }

    fn resolve_handlers(
        &self,
    ) -> Result<HashMap<JobCategory, Arc<dyn JobHandler>>, ExecutionError> {
        let mut handlers = HashMap::new();
        for category in [
            JobCategory::Customizing,
            JobCategory::Migration,
            JobCategory::Testing,
        ] {
            let handler = self
                .registry
                .get(category)
                .ok_or(ExecutionError::MissingHandler(category))?;
            handlers.insert(category, handler);
        }
        debug!("handlers resolved");
        Ok(handlers)
    }

    fn create_adapter(
        &self,
        system_id: &str,
        model: &ProjectModel,
    ) -> Result<Arc<dyn SystemAdapter>, ExecutionError> {
        let client = model.client_for(system_id).unwrap_or(DEFAULT_CLIENT);
        let adapter: Arc<dyn SystemAdapter> =
            Arc::from(self.adapter_factory.create(system_id, client)?);
        match adapter.connect() {
            Ok(true) => {}
            Ok(false) => warn!(system_id, "system refused connection"),
            Err(err) => return Err(err.into()),
        }
        debug!(system_id, client, "adapter connected");
        Ok(adapter)
    }

    /// Run a single job within its own failure boundary. Never returns
    /// an error; every failure mode becomes a `Failed` result.
    fn run_job(
        &self,
        run_id: &str,
        job: &JobDefinition,
        model: &ProjectModel,
        handlers: &HashMap<JobCategory, Arc<dyn JobHandler>>,
        adapters: &HashMap<String, Arc<dyn SystemAdapter>>,
        shared: &Arc<Mutex<HashMap<String, Value>>>,
    ) -> JobResult {
        let Some(handler) = handlers.get(&job.category) else {
            return JobResult::failed(job, format!("No handler for category: {}", job.category));
        };
        let Some(adapter) = adapters.get(&job.target_system) else {
            return JobResult::failed(job, format!("No adapter for system: {}", job.target_system));
        };

        let client = model
            .client_for(&job.target_system)
            .unwrap_or(DEFAULT_CLIENT)
            .to_string();

        let context = HandlerContext {
            run_id: run_id.to_string(),
            adapter: Arc::clone(adapter),
            artifacts_path: std::path::PathBuf::from(run_id),
            project_name: model.project.name.clone(),
            customer: model.project.customer.clone(),
            target_system: job.target_system.clone(),
            client,
            shared: Arc::clone(shared),
        };

        let validation_errors = handler.validate(&job.config);
        if !validation_errors.is_empty() {
            return JobResult::failed(
                job,
                format!("Validation failed: {}", validation_errors.join("; ")),
            );
        }

        // Handlers are contractually panic-free; this boundary turns a
        // defect into a failed job instead of poisoning the run.
        let handler = Arc::clone(handler);
        let config = job.config.clone();
        match panic::catch_unwind(AssertUnwindSafe(move || handler.execute(&context, &config))) {
            Ok(result) => result,
            Err(payload) => {
                let detail = panic_message(payload);
                JobResult::failed(job, format!("Job execution aborted: {detail}"))
            }
        }
    }

    fn persist_result(
        &self,
        run_id: &str,
        job: &JobDefinition,
        result: &JobResult,
    ) -> Result<String, StoreError> {
        let name = job
            .config
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or(&job.id);
        self.store
            .save_job_result(run_id, job.category, name, result)
    }

    fn cleanup(&self, adapters: HashMap<String, Arc<dyn SystemAdapter>>) {
        for (system_id, adapter) in adapters {
            if let Err(err) = adapter.disconnect() {
                warn!(system_id, %err, "error disconnecting adapter");
            }
        }
        debug!("executor cleanup complete");
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
