//! Execution planner.
//!
//! Turns a validated project model into an ordered job graph with a fixed
//! three-phase barrier: customizing runs first as a sequential chain, every
//! migration job waits for all customizing, every testing job waits for all
//! migration. Within the migration and testing phases jobs carry no
//! dependencies on each other.

use chrono::Utc;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::types::{JobCategory, JobDefinition, JobGraph, ProjectModel};

/// Base duration per job in minutes.
const BASE_MINUTES_CUSTOMIZING: f64 = 5.0;
const BASE_MINUTES_MIGRATION: f64 = 15.0;
const BASE_MINUTES_TESTING: f64 = 10.0;

/// Throughput per minute (steps / records / cases).
const PER_MINUTE_CUSTOMIZING: f64 = 100.0;
const PER_MINUTE_MIGRATION: f64 = 500.0;
const PER_MINUTE_TESTING: f64 = 50.0;

#[derive(Debug, Error)]
pub enum PlanningError {
    #[error("failed to serialize job config for '{id}': {source}")]
    ConfigSerialization {
        id: String,
        source: serde_json::Error,
    },
}

/// Creates execution plans from project models.
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlanner;

impl ExecutionPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Create the job graph for one run.
    pub fn create_plan(
        &self,
        run_id: impl Into<String>,
        model: &ProjectModel,
    ) -> Result<JobGraph, PlanningError> {
        let run_id = run_id.into();
        let mut jobs: Vec<JobDefinition> = Vec::new();

        // Phase 1: customizing, sequential chain.
        let mut previous: Option<String> = None;
        for pkg in &model.customizing.packages {
            let steps = serde_json::to_value(&pkg.steps).map_err(|source| {
                PlanningError::ConfigSerialization {
                    id: pkg.id.clone(),
                    source,
                }
            })?;
            let job = JobDefinition {
                id: job_id("cust", &pkg.id),
                category: JobCategory::Customizing,
                name: format!("Customizing: {}", pkg.id),
                target_system: pkg.target.clone(),
                config: json!({
                    "id": pkg.id,
                    "target": pkg.target,
                    "steps": steps,
                    "description": pkg.description,
                }),
                dependencies: previous.take().into_iter().collect(),
            };
            previous = Some(job.id.clone());
            jobs.push(job);
        }
        let customizing_ids: Vec<String> = jobs.iter().map(|j| j.id.clone()).collect();
        debug!(count = customizing_ids.len(), "planned customizing jobs");

        // Phase 2: migration, barrier on all customizing.
        let mut migration_ids = Vec::new();
        for obj in &model.migration.objects {
            let job = JobDefinition {
                id: job_id("migr", &obj.id),
                category: JobCategory::Migration,
                name: format!("Migration: {}", obj.id),
                target_system: obj.target.clone(),
                config: json!({
                    "id": obj.id,
                    "source": obj.source,
                    "target": obj.target,
                    "mapping": obj.mapping,
                    "batch_size": obj.batch_size,
                    "validation_rules": obj.validation_rules,
                }),
                dependencies: customizing_ids.clone(),
            };
            migration_ids.push(job.id.clone());
            jobs.push(job);
        }
        debug!(count = migration_ids.len(), "planned migration jobs");

        // Phase 3: testing, barrier on all migration.
        for suite in &model.testing.suites {
            let cases = serde_json::to_value(&suite.cases).map_err(|source| {
                PlanningError::ConfigSerialization {
                    id: suite.id.clone(),
                    source,
                }
            })?;
            jobs.push(JobDefinition {
                id: job_id("test", &suite.id),
                category: JobCategory::Testing,
                name: format!("Testing: {}", suite.id),
                target_system: suite.target.clone(),
                config: json!({
                    "id": suite.id,
                    "target": suite.target,
                    "cases": cases,
                    "description": suite.description,
                }),
                dependencies: migration_ids.clone(),
            });
        }

        let total_jobs = jobs.len();
        let estimated_duration_minutes = estimate_duration(&jobs);

        info!(
            run_id = %run_id,
            total_jobs,
            estimated_duration_minutes,
            "created execution plan"
        );

        Ok(JobGraph {
            run_id,
            created_at: Utc::now(),
            jobs,
            total_jobs,
            estimated_duration_minutes,
        })
    }

    /// Topologically sorted job order (Kahn's algorithm).
    ///
    /// The executor traverses the graph in declared order; this is a
    /// planning verification aid, not the execution schedule.
    pub fn get_job_order(&self, graph: &JobGraph) -> Vec<String> {
        let mut deps: Vec<(String, Vec<String>)> = graph
            .jobs
            .iter()
            .map(|j| (j.id.clone(), j.dependencies.clone()))
            .collect();

        let mut result: Vec<String> = Vec::new();
        let mut available: Vec<String> = deps
            .iter()
            .filter(|(_, d)| d.is_empty())
            .map(|(id, _)| id.clone())
            .collect();

        while !available.is_empty() {
            let job_id = available.remove(0);
            result.push(job_id.clone());
            for (id, d) in deps.iter_mut() {
                if let Some(pos) = d.iter().position(|dep| dep == &job_id) {
                    d.remove(pos);
                    if d.is_empty() && !result.contains(id) && !available.contains(id) {
                        available.push(id.clone());
                    }
                }
            }
        }

        result
    }

    /// Synthetic manual-effort baseline in hours, used only for the
    /// cost-savings KPI.
    pub fn estimate_manual_hours(&self, model: &ProjectModel) -> f64 {
        let mut hours = 0.0;
        for pkg in &model.customizing.packages {
            hours += pkg.steps.len() as f64 * 2.0;
        }
        hours += model.migration.objects.len() as f64 * 4.0;
        for suite in &model.testing.suites {
            hours += suite.cases.len() as f64 * 1.0;
        }
        // Project management overhead
        hours *= 1.2;
        (hours * 10.0).round() / 10.0
    }
}

fn job_id(prefix: &str, config_id: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{prefix}_{config_id}_{}", &suffix[..6])
}

fn estimate_duration(jobs: &[JobDefinition]) -> u64 {
    let mut total_minutes = 0.0;
    for job in jobs {
        let (base, additional) = match job.category {
            JobCategory::Customizing => {
                let steps = job.config["steps"].as_array().map_or(0, |s| s.len());
                (BASE_MINUTES_CUSTOMIZING, steps as f64 / PER_MINUTE_CUSTOMIZING)
            }
            JobCategory::Migration => {
                let batch = job.config["batch_size"].as_u64().unwrap_or(100);
                (BASE_MINUTES_MIGRATION, batch as f64 / PER_MINUTE_MIGRATION)
            }
            JobCategory::Testing => {
                let cases = job.config["cases"].as_array().map_or(0, |c| c.len());
                (BASE_MINUTES_TESTING, cases as f64 / PER_MINUTE_TESTING)
            }
        };
        total_minutes += base + additional;
    }
    // 10% contingency buffer, truncated to whole minutes
    (total_minutes * 1.1) as u64
}
