//! HTTP layer over the rollout pipeline.
//!
//! The pipeline itself is blocking; every run executes on the tokio
//! blocking pool while handlers serve status queries from a shared
//! registry of active runs.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use rollout_adapters::SandboxAdapterFactory;
use rollout_core::executor::{JobExecutor, ProgressReporter};
use rollout_core::handler::HandlerRegistry;
use rollout_core::parser::ConfigParser;
use rollout_core::planner::ExecutionPlanner;
use rollout_core::store::{ArtifactInfo, RunStore, StoreError};
use rollout_core::types::{JobGraph, RunStatus, RunSummary};
use rollout_stores::FileRunStore;

const SERVICE_NAME: &str = "rollout-server";
const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
struct AppState {
    store: Arc<dyn RunStore>,
    registry: Arc<HandlerRegistry>,
    active: ActiveRuns,
}

type ActiveRuns = Arc<RwLock<HashMap<String, ActiveRun>>>;

/// Live state of a run that is still moving through the pipeline.
#[derive(Debug, Clone)]
struct ActiveRun {
    status: RunStatus,
    message: String,
    progress_percent: u8,
    current_job: Option<String>,
    total_jobs: usize,
    summary: Option<RunSummary>,
    errors: Vec<String>,
    created_at: DateTime<Utc>,
}

impl ActiveRun {
    fn created() -> Self {
        Self {
            status: RunStatus::Created,
            message: "Run created, starting execution...".to_string(),
            progress_percent: 0,
            current_job: None,
            total_jobs: 0,
            summary: None,
            errors: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RunCreateRequest {
    config_yaml: String,
    #[serde(default)]
    dry_run: bool,
}

#[derive(Debug, Serialize)]
struct RunCreateResponse {
    run_id: String,
    status: RunStatus,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    plan: Option<JobGraph>,
}

#[derive(Debug, Serialize)]
struct RunStatusResponse {
    run_id: String,
    status: RunStatus,
    message: Option<String>,
    progress_percent: u8,
    current_job: Option<String>,
    total_jobs: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<RunSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ArtifactsResponse {
    run_id: String,
    artifacts: Vec<ArtifactInfo>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

impl ErrorBody {
    fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            errors: Vec::new(),
        }
    }
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn not_found(message: impl Into<String>) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody::new("not_found", message)),
    )
}

fn map_store_error(err: StoreError) -> ApiError {
    match err {
        StoreError::RunNotFound(run_id) => not_found(format!("Run not found: {run_id}")),
        StoreError::ArtifactNotFound(path) => not_found(format!("Artifact not found: {path}")),
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody::new("internal", other.to_string())),
        ),
    }
}

fn read_active(active: &ActiveRuns) -> std::sync::RwLockReadGuard<'_, HashMap<String, ActiveRun>> {
    active.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_active(
    active: &ActiveRuns,
) -> std::sync::RwLockWriteGuard<'_, HashMap<String, ActiveRun>> {
    active.write().unwrap_or_else(PoisonError::into_inner)
}

fn generate_run_id() -> String {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let unique = Uuid::new_v4().simple().to_string();
    format!("run_{timestamp}_{}", &unique[..6])
}

/// Pushes executor progress into the active-run registry.
struct RegistryReporter {
    active: ActiveRuns,
}

impl ProgressReporter for RegistryReporter {
    fn report(&self, run_id: &str, percent: u8, current_job: &str) {
        let mut runs = write_active(&self.active);
        if let Some(run) = runs.get_mut(run_id) {
            run.progress_percent = percent;
            run.current_job = Some(current_job.to_string());
        }
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/runs", post(create_run).get(list_runs))
        .route("/runs/{run_id}", get(run_status).delete(delete_run))
        .route("/runs/{run_id}/artifacts", get(list_artifacts))
        .route("/runs/{run_id}/artifacts/{*path}", get(artifact_content))
        .with_state(state)
}

pub async fn run_server(listen: SocketAddr, artifacts_path: PathBuf) -> anyhow::Result<()> {
    let store = FileRunStore::new(&artifacts_path)
        .with_context(|| format!("initialize store at {}", artifacts_path.display()))?;
    let state = AppState {
        store: Arc::new(store),
        registry: Arc::new(rollout_handlers::builtin_registry()),
        active: Arc::new(RwLock::new(HashMap::new())),
    };

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .context("bind server listener failed")?;
    info!(%listen, artifacts = %artifacts_path.display(), "rollout-server listening");
    axum::serve(listener, app)
        .await
        .context("server terminated with error")
}

async fn service_info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": SERVICE_NAME,
        "version": SERVICE_VERSION,
        "status": "running",
        "endpoints": {
            "create_run": "POST /runs",
            "get_status": "GET /runs/{run_id}",
            "get_artifacts": "GET /runs/{run_id}/artifacts",
            "list_runs": "GET /runs",
        },
    }))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let executing = read_active(&state.active)
        .values()
        .filter(|run| run.status == RunStatus::Executing)
        .count();
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "active_runs": executing,
    }))
}

async fn create_run(
    State(state): State<AppState>,
    Json(request): Json<RunCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let run_id = generate_run_id();

    // Validate before anything is registered or stored.
    let parser = ConfigParser::new();
    let model = parser.parse(&request.config_yaml).map_err(|err| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: "validation_failed".to_string(),
                message: "Configuration validation failed".to_string(),
                errors: err.messages(),
            }),
        )
    })?;

    if request.dry_run {
        let plan = ExecutionPlanner::new()
            .create_plan(&run_id, &model)
            .map_err(|err| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody::new("internal", err.to_string())),
                )
            })?;
        return Ok((
            StatusCode::ACCEPTED,
            Json(RunCreateResponse {
                run_id,
                status: RunStatus::Created,
                message: "Dry run - configuration validated successfully".to_string(),
                plan: Some(plan),
            }),
        ));
    }

    write_active(&state.active).insert(run_id.clone(), ActiveRun::created());

    let project_name = model.project.name.clone();
    info!(run_id, project = %project_name, "run created");

    let exec_state = state.clone();
    let exec_run_id = run_id.clone();
    let yaml = request.config_yaml;
    tokio::task::spawn_blocking(move || execute_run(exec_state, exec_run_id, yaml));

    Ok((
        StatusCode::ACCEPTED,
        Json(RunCreateResponse {
            run_id,
            status: RunStatus::Created,
            message: format!("Run created for project: {project_name}"),
            plan: None,
        }),
    ))
}

/// Drives one run through parse, plan and execute on a blocking thread.
/// Failures land in the registry; the HTTP response already went out.
fn execute_run(state: AppState, run_id: String, yaml: String) {
    let fail = |active: &ActiveRuns, message: String, errors: Vec<String>| {
        let mut runs = write_active(active);
        if let Some(run) = runs.get_mut(&run_id) {
            run.status = RunStatus::Failed;
            run.message = message;
            run.errors = errors;
        }
    };

    update_run(&state.active, &run_id, |run| {
        run.status = RunStatus::Planning;
        run.message = "Parsing configuration...".to_string();
    });

    let model = match ConfigParser::new().parse(&yaml) {
        Ok(model) => model,
        Err(err) => {
            error!(run_id, %err, "configuration rejected");
            let messages = err.messages();
            fail(&state.active, format!("Configuration error: {err}"), messages);
            return;
        }
    };

    if let Err(err) = state.store.create_run(&run_id) {
        error!(run_id, %err, "run creation failed");
        fail(&state.active, format!("Execution error: {err}"), vec![]);
        return;
    }

    update_run(&state.active, &run_id, |run| {
        run.message = "Creating execution plan...".to_string();
    });

    let plan = match ExecutionPlanner::new().create_plan(&run_id, &model) {
        Ok(plan) => plan,
        Err(err) => {
            error!(run_id, %err, "planning failed");
            fail(&state.active, format!("Execution error: {err}"), vec![]);
            return;
        }
    };

    if let Err(err) = state.store.save_plan(&run_id, &plan) {
        error!(run_id, %err, "plan persistence failed");
        fail(&state.active, format!("Execution error: {err}"), vec![]);
        return;
    }

    update_run(&state.active, &run_id, |run| {
        run.status = RunStatus::Executing;
        run.message = "Executing jobs...".to_string();
        run.total_jobs = plan.total_jobs;
    });

    let executor = JobExecutor::new(
        state.store.clone(),
        state.registry.clone(),
        Arc::new(SandboxAdapterFactory::default()),
    )
    .with_progress_reporter(Arc::new(RegistryReporter {
        active: state.active.clone(),
    }));

    match executor.execute(&run_id, &plan, &model) {
        Ok(summary) => {
            info!(run_id, status = %summary.status, "run finished");
            update_run(&state.active, &run_id, |run| {
                run.status = summary.status;
                run.summary = Some(summary.clone());
                run.message = "Execution completed".to_string();
                run.progress_percent = 100;
            });
        }
        Err(err) => {
            error!(run_id, %err, "run failed");
            fail(&state.active, format!("Execution error: {err}"), vec![]);
        }
    }
}

fn update_run(active: &ActiveRuns, run_id: &str, f: impl FnOnce(&mut ActiveRun)) {
    let mut runs = write_active(active);
    if let Some(run) = runs.get_mut(run_id) {
        f(run);
    }
}

async fn run_status(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<RunStatusResponse>, ApiError> {
    if let Some(run) = read_active(&state.active).get(&run_id) {
        return Ok(Json(RunStatusResponse {
            run_id,
            status: run.status,
            message: Some(run.message.clone()),
            progress_percent: run.progress_percent,
            current_job: run.current_job.clone(),
            total_jobs: run.total_jobs,
            summary: run.summary.clone(),
            errors: run.errors.clone(),
        }));
    }

    let summary = state
        .store
        .load_summary(&run_id)
        .map_err(map_store_error)?;
    let progress = match summary.status {
        RunStatus::Completed | RunStatus::Failed => 100,
        _ => 0,
    };
    Ok(Json(RunStatusResponse {
        run_id,
        status: summary.status,
        message: None,
        progress_percent: progress,
        current_job: None,
        total_jobs: summary.total_jobs,
        summary: Some(summary),
        errors: Vec::new(),
    }))
}

async fn list_runs(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let run_ids = state.store.list_runs().map_err(map_store_error)?;
    let active = read_active(&state.active);

    let mut runs = Vec::new();
    for run_id in run_ids {
        if let Some(run) = active.get(&run_id) {
            runs.push(serde_json::json!({
                "run_id": run_id,
                "status": run.status,
                "progress_percent": run.progress_percent,
                "created_at": run.created_at,
            }));
        } else if let Ok(summary) = state.store.load_summary(&run_id) {
            runs.push(serde_json::json!({
                "run_id": run_id,
                "status": summary.status,
                "project_name": summary.project_name,
                "customer": summary.customer,
                "completed_at": summary.completed_at,
            }));
        }
    }

    let total = runs.len();
    Ok(Json(serde_json::json!({ "runs": runs, "total": total })))
}

async fn list_artifacts(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<ArtifactsResponse>, ApiError> {
    if !state.store.run_exists(&run_id) {
        return Err(not_found(format!("Run not found: {run_id}")));
    }
    let artifacts = state.store.list_artifacts(&run_id).map_err(map_store_error)?;
    Ok(Json(ArtifactsResponse { run_id, artifacts }))
}

async fn artifact_content(
    State(state): State<AppState>,
    Path((run_id, path)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.store.run_exists(&run_id) {
        return Err(not_found(format!("Run not found: {run_id}")));
    }
    let content = state
        .store
        .artifact_content(&run_id, &path)
        .map_err(map_store_error)?;
    Ok(Json(content))
}

async fn delete_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    {
        let mut active = write_active(&state.active);
        if let Some(run) = active.get(&run_id) {
            if run.status == RunStatus::Executing {
                return Err((
                    StatusCode::CONFLICT,
                    Json(ErrorBody::new(
                        "conflict",
                        "Cannot delete a running execution",
                    )),
                ));
            }
            active.remove(&run_id);
        }
    }

    state.store.delete_run(&run_id).map_err(map_store_error)?;
    Ok(Json(serde_json::json!({
        "message": format!("Run {run_id} deleted successfully")
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_ids_carry_timestamp_and_suffix() {
        let id = generate_run_id();
        let parts: Vec<&str> = id.splitn(3, '_').collect();
        assert_eq!(parts[0], "run");
        assert_eq!(parts[1].len(), 14);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 6);
        assert_ne!(generate_run_id(), id);
    }

    #[test]
    fn registry_reporter_updates_only_known_runs() {
        let active: ActiveRuns = Arc::new(RwLock::new(HashMap::new()));
        write_active(&active).insert("run_a".to_string(), ActiveRun::created());

        let reporter = RegistryReporter {
            active: active.clone(),
        };
        reporter.report("run_a", 50, "Migration: CUSTOMER");
        reporter.report("run_missing", 75, "ignored");

        let runs = read_active(&active);
        let run = runs.get("run_a").expect("registered run");
        assert_eq!(run.progress_percent, 50);
        assert_eq!(run.current_job.as_deref(), Some("Migration: CUSTOMER"));
        assert!(!runs.contains_key("run_missing"));
    }
}
