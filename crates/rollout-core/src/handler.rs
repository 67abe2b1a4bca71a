//! Job handler contract and registry.
//!
//! A handler executes all jobs of one category. The registry maps each
//! category to exactly one handler instance and is built explicitly at
//! process start; there is no global handler state.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::adapter::SystemAdapter;
use crate::types::{JobCategory, JobResult, LogEntry};

/// Per-run key-value bag shared across handlers.
///
/// Lets a later phase read an earlier phase's output (e.g. migration
/// checking whether a customizing package succeeded). By convention each
/// producer writes each key exactly once; this is documented, not
/// enforced. Jobs run strictly sequentially, the mutex only satisfies
/// the `Sync` bound.
pub type SharedState = Arc<Mutex<HashMap<String, Value>>>;

/// Execution context handed to a handler for one job.
#[derive(Clone)]
pub struct HandlerContext {
    pub run_id: String,
    pub adapter: Arc<dyn SystemAdapter>,
    pub artifacts_path: PathBuf,
    pub project_name: String,
    pub customer: String,
    pub target_system: String,
    pub client: String,
    pub shared: SharedState,
}

impl HandlerContext {
    /// Structured info log entry, also emitted to the tracing subscriber.
    pub fn log_info(&self, message: impl Into<String>) -> LogEntry {
        let entry = self.entry("INFO", message.into());
        info!(run_id = %entry.run_id, system = %entry.system, "{}", entry.message);
        entry
    }

    pub fn log_warn(&self, message: impl Into<String>) -> LogEntry {
        let entry = self.entry("WARNING", message.into());
        warn!(run_id = %entry.run_id, system = %entry.system, "{}", entry.message);
        entry
    }

    pub fn log_error(&self, message: impl Into<String>) -> LogEntry {
        let entry = self.entry("ERROR", message.into());
        error!(run_id = %entry.run_id, system = %entry.system, "{}", entry.message);
        entry
    }

    fn entry(&self, level: &str, message: String) -> LogEntry {
        LogEntry {
            timestamp: Utc::now(),
            level: level.to_string(),
            run_id: self.run_id.clone(),
            system: self.target_system.clone(),
            message,
        }
    }

    /// Store a value in the shared per-run bag.
    pub fn share(&self, key: impl Into<String>, value: Value) {
        if let Ok(mut shared) = self.shared.lock() {
            shared.insert(key.into(), value);
        }
    }

    /// Read a value from the shared per-run bag.
    pub fn shared_value(&self, key: &str) -> Option<Value> {
        self.shared.lock().ok().and_then(|s| s.get(key).cloned())
    }
}

/// Executes jobs of one category.
///
/// Handlers never panic outward and never return errors: any internal
/// failure is folded into a `Failed` [`JobResult`] with the detail in
/// `error_message`.
pub trait JobHandler: Send + Sync {
    /// The category this handler serves.
    fn category(&self) -> JobCategory;

    /// Check a job config before execution. Non-empty means the job is
    /// rejected without running.
    fn validate(&self, config: &Value) -> Vec<String>;

    /// Run the job.
    fn execute(&self, context: &HandlerContext, config: &Value) -> JobResult;
}

/// Standard KPI block derived from a finished result.
pub fn result_kpis(result: &JobResult) -> Value {
    let total = result.records_processed;
    let success_rate = if total > 0 {
        result.records_success as f64 / total as f64 * 100.0
    } else {
        100.0
    };
    let throughput = if result.duration_seconds > 0.0 {
        (total as f64 / result.duration_seconds * 100.0).round() / 100.0
    } else {
        0.0
    };
    json!({
        "total_records": total,
        "success_records": result.records_success,
        "failed_records": result.records_failed,
        "success_rate_percent": (success_rate * 100.0).round() / 100.0,
        "duration_seconds": result.duration_seconds,
        "throughput_per_second": throughput,
    })
}

/// Maps each job category to exactly one handler.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<JobCategory, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for its own category, replacing any previous
    /// registration.
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let category = handler.category();
        info!(%category, "registered job handler");
        self.handlers.insert(category, handler);
    }

    pub fn with_handler(mut self, handler: Arc<dyn JobHandler>) -> Self {
        self.register(handler);
        self
    }

    pub fn get(&self, category: JobCategory) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(&category).cloned()
    }

    pub fn categories(&self) -> Vec<JobCategory> {
        self.handlers.keys().copied().collect()
    }
}
