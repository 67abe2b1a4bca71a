//! # Rollout Handlers
//!
//! Built-in job handlers for the three pipeline phases: customizing,
//! migration and testing. Each handler implements the `JobHandler`
//! contract from rollout-core and talks to the target system only
//! through the adapter in its context.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rollout_core::handler::{result_kpis, HandlerRegistry};
use rollout_core::types::{JobCategory, JobResult, JobStatus, LogEntry};

pub mod customizing;
pub mod migration;
pub mod testing;

pub use customizing::CustomizingHandler;
pub use migration::MigrationHandler;
pub use testing::TestingHandler;

/// Registry with all three built-in handlers registered.
pub fn builtin_registry() -> HandlerRegistry {
    HandlerRegistry::new()
        .with_handler(Arc::new(CustomizingHandler::new()))
        .with_handler(Arc::new(MigrationHandler::new()))
        .with_handler(Arc::new(TestingHandler::new()))
}

/// Assemble a finished result with derived duration and KPIs.
#[allow(clippy::too_many_arguments)]
pub(crate) fn build_result(
    category: JobCategory,
    job_id: String,
    job_name: String,
    status: JobStatus,
    started_at: DateTime<Utc>,
    records_processed: u64,
    records_success: u64,
    records_failed: u64,
    error_message: Option<String>,
    logs: Vec<LogEntry>,
) -> JobResult {
    let completed_at = Utc::now();
    let duration_seconds = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;

    let mut result = JobResult {
        job_id,
        job_category: category,
        job_name,
        status,
        started_at: Some(started_at),
        completed_at: Some(completed_at),
        duration_seconds,
        records_processed,
        records_success,
        records_failed,
        error_message,
        artifacts: Vec::new(),
        kpis: serde_json::Value::Null,
        logs,
    };
    result.kpis = result_kpis(&result);
    result
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    use rollout_core::adapter::{
        AdapterError, ApiResponse, ApiStatus, DataLoadResult, SystemAdapter, TableOpResult,
    };
    use rollout_core::handler::HandlerContext;
    use serde_json::{json, Value};

    /// How the mock adapter answers `load_data`.
    pub enum LoadBehavior {
        AllLoaded,
        Partial(u64),
        NoneLoaded,
    }

    /// Scriptable in-memory adapter for handler tests.
    pub struct MockAdapter {
        pub table_writes: Mutex<Vec<(String, HashMap<String, Value>, HashMap<String, Value>)>>,
        pub failing_tables: Vec<String>,
        pub load_behavior: LoadBehavior,
        pub api_statuses: HashMap<String, u16>,
        pub api_data: HashMap<String, Value>,
        pub remote_return_type: String,
        pub table_rows: HashMap<String, Vec<HashMap<String, Value>>>,
    }

    impl Default for MockAdapter {
        fn default() -> Self {
            Self {
                table_writes: Mutex::new(Vec::new()),
                failing_tables: Vec::new(),
                load_behavior: LoadBehavior::AllLoaded,
                api_statuses: HashMap::new(),
                api_data: HashMap::new(),
                remote_return_type: "S".to_string(),
                table_rows: HashMap::new(),
            }
        }
    }

    impl SystemAdapter for MockAdapter {
        fn system_id(&self) -> &str {
            "DEV"
        }
        fn client(&self) -> &str {
            "100"
        }
        fn connect(&self) -> Result<bool, AdapterError> {
            Ok(true)
        }
        fn disconnect(&self) -> Result<(), AdapterError> {
            Ok(())
        }
        fn set_table(
            &self,
            table: &str,
            key: &HashMap<String, Value>,
            values: &HashMap<String, Value>,
        ) -> TableOpResult {
            let failing = self.failing_tables.iter().any(|t| t == table);
            if !failing {
                self.table_writes
                    .lock()
                    .unwrap()
                    .push((table.to_string(), key.clone(), values.clone()));
            }
            TableOpResult {
                success: !failing,
                table: table.to_string(),
                operation: "insert".to_string(),
                key: key.clone(),
                message: if failing {
                    format!("table {table} rejected write")
                } else {
                    String::new()
                },
                affected_rows: u64::from(!failing),
            }
        }
        fn get_table(
            &self,
            table: &str,
            _key: Option<&HashMap<String, Value>>,
            _fields: Option<&[String]>,
        ) -> Vec<HashMap<String, Value>> {
            self.table_rows.get(table).cloned().unwrap_or_default()
        }
        fn delete_table(&self, table: &str, key: &HashMap<String, Value>) -> TableOpResult {
            TableOpResult {
                success: true,
                table: table.to_string(),
                operation: "delete".to_string(),
                key: key.clone(),
                message: String::new(),
                affected_rows: 1,
            }
        }
        fn load_data(
            &self,
            object_type: &str,
            records: &[HashMap<String, Value>],
            _mapping: &HashMap<String, String>,
        ) -> DataLoadResult {
            let total = records.len() as u64;
            let loaded = match self.load_behavior {
                LoadBehavior::AllLoaded => total,
                LoadBehavior::Partial(n) => n.min(total),
                LoadBehavior::NoneLoaded => 0,
            };
            DataLoadResult {
                success: loaded == total && total > 0,
                object_type: object_type.to_string(),
                records_total: total,
                records_loaded: loaded,
                records_failed: total - loaded,
                errors: Vec::new(),
                reconciliation: Value::Null,
            }
        }
        fn call_api(
            &self,
            endpoint: &str,
            _method: &str,
            _params: Option<&HashMap<String, Value>>,
            _body: Option<&Value>,
        ) -> ApiResponse {
            let status_code = self.api_statuses.get(endpoint).copied().unwrap_or(200);
            ApiResponse {
                status: if status_code < 400 {
                    ApiStatus::Success
                } else {
                    ApiStatus::Error
                },
                status_code,
                data: self.api_data.get(endpoint).cloned(),
                error_message: (status_code >= 400).then(|| format!("status {status_code}")),
                duration_ms: 1.0,
            }
        }
        fn call_remote_function(&self, _name: &str, _params: &HashMap<String, Value>) -> Value {
            json!({"RETURN": {"TYPE": self.remote_return_type, "MESSAGE": ""}})
        }
        fn state(&self) -> Value {
            Value::Null
        }
        fn reset(&self) {}
    }

    pub fn context(adapter: Arc<MockAdapter>) -> HandlerContext {
        HandlerContext {
            run_id: "run_test".to_string(),
            adapter,
            artifacts_path: PathBuf::from("artifacts/run_test"),
            project_name: "Alpha".to_string(),
            customer: "ACME".to_string(),
            target_system: "DEV".to_string(),
            client: "100".to_string(),
            shared: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}
