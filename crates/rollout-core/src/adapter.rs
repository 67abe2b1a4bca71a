//! System adapter contract.
//!
//! Handlers talk to a target system exclusively through [`SystemAdapter`].
//! Call outcomes are surfaced through the result structs, not through
//! errors: a failed table write is a `TableOpResult { success: false, .. }`,
//! not an `Err`. [`AdapterError`] is reserved for adapter lifecycle
//! problems (creation, disconnect).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("no adapter available for system '{0}'")]
    UnknownSystem(String),
    #[error("adapter for system '{system_id}' failed: {message}")]
    Lifecycle { system_id: String, message: String },
}

/// Result status of an API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiStatus {
    Success,
    Error,
    NotFound,
    Unauthorized,
}

/// Result of a table operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableOpResult {
    pub success: bool,
    pub table: String,
    /// insert, update or delete
    pub operation: String,
    pub key: HashMap<String, Value>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub affected_rows: u64,
}

/// Result of a bulk data load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataLoadResult {
    pub success: bool,
    pub object_type: String,
    pub records_total: u64,
    pub records_loaded: u64,
    pub records_failed: u64,
    #[serde(default)]
    pub errors: Vec<Value>,
    #[serde(default)]
    pub reconciliation: Value,
}

/// Response from an API call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: ApiStatus,
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub duration_ms: f64,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status == ApiStatus::Success
    }
}

/// Connection to one target system.
///
/// All methods are synchronous and blocking; implementations take `&self`
/// and manage their own interior mutability so one adapter can be shared
/// across a run.
pub trait SystemAdapter: Send + Sync {
    /// System identifier this adapter is bound to (e.g. DEV, QAS).
    fn system_id(&self) -> &str;

    /// Client number on the target system.
    fn client(&self) -> &str;

    /// Establish the connection. `Ok(false)` means the system refused.
    fn connect(&self) -> Result<bool, AdapterError>;

    /// Close the connection.
    fn disconnect(&self) -> Result<(), AdapterError>;

    /// Insert or update a table entry.
    fn set_table(
        &self,
        table: &str,
        key: &HashMap<String, Value>,
        values: &HashMap<String, Value>,
    ) -> TableOpResult;

    /// Read table entries, optionally filtered by key and projected to
    /// a field list.
    fn get_table(
        &self,
        table: &str,
        key: Option<&HashMap<String, Value>>,
        fields: Option<&[String]>,
    ) -> Vec<HashMap<String, Value>>;

    /// Delete a table entry.
    fn delete_table(&self, table: &str, key: &HashMap<String, Value>) -> TableOpResult;

    /// Bulk-load records of one object type, applying a field mapping.
    fn load_data(
        &self,
        object_type: &str,
        records: &[HashMap<String, Value>],
        mapping: &HashMap<String, String>,
    ) -> DataLoadResult;

    /// Call an HTTP-style API endpoint on the target system.
    fn call_api(
        &self,
        endpoint: &str,
        method: &str,
        params: Option<&HashMap<String, Value>>,
        body: Option<&Value>,
    ) -> ApiResponse;

    /// Invoke a remote function module and return its structured result.
    fn call_remote_function(&self, name: &str, params: &HashMap<String, Value>) -> Value;

    /// Snapshot of the adapter's internal state, for auditing.
    fn state(&self) -> Value;

    /// Reset internal state.
    fn reset(&self);
}

/// Creates adapters for target systems.
///
/// An explicit factory object is passed to the executor; there is no
/// process-wide adapter registry.
pub trait AdapterFactory: Send + Sync {
    fn create(
        &self,
        system_id: &str,
        client: &str,
    ) -> Result<Box<dyn SystemAdapter>, AdapterError>;
}
