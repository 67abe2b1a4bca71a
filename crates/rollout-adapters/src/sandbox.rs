//! Sandbox target-system simulator.
//!
//! In-memory stand-in for a real enterprise system: typed table catalog
//! with composite keys, canned API endpoints and remote-function
//! responses, optional latency simulation and failure injection. Lets
//! the whole pipeline run end to end without any external system.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;
use rand::Rng;
use serde_json::{json, Value};
use tracing::{debug, info};

use rollout_core::adapter::{
    AdapterError, AdapterFactory, ApiResponse, ApiStatus, DataLoadResult, SystemAdapter,
    TableOpResult,
};

/// Simulated tables with their key fields.
const TABLE_DEFINITIONS: [(&str, &[&str]); 22] = [
    // FI
    ("T001", &["BUKRS"]),
    ("T001K", &["BUKRS", "KTOPL"]),
    ("SKA1", &["KTOPL", "SAKNR"]),
    ("SKB1", &["BUKRS", "SAKNR"]),
    ("T003", &["BLART"]),
    ("T007A", &["KALSM", "MWSKZ"]),
    ("T052", &["ZTERM"]),
    // CO
    ("CSKS", &["KOKRS", "KOSTL"]),
    ("CEPC", &["KOKRS", "PRCTR"]),
    ("CSKA", &["KTOPL", "KSTAR"]),
    // MM
    ("T001W", &["WERKS"]),
    ("T001L", &["WERKS", "LGORT"]),
    ("MARA", &["MATNR"]),
    ("MARC", &["MATNR", "WERKS"]),
    ("LFA1", &["LIFNR"]),
    // SD
    ("KNA1", &["KUNNR"]),
    ("TVKO", &["VKORG"]),
    ("TVTW", &["VTWEG"]),
    ("KNVV", &["KUNNR", "VKORG", "VTWEG", "SPART"]),
    // Business partner
    ("BUT000", &["PARTNER"]),
    ("BUT020", &["PARTNER", "ADDRNUMBER"]),
    ("BUT100", &["PARTNER", "RLTYP"]),
];

/// Migration object type to target table.
const OBJECT_TABLE_MAP: [(&str, &str); 7] = [
    ("BUSINESS_PARTNER", "BUT000"),
    ("CUSTOMER", "KNA1"),
    ("VENDOR", "LFA1"),
    ("MATERIAL", "MARA"),
    ("COST_CENTER", "CSKS"),
    ("PROFIT_CENTER", "CEPC"),
    ("GL_ACCOUNT", "SKA1"),
];

/// Tuning knobs for the simulator.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Sleep for realistic durations on each operation.
    pub simulate_latency: bool,
    /// Probability (0.0 - 1.0) that an operation fails.
    pub failure_rate: f64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            simulate_latency: true,
            failure_rate: 0.0,
        }
    }
}

impl SandboxConfig {
    /// Deterministic configuration: no latency, no injected failures.
    pub fn deterministic() -> Self {
        Self {
            simulate_latency: false,
            failure_rate: 0.0,
        }
    }
}

type Row = HashMap<String, Value>;

#[derive(Default)]
struct SandboxState {
    tables: HashMap<String, HashMap<String, Row>>,
    api_calls: Vec<Value>,
    migrations: Vec<String>,
    connected: bool,
    operation_count: u64,
}

/// In-memory simulator bound to one system id and client.
pub struct SandboxAdapter {
    system_id: String,
    client: String,
    config: SandboxConfig,
    state: Mutex<SandboxState>,
}

impl SandboxAdapter {
    pub fn new(system_id: impl Into<String>, client: impl Into<String>) -> Self {
        Self::with_config(system_id, client, SandboxConfig::default())
    }

    pub fn with_config(
        system_id: impl Into<String>,
        client: impl Into<String>,
        config: SandboxConfig,
    ) -> Self {
        let system_id = system_id.into();
        let client = client.into();
        info!(system_id, client, "sandbox adapter initialized");
        Self {
            system_id,
            client,
            config,
            state: Mutex::new(SandboxState::default()),
        }
    }

    fn sleep(&self, base_ms: u64, variance_ms: u64) {
        if self.config.simulate_latency {
            let jitter = rand::thread_rng().gen_range(0..=variance_ms * 2) as i64 - variance_ms as i64;
            let delay = (base_ms as i64 + jitter).max(10) as u64;
            std::thread::sleep(Duration::from_millis(delay));
        }
    }

    fn should_fail(&self) -> bool {
        self.config.failure_rate > 0.0 && rand::thread_rng().gen::<f64>() < self.config.failure_rate
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, SandboxState>, AdapterError> {
        self.state.lock().map_err(|_| AdapterError::Lifecycle {
            system_id: self.system_id.clone(),
            message: "state lock poisoned".to_string(),
        })
    }

    /// Composite key string from the table's declared key fields.
    fn make_key(table: &str, key: &Row) -> String {
        let key_fields = key_fields_for(table);
        key_fields
            .iter()
            .map(|f| {
                key.get(*f)
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Export the full simulator state, including table contents.
    pub fn export_state(&self) -> Value {
        let state = match self.state.lock() {
            Ok(s) => s,
            Err(_) => return Value::Null,
        };
        json!({
            "metadata": {
                "system_id": self.system_id,
                "client": self.client,
                "exported_at": Utc::now(),
                "operation_count": state.operation_count,
            },
            "tables": state.tables,
            "api_calls": state.api_calls.iter().rev().take(100).rev().collect::<Vec<_>>(),
            "migrations": state.migrations,
        })
    }

    /// Restore table contents from a previously exported state.
    pub fn import_state(&self, exported: &Value) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if let Some(tables) = exported["tables"].as_object() {
            state.tables = tables
                .iter()
                .map(|(table, rows)| {
                    let rows = rows
                        .as_object()
                        .map(|r| {
                            r.iter()
                                .filter_map(|(k, row)| {
                                    row.as_object().map(|row| {
                                        (
                                            k.clone(),
                                            row.iter()
                                                .map(|(f, v)| (f.clone(), v.clone()))
                                                .collect::<Row>(),
                                        )
                                    })
                                })
                                .collect()
                        })
                        .unwrap_or_default();
                    (table.clone(), rows)
                })
                .collect();
        }
    }
}

fn key_fields_for(table: &str) -> &'static [&'static str] {
    TABLE_DEFINITIONS
        .iter()
        .find(|(name, _)| *name == table)
        .map(|(_, fields)| *fields)
        .unwrap_or(&["KEY"])
}

fn target_table_for(object_type: &str) -> &str {
    OBJECT_TABLE_MAP
        .iter()
        .find(|(obj, _)| *obj == object_type)
        .map(|(_, table)| *table)
        .unwrap_or(object_type)
}

impl SystemAdapter for SandboxAdapter {
    fn system_id(&self) -> &str {
        &self.system_id
    }

    fn client(&self) -> &str {
        &self.client
    }

    fn connect(&self) -> Result<bool, AdapterError> {
        self.sleep(100, 50);
        if self.should_fail() {
            info!(system_id = %self.system_id, "simulated connection refusal");
            return Ok(false);
        }
        self.lock()?.connected = true;
        info!(system_id = %self.system_id, client = %self.client, "sandbox connected");
        Ok(true)
    }

    fn disconnect(&self) -> Result<(), AdapterError> {
        self.lock()?.connected = false;
        info!(system_id = %self.system_id, "sandbox disconnected");
        Ok(())
    }

    fn set_table(&self, table: &str, key: &Row, values: &Row) -> TableOpResult {
        self.sleep(30, 15);

        if self.should_fail() {
            return TableOpResult {
                success: false,
                table: table.to_string(),
                operation: "update".to_string(),
                key: key.clone(),
                message: "Simulated failure".to_string(),
                affected_rows: 0,
            };
        }

        let Ok(mut state) = self.state.lock() else {
            return TableOpResult {
                success: false,
                table: table.to_string(),
                operation: "update".to_string(),
                key: key.clone(),
                message: "state lock poisoned".to_string(),
                affected_rows: 0,
            };
        };
        state.operation_count += 1;

        let key_str = Self::make_key(table, key);
        let rows = state.tables.entry(table.to_string()).or_default();
        let operation = if rows.contains_key(&key_str) {
            "update"
        } else {
            "insert"
        };

        let mut entry: Row = key.clone();
        entry.extend(values.clone());
        entry.insert("_MODIFIED_AT".to_string(), json!(Utc::now()));
        entry.insert("_MODIFIED_BY".to_string(), json!("ROLLOUT"));
        rows.insert(key_str, entry);

        debug!(table, operation, "table write");
        TableOpResult {
            success: true,
            table: table.to_string(),
            operation: operation.to_string(),
            key: key.clone(),
            message: format!("Successfully {operation}ed entry"),
            affected_rows: 1,
        }
    }

    fn get_table(&self, table: &str, key: Option<&Row>, fields: Option<&[String]>) -> Vec<Row> {
        self.sleep(20, 10);

        let Ok(state) = self.state.lock() else {
            return Vec::new();
        };
        let Some(rows) = state.tables.get(table) else {
            return Vec::new();
        };

        let mut entries: Vec<Row> = rows
            .values()
            .filter(|row| {
                key.map_or(true, |key| key.iter().all(|(k, v)| row.get(k) == Some(v)))
            })
            .cloned()
            .collect();

        if let Some(fields) = fields {
            entries = entries
                .into_iter()
                .map(|row| {
                    fields
                        .iter()
                        .filter_map(|f| row.get(f).map(|v| (f.clone(), v.clone())))
                        .collect()
                })
                .collect();
        }

        entries
    }

    fn delete_table(&self, table: &str, key: &Row) -> TableOpResult {
        self.sleep(30, 15);

        let Ok(mut state) = self.state.lock() else {
            return TableOpResult {
                success: false,
                table: table.to_string(),
                operation: "delete".to_string(),
                key: key.clone(),
                message: "state lock poisoned".to_string(),
                affected_rows: 0,
            };
        };
        state.operation_count += 1;

        let key_str = Self::make_key(table, key);
        let (success, message, affected) = match state.tables.get_mut(table) {
            None => (false, "Table not found", 0),
            Some(rows) => {
                if rows.remove(&key_str).is_some() {
                    (true, "Entry deleted", 1)
                } else {
                    (false, "Entry not found", 0)
                }
            }
        };

        TableOpResult {
            success,
            table: table.to_string(),
            operation: "delete".to_string(),
            key: key.clone(),
            message: message.to_string(),
            affected_rows: affected,
        }
    }

    fn load_data(
        &self,
        object_type: &str,
        records: &[Row],
        mapping: &HashMap<String, String>,
    ) -> DataLoadResult {
        self.sleep(100 + records.len() as u64, 50);

        let target_table = target_table_for(object_type).to_string();
        let batch_id = format!("{object_type}_{}", Utc::now().format("%Y%m%d%H%M%S"));

        let mut records_loaded = 0u64;
        let mut records_failed = 0u64;
        let mut errors = Vec::new();

        {
            let Ok(mut state) = self.state.lock() else {
                return DataLoadResult {
                    success: false,
                    object_type: object_type.to_string(),
                    records_total: records.len() as u64,
                    records_loaded: 0,
                    records_failed: records.len() as u64,
                    errors: vec![json!({"error": "state lock poisoned"})],
                    reconciliation: Value::Null,
                };
            };

            for (i, record) in records.iter().enumerate() {
                if self.should_fail() {
                    records_failed += 1;
                    errors.push(json!({
                        "record_index": i,
                        "error": "Simulated validation failure",
                    }));
                    continue;
                }

                // Apply the mapping; with no usable mapping the record
                // is taken as already shaped for the target table.
                let mut mapped: Row = mapping
                    .iter()
                    .filter_map(|(source, target)| {
                        record.get(source).map(|v| (target.clone(), v.clone()))
                    })
                    .collect();
                if mapped.is_empty() {
                    mapped = record.clone();
                }

                let key: Row = key_fields_for(&target_table)
                    .iter()
                    .map(|f| {
                        let value = mapped
                            .get(*f)
                            .cloned()
                            .unwrap_or_else(|| json!(format!("AUTO_{i}")));
                        (f.to_string(), value)
                    })
                    .collect();
                let key_str = Self::make_key(&target_table, &key);

                mapped.insert("_LOADED_AT".to_string(), json!(Utc::now()));
                mapped.insert("_BATCH_ID".to_string(), json!(batch_id));

                state
                    .tables
                    .entry(target_table.clone())
                    .or_default()
                    .insert(key_str, mapped);
                records_loaded += 1;
            }

            state.migrations.push(object_type.to_string());
        }

        let total = records.len() as u64;
        info!(
            object_type,
            loaded = records_loaded,
            failed = records_failed,
            "data load"
        );

        DataLoadResult {
            success: records_failed == 0,
            object_type: object_type.to_string(),
            records_total: total,
            records_loaded,
            records_failed,
            errors,
            reconciliation: json!({
                "source_count": total,
                "target_count": records_loaded,
                "delta": total - records_loaded,
                "reconciled": records_loaded == total,
                "reconciliation_time": Utc::now(),
            }),
        }
    }

    fn call_api(
        &self,
        endpoint: &str,
        method: &str,
        params: Option<&Row>,
        body: Option<&Value>,
    ) -> ApiResponse {
        let start = Instant::now();
        self.sleep(50, 25);

        if let Ok(mut state) = self.state.lock() {
            state.api_calls.push(json!({
                "timestamp": Utc::now(),
                "endpoint": endpoint,
                "method": method,
                "params": params,
                "data": body,
            }));
        }

        if self.should_fail() {
            return ApiResponse {
                status: ApiStatus::Error,
                status_code: 500,
                data: None,
                error_message: Some("Simulated server error".to_string()),
                duration_ms: start.elapsed().as_secs_f64() * 1000.0,
            };
        }

        let data = match endpoint {
            "/sap/health" => json!({"status": "healthy", "version": "S/4HANA 2023"}),
            "/sap/opu/odata/sap/API_BUSINESS_PARTNER"
            | "/sap/opu/odata/sap/API_MATERIAL_DOCUMENT_SRV"
            | "/sap/opu/odata/sap/API_PURCHASEORDER_PROCESS_SRV" => json!({"d": {"results": []}}),
            _ if endpoint.starts_with("/sap") => json!({
                "d": {
                    "results": [],
                    "__metadata": {"uri": endpoint, "type": "SAP.Entity"},
                }
            }),
            _ => {
                return ApiResponse {
                    status: ApiStatus::NotFound,
                    status_code: 404,
                    data: None,
                    error_message: Some(format!("Endpoint not found: {endpoint}")),
                    duration_ms: start.elapsed().as_secs_f64() * 1000.0,
                };
            }
        };

        ApiResponse {
            status: ApiStatus::Success,
            status_code: 200,
            data: Some(data),
            error_message: None,
            duration_ms: start.elapsed().as_secs_f64() * 1000.0,
        }
    }

    fn call_remote_function(&self, name: &str, params: &Row) -> Value {
        self.sleep(100, 50);

        if self.should_fail() {
            return json!({
                "RETURN": {
                    "TYPE": "E",
                    "MESSAGE": "Simulated remote function error",
                    "NUMBER": "999",
                }
            });
        }

        match name {
            "BAPI_COMPANYCODE_GETDETAIL" => json!({
                "COMPANYCODE_DETAIL": {
                    "BUKRS": params.get("COMPANYCODE").cloned().unwrap_or(json!("1000")),
                    "BUTXT": "Demo Company",
                    "WAERS": "EUR",
                },
                "RETURN": {"TYPE": "S", "MESSAGE": "Success"},
            }),
            "BAPI_COSTCENTER_GETLIST" => json!({
                "COSTCENTER_LIST": [],
                "RETURN": {"TYPE": "S", "MESSAGE": "Success"},
            }),
            "BAPI_MATERIAL_GETLIST" => json!({
                "MATNRLIST": [],
                "RETURN": {"TYPE": "S", "MESSAGE": "Success"},
            }),
            "BAPI_TRANSACTION_COMMIT" => json!({
                "RETURN": {"TYPE": "S", "MESSAGE": "Transaction committed"},
            }),
            other => json!({
                "RETURN": {"TYPE": "S", "MESSAGE": format!("BAPI {other} executed")},
            }),
        }
    }

    fn state(&self) -> Value {
        let Ok(state) = self.state.lock() else {
            return Value::Null;
        };
        let tables: HashMap<&String, usize> = state
            .tables
            .iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(table, rows)| (table, rows.len()))
            .collect();
        json!({
            "system_id": self.system_id,
            "client": self.client,
            "connected": state.connected,
            "operation_count": state.operation_count,
            "tables": tables,
            "api_calls": state.api_calls.len(),
            "migrations": state.migrations,
        })
    }

    fn reset(&self) {
        if let Ok(mut state) = self.state.lock() {
            *state = SandboxState::default();
        }
        info!(system_id = %self.system_id, "sandbox reset");
    }
}

/// Creates sandbox adapters, all sharing one configuration.
#[derive(Debug, Clone, Default)]
pub struct SandboxAdapterFactory {
    config: SandboxConfig,
}

impl SandboxAdapterFactory {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }
}

impl AdapterFactory for SandboxAdapterFactory {
    fn create(
        &self,
        system_id: &str,
        client: &str,
    ) -> Result<Box<dyn SystemAdapter>, AdapterError> {
        Ok(Box::new(SandboxAdapter::with_config(
            system_id,
            client,
            self.config.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> SandboxAdapter {
        SandboxAdapter::with_config("DEV", "100", SandboxConfig::deterministic())
    }

    fn row(fields: &[(&str, &str)]) -> Row {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    #[test]
    fn set_then_get_round_trip_with_bookkeeping() {
        let sap = adapter();
        let result = sap.set_table(
            "T001",
            &row(&[("BUKRS", "1000")]),
            &row(&[("BUTXT", "ACME AG")]),
        );
        assert!(result.success);
        assert_eq!(result.operation, "insert");

        let rows = sap.get_table("T001", None, None);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["BUTXT"], json!("ACME AG"));
        assert!(rows[0].contains_key("_MODIFIED_AT"));
        assert_eq!(rows[0]["_MODIFIED_BY"], json!("ROLLOUT"));
    }

    #[test]
    fn second_write_to_same_key_is_an_update() {
        let sap = adapter();
        let key = row(&[("BUKRS", "1000")]);
        sap.set_table("T001", &key, &row(&[("BUTXT", "Old")]));
        let result = sap.set_table("T001", &key, &row(&[("BUTXT", "New")]));
        assert_eq!(result.operation, "update");
        assert_eq!(sap.get_table("T001", None, None).len(), 1);
    }

    #[test]
    fn composite_keys_keep_entries_apart() {
        let sap = adapter();
        sap.set_table(
            "CSKS",
            &row(&[("KOKRS", "1000"), ("KOSTL", "CC01")]),
            &row(&[("KTEXT", "First")]),
        );
        sap.set_table(
            "CSKS",
            &row(&[("KOKRS", "1000"), ("KOSTL", "CC02")]),
            &row(&[("KTEXT", "Second")]),
        );
        assert_eq!(sap.get_table("CSKS", None, None).len(), 2);

        let filtered = sap.get_table("CSKS", Some(&row(&[("KOSTL", "CC01")])), None);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0]["KTEXT"], json!("First"));
    }

    #[test]
    fn field_projection() {
        let sap = adapter();
        sap.set_table(
            "T001",
            &row(&[("BUKRS", "1000")]),
            &row(&[("BUTXT", "ACME AG"), ("WAERS", "EUR")]),
        );
        let fields = vec!["BUKRS".to_string(), "WAERS".to_string()];
        let rows = sap.get_table("T001", None, Some(&fields));
        assert_eq!(rows[0].len(), 2);
        assert_eq!(rows[0]["WAERS"], json!("EUR"));
    }

    #[test]
    fn delete_existing_and_missing() {
        let sap = adapter();
        let key = row(&[("BUKRS", "1000")]);
        sap.set_table("T001", &key, &row(&[("BUTXT", "ACME")]));
        assert!(sap.delete_table("T001", &key).success);
        let missing = sap.delete_table("T001", &key);
        assert!(!missing.success);
        assert_eq!(missing.message, "Entry not found");
    }

    #[test]
    fn load_data_maps_into_object_table() {
        let sap = adapter();
        let records = vec![
            row(&[("KUNNR", "0000000001"), ("NAME", "ACME")]),
            row(&[("KUNNR", "0000000002"), ("NAME", "Globex")]),
        ];
        let mapping = HashMap::from([
            ("KUNNR".to_string(), "KUNNR".to_string()),
            ("NAME".to_string(), "NAME1".to_string()),
        ]);

        let result = sap.load_data("CUSTOMER", &records, &mapping);
        assert!(result.success);
        assert_eq!(result.records_loaded, 2);
        assert_eq!(result.reconciliation["reconciled"], json!(true));

        let rows = sap.get_table("KNA1", None, None);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].contains_key("_LOADED_AT"));
        assert!(rows[0].contains_key("_BATCH_ID"));
        assert!(rows.iter().any(|r| r["NAME1"] == json!("ACME")));
    }

    #[test]
    fn canned_and_generic_api_endpoints() {
        let sap = adapter();
        let health = sap.call_api("/sap/health", "GET", None, None);
        assert_eq!(health.status_code, 200);
        assert_eq!(health.data.unwrap()["status"], json!("healthy"));

        let generic = sap.call_api("/sap/opu/odata/sap/ZCUSTOM_SRV", "GET", None, None);
        assert_eq!(generic.status_code, 200);
        assert!(generic.data.unwrap()["d"]["__metadata"].is_object());

        let missing = sap.call_api("/unknown", "GET", None, None);
        assert_eq!(missing.status_code, 404);
        assert_eq!(missing.status, ApiStatus::NotFound);
    }

    #[test]
    fn remote_function_responses() {
        let sap = adapter();
        let params = row(&[("COMPANYCODE", "2000")]);
        let detail = sap.call_remote_function("BAPI_COMPANYCODE_GETDETAIL", &params);
        assert_eq!(detail["COMPANYCODE_DETAIL"]["BUKRS"], json!("2000"));
        assert_eq!(detail["RETURN"]["TYPE"], json!("S"));

        let unknown = sap.call_remote_function("Z_CUSTOM_FUNCTION", &Row::new());
        assert_eq!(
            unknown["RETURN"]["MESSAGE"],
            json!("BAPI Z_CUSTOM_FUNCTION executed")
        );
    }

    #[test]
    fn state_snapshot_and_reset() {
        let sap = adapter();
        sap.connect().unwrap();
        sap.set_table("T001", &row(&[("BUKRS", "1000")]), &Row::new());
        sap.call_api("/sap/health", "GET", None, None);

        let state = sap.state();
        assert_eq!(state["connected"], json!(true));
        assert_eq!(state["operation_count"], json!(1));
        assert_eq!(state["tables"]["T001"], json!(1));
        assert_eq!(state["api_calls"], json!(1));

        sap.reset();
        let state = sap.state();
        assert_eq!(state["operation_count"], json!(0));
        assert!(state["tables"].as_object().unwrap().is_empty());
    }

    #[test]
    fn export_import_round_trip() {
        let sap = adapter();
        sap.set_table("T001", &row(&[("BUKRS", "1000")]), &row(&[("BUTXT", "ACME")]));
        let exported = sap.export_state();
        assert_eq!(exported["metadata"]["system_id"], json!("DEV"));

        let fresh = adapter();
        fresh.import_state(&exported);
        let rows = fresh.get_table("T001", None, None);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["BUTXT"], json!("ACME"));
    }

    #[test]
    fn full_failure_rate_fails_operations() {
        let sap = SandboxAdapter::with_config(
            "DEV",
            "100",
            SandboxConfig {
                simulate_latency: false,
                failure_rate: 1.0,
            },
        );
        assert!(!sap.set_table("T001", &row(&[("BUKRS", "1000")]), &Row::new()).success);
        let api = sap.call_api("/sap/health", "GET", None, None);
        assert_eq!(api.status_code, 500);
        let remote = sap.call_remote_function("BAPI_TRANSACTION_COMMIT", &Row::new());
        assert_eq!(remote["RETURN"]["TYPE"], json!("E"));
        assert!(!sap.connect().unwrap());
    }
}
