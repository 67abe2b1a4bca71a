//! Customizing handler.
//!
//! Executes a package of configuration steps against the target system:
//! table entries, remote function calls, parameter settings and report
//! runs. A step failure never aborts the package; the package fails only
//! when every step failed.

use std::collections::HashMap;

use chrono::Utc;
use serde_json::{json, Map, Value};

use rollout_core::adapter::SystemAdapter;
use rollout_core::handler::{HandlerContext, JobHandler};
use rollout_core::types::{JobCategory, JobResult, JobStatus};

use crate::build_result;

const SUPPORTED_ACTIONS: [&str; 4] = ["set_table", "call_bapi", "set_parameter", "execute_report"];

/// Outcome of one customizing step.
struct StepOutcome {
    success: bool,
    message: String,
}

#[derive(Debug, Clone, Default)]
pub struct CustomizingHandler;

impl CustomizingHandler {
    pub fn new() -> Self {
        Self
    }

    fn execute_step(&self, adapter: &dyn SystemAdapter, step: &Value) -> StepOutcome {
        match step["action"].as_str() {
            Some("set_table") => self.set_table(adapter, step),
            Some("call_bapi") => self.call_bapi(adapter, step),
            Some("set_parameter") => self.set_parameter(adapter, step),
            Some("execute_report") => self.execute_report(adapter, step),
            other => StepOutcome {
                success: false,
                message: format!("Unknown action: {}", other.unwrap_or("none")),
            },
        }
    }

    fn set_table(&self, adapter: &dyn SystemAdapter, step: &Value) -> StepOutcome {
        let table = step["table"].as_str().unwrap_or_default();
        let key = value_map(&step["key"]);
        let values = value_map(&step["values"]);
        let result = adapter.set_table(table, &key, &values);
        StepOutcome {
            success: result.success,
            message: result.message,
        }
    }

    fn call_bapi(&self, adapter: &dyn SystemAdapter, step: &Value) -> StepOutcome {
        let name = step["bapi"].as_str().unwrap_or_default();
        let params = value_map(&step["params"]);
        let result = adapter.call_remote_function(name, &params);
        let return_info = &result["RETURN"];
        let return_type = return_info["TYPE"].as_str().unwrap_or("S");
        StepOutcome {
            success: matches!(return_type, "S" | "W" | "I"),
            message: return_info["MESSAGE"].as_str().unwrap_or_default().to_string(),
        }
    }

    fn set_parameter(&self, adapter: &dyn SystemAdapter, step: &Value) -> StepOutcome {
        let name = step["parameter"].as_str().unwrap_or("UNKNOWN");
        let value = &step["value"];
        let key = HashMap::from([("PARAMID".to_string(), json!(name))]);
        let values = HashMap::from([("PARVAL".to_string(), json!(display_value(value)))]);
        let result = adapter.set_table("TPARA", &key, &values);
        StepOutcome {
            success: result.success,
            message: format!("Parameter {name} set to {}", display_value(value)),
        }
    }

    fn execute_report(&self, adapter: &dyn SystemAdapter, step: &Value) -> StepOutcome {
        let report = step["report"].as_str().unwrap_or("UNKNOWN");
        let variant = step["variant"].as_str().unwrap_or_default();
        let response = adapter.call_api(
            &format!("/sap/bc/bsp/sap/zbsp_report/{report}"),
            "POST",
            None,
            Some(&json!({"variant": variant})),
        );
        StepOutcome {
            success: response.status_code == 200,
            message: format!("Report {report} executed"),
        }
    }
}

impl JobHandler for CustomizingHandler {
    fn category(&self) -> JobCategory {
        JobCategory::Customizing
    }

    fn validate(&self, config: &Value) -> Vec<String> {
        let mut errors = Vec::new();

        if config.get("id").is_none() {
            errors.push("Customizing package must have 'id'".to_string());
        }

        match config.get("steps") {
            None => errors.push("Customizing package must have 'steps'".to_string()),
            Some(steps) => match steps.as_array() {
                None => errors.push("'steps' must be a list".to_string()),
                Some(steps) => {
                    for (i, step) in steps.iter().enumerate() {
                        let action = step.get("action").and_then(Value::as_str);
                        match action {
                            None => errors.push(format!("Step {i} missing 'action'")),
                            Some(action) if !SUPPORTED_ACTIONS.contains(&action) => {
                                errors.push(format!(
                                    "Step {i}: Unknown action '{action}'. Supported: {SUPPORTED_ACTIONS:?}"
                                ));
                            }
                            _ => {}
                        }
                        match action {
                            Some("set_table") => {
                                if step.get("table").is_none() {
                                    errors.push(format!("Step {i}: set_table requires 'table'"));
                                }
                                if step.get("key").is_none() {
                                    errors.push(format!("Step {i}: set_table requires 'key'"));
                                }
                            }
                            Some("call_bapi") => {
                                if step.get("bapi").is_none() {
                                    errors.push(format!("Step {i}: call_bapi requires 'bapi'"));
                                }
                            }
                            _ => {}
                        }
                    }
                }
            },
        }

        errors
    }

    fn execute(&self, context: &HandlerContext, config: &Value) -> JobResult {
        let started_at = Utc::now();
        let package_id = config["id"].as_str().unwrap_or("UNKNOWN").to_string();
        let mut logs = Vec::new();

        logs.push(context.log_info(format!("Starting customizing package: {package_id}")));

        let empty = Vec::new();
        let steps = config["steps"].as_array().unwrap_or(&empty);
        let total_steps = steps.len() as u64;
        let mut successful_steps = 0u64;
        let mut failed_steps = 0u64;

        for (i, step) in steps.iter().enumerate() {
            let step_num = i + 1;
            let action = step["action"].as_str().unwrap_or("unknown");
            logs.push(context.log_info(format!(
                "Executing step {step_num}/{total_steps}: {action}"
            )));

            let outcome = self.execute_step(context.adapter.as_ref(), step);
            if outcome.success {
                successful_steps += 1;
                logs.push(context.log_info(format!("Step {step_num} completed successfully")));
            } else {
                failed_steps += 1;
                let message = if outcome.message.is_empty() {
                    "Unknown error".to_string()
                } else {
                    outcome.message
                };
                logs.push(context.log_error(format!("Step {step_num} failed: {message}")));
            }
        }

        let status = if failed_steps == 0 {
            logs.push(context.log_info(format!(
                "Package {package_id} completed: {successful_steps}/{total_steps} steps"
            )));
            JobStatus::Completed
        } else if successful_steps > 0 {
            // Partial success still counts as completed.
            logs.push(context.log_warn(format!(
                "Package {package_id} partially completed: {successful_steps} success, {failed_steps} failed"
            )));
            JobStatus::Completed
        } else {
            logs.push(context.log_error(format!("Package {package_id} failed completely")));
            JobStatus::Failed
        };

        context.share(
            format!("customizing_{package_id}"),
            json!({
                "success": failed_steps == 0,
                "steps_executed": total_steps,
            }),
        );

        build_result(
            JobCategory::Customizing,
            format!("cust_{package_id}"),
            format!("Customizing: {package_id}"),
            status,
            started_at,
            total_steps,
            successful_steps,
            failed_steps,
            None,
            logs,
        )
    }
}

fn value_map(value: &Value) -> HashMap<String, Value> {
    value
        .as_object()
        .map(|m: &Map<String, Value>| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{context, MockAdapter};
    use std::sync::Arc;

    #[test]
    fn validate_rejects_missing_fields() {
        let handler = CustomizingHandler::new();
        let errors = handler.validate(&json!({}));
        assert!(errors.contains(&"Customizing package must have 'id'".to_string()));
        assert!(errors.contains(&"Customizing package must have 'steps'".to_string()));

        let errors = handler.validate(&json!({
            "id": "P1",
            "steps": [
                {"action": "set_table"},
                {"action": "call_bapi"},
                {"action": "teleport"},
                {}
            ]
        }));
        assert!(errors.contains(&"Step 0: set_table requires 'table'".to_string()));
        assert!(errors.contains(&"Step 0: set_table requires 'key'".to_string()));
        assert!(errors.contains(&"Step 1: call_bapi requires 'bapi'".to_string()));
        assert!(errors.iter().any(|e| e.starts_with("Step 2: Unknown action 'teleport'")));
        assert!(errors.contains(&"Step 3 missing 'action'".to_string()));
    }

    #[test]
    fn all_steps_succeed() {
        let adapter = Arc::new(MockAdapter::default());
        let ctx = context(Arc::clone(&adapter));
        let config = json!({
            "id": "FI_BASE",
            "steps": [
                {"action": "set_table", "table": "T001", "key": {"BUKRS": "1000"}, "values": {"BUTXT": "ACME AG"}},
                {"action": "call_bapi", "bapi": "BAPI_TRANSACTION_COMMIT", "params": {}},
                {"action": "set_parameter", "parameter": "ND9", "value": "X"}
            ]
        });

        let result = CustomizingHandler::new().execute(&ctx, &config);
        assert_eq!(result.status, JobStatus::Completed);
        assert_eq!(result.records_processed, 3);
        assert_eq!(result.records_success, 3);
        assert_eq!(result.records_failed, 0);

        // set_parameter is simulated through the TPARA table.
        let writes = adapter.table_writes.lock().unwrap();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[1].0, "TPARA");
        assert_eq!(writes[1].2["PARVAL"], json!("X"));

        let shared = ctx.shared_value("customizing_FI_BASE").unwrap();
        assert_eq!(shared["success"], json!(true));
        assert_eq!(shared["steps_executed"], json!(3));
    }

    #[test]
    fn partial_step_failure_still_completes() {
        let adapter = Arc::new(MockAdapter {
            failing_tables: vec!["T001".to_string()],
            ..Default::default()
        });
        let ctx = context(Arc::clone(&adapter));
        let config = json!({
            "id": "P1",
            "steps": [
                {"action": "set_table", "table": "T001", "key": {"BUKRS": "1000"}},
                {"action": "call_bapi", "bapi": "BAPI_TRANSACTION_COMMIT"}
            ]
        });

        let result = CustomizingHandler::new().execute(&ctx, &config);
        assert_eq!(result.status, JobStatus::Completed);
        assert_eq!(result.records_success, 1);
        assert_eq!(result.records_failed, 1);
        let shared = ctx.shared_value("customizing_P1").unwrap();
        assert_eq!(shared["success"], json!(false));
    }

    #[test]
    fn every_step_failing_fails_the_package() {
        let adapter = Arc::new(MockAdapter {
            failing_tables: vec!["T001".to_string()],
            ..Default::default()
        });
        let ctx = context(adapter);
        let config = json!({
            "id": "P1",
            "steps": [
                {"action": "set_table", "table": "T001", "key": {"BUKRS": "1000"}}
            ]
        });

        let result = CustomizingHandler::new().execute(&ctx, &config);
        assert_eq!(result.status, JobStatus::Failed);
        assert_eq!(result.records_success, 0);
    }

    #[test]
    fn report_execution_uses_api() {
        let adapter = Arc::new(MockAdapter::default());
        let ctx = context(adapter);
        let config = json!({
            "id": "P1",
            "steps": [
                {"action": "execute_report", "report": "RFBILA00", "variant": "YE"}
            ]
        });
        let result = CustomizingHandler::new().execute(&ctx, &config);
        assert_eq!(result.status, JobStatus::Completed);
    }
}
