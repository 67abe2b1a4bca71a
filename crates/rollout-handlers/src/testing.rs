//! Testing handler.
//!
//! Runs a suite of independent test cases against the target system.
//! Case types: api, bapi, process, data, integration. The suite fails
//! only when every case fails.

use std::collections::HashMap;

use chrono::Utc;
use rand::Rng;
use serde_json::{json, Value};

use rollout_core::handler::{HandlerContext, JobHandler};
use rollout_core::types::{JobCategory, JobResult, JobStatus};

use crate::build_result;

const SUPPORTED_TYPES: [&str; 5] = ["api", "bapi", "process", "data", "integration"];

struct CaseOutcome {
    passed: bool,
    error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TestingHandler;

impl TestingHandler {
    pub fn new() -> Self {
        Self
    }

    fn execute_case(&self, context: &HandlerContext, case: &Value) -> CaseOutcome {
        match case["type"].as_str().unwrap_or("api") {
            "api" => self.test_api(context, case),
            "bapi" => self.test_bapi(context, case),
            "process" => self.test_process(case),
            "data" => self.test_data(context, case),
            "integration" => self.test_integration(context),
            other => CaseOutcome {
                passed: false,
                error: Some(format!("Unknown test type: {other}")),
            },
        }
    }

    fn test_api(&self, context: &HandlerContext, case: &Value) -> CaseOutcome {
        let endpoint = case["endpoint"].as_str().unwrap_or("/sap/health");
        let method = case["method"].as_str().unwrap_or("GET");
        let expected_status = case["expected_status"].as_u64().unwrap_or(200) as u16;

        let params = case["params"].as_object().map(|m| {
            m.iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<HashMap<String, Value>>()
        });
        let body = case.get("data");
        let response = context
            .adapter
            .call_api(endpoint, method, params.as_ref(), body);

        let mut passed = response.status_code == expected_status;

        // Compare the expected subset of the response payload.
        if passed {
            if let (Some(expected), Some(data)) =
                (case["expected_data"].as_object(), response.data.as_ref())
            {
                for (key, expected_value) in expected {
                    if data.get(key) != Some(expected_value) {
                        passed = false;
                        break;
                    }
                }
            }
        }

        CaseOutcome {
            passed,
            error: (!passed).then(|| {
                response.error_message.unwrap_or_else(|| {
                    format!(
                        "expected status {expected_status}, got {}",
                        response.status_code
                    )
                })
            }),
        }
    }

    fn test_bapi(&self, context: &HandlerContext, case: &Value) -> CaseOutcome {
        let name = case["bapi"].as_str().unwrap_or("BAPI_TRANSACTION_COMMIT");
        let params: HashMap<String, Value> = case["params"]
            .as_object()
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();

        let result = context.adapter.call_remote_function(name, &params);
        let return_info = &result["RETURN"];
        let return_type = return_info["TYPE"].as_str().unwrap_or("S");
        let passed = matches!(return_type, "S" | "W" | "I");

        CaseOutcome {
            passed,
            error: (!passed)
                .then(|| return_info["MESSAGE"].as_str().unwrap_or_default().to_string()),
        }
    }

    /// Process smoke test, simulated step by step.
    fn test_process(&self, case: &Value) -> CaseOutcome {
        let process = case["process"].as_str().unwrap_or("ORDER_TO_CASH");
        let configured: Vec<String> = case["steps"]
            .as_array()
            .map(|steps| {
                steps
                    .iter()
                    .map(|s| s["name"].as_str().unwrap_or("Step").to_string())
                    .collect()
            })
            .unwrap_or_default();
        let steps = if configured.is_empty() {
            default_process_steps(process)
        } else {
            configured
        };

        let mut rng = rand::thread_rng();
        let mut failed = 0;
        for _step in &steps {
            if rng.gen::<f64>() > 0.95 {
                failed += 1;
            }
        }

        CaseOutcome {
            passed: failed == 0,
            error: (failed > 0).then(|| format!("{failed} process step(s) failed")),
        }
    }

    fn test_data(&self, context: &HandlerContext, case: &Value) -> CaseOutcome {
        let table = case["table"].as_str().unwrap_or("T001");
        let expected_count = case["expected_count"].as_u64();
        let expected_key: Option<HashMap<String, Value>> = case["expected_key"]
            .as_object()
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect());

        let rows = context
            .adapter
            .get_table(table, expected_key.as_ref(), None);
        let actual_count = rows.len() as u64;

        let mut errors = Vec::new();
        if let Some(expected) = expected_count {
            if actual_count < expected {
                errors.push(format!(
                    "Expected at least {expected} records, found {actual_count}"
                ));
            }
        }
        if expected_key.is_some() && rows.is_empty() {
            errors.push(format!("Expected key {:?} not found", case["expected_key"]));
        }

        CaseOutcome {
            passed: errors.is_empty(),
            error: (!errors.is_empty()).then(|| errors.join("; ")),
        }
    }

    fn test_integration(&self, context: &HandlerContext) -> CaseOutcome {
        let response = context.adapter.call_api("/sap/health", "GET", None, None);
        let passed = response.status_code == 200;
        CaseOutcome {
            passed,
            error: (!passed).then(|| "connectivity check failed".to_string()),
        }
    }
}

impl JobHandler for TestingHandler {
    fn category(&self) -> JobCategory {
        JobCategory::Testing
    }

    fn validate(&self, config: &Value) -> Vec<String> {
        let mut errors = Vec::new();

        if config.get("id").is_none() {
            errors.push("Test suite must have 'id'".to_string());
        }

        match config.get("cases") {
            None => errors.push("Test suite must have 'cases'".to_string()),
            Some(cases) => match cases.as_array() {
                None => errors.push("'cases' must be a list".to_string()),
                Some(cases) => {
                    for (i, case) in cases.iter().enumerate() {
                        if case.get("id").is_none() {
                            errors.push(format!("Test case {i} missing 'id'"));
                        }
                        match case.get("type").and_then(Value::as_str) {
                            None => errors.push(format!("Test case {i} missing 'type'")),
                            Some(case_type) if !SUPPORTED_TYPES.contains(&case_type) => {
                                errors.push(format!(
                                    "Test case {i}: Unknown type '{case_type}'. Supported: {SUPPORTED_TYPES:?}"
                                ));
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
        let suite_id = config["id"].as_str().unwrap_or("UNKNOWN").to_string();
        let mut logs = Vec::new();

        logs.push(context.log_info(format!("Starting test suite: {suite_id}")));

        let empty = Vec::new();
        let cases = config["cases"].as_array().unwrap_or(&empty);
        let total_tests = cases.len() as u64;
        let mut passed_tests = 0u64;
        let mut failed_tests = 0u64;

        for (i, case) in cases.iter().enumerate() {
            let case_id = case["id"].as_str().map_or_else(
                || format!("test_{i}"),
                ToString::to_string,
            );
            let case_type = case["type"].as_str().unwrap_or("api");
            logs.push(context.log_info(format!(
                "Running test {}/{total_tests}: {case_id} ({case_type})",
                i + 1
            )));

            let outcome = self.execute_case(context, case);
            if outcome.passed {
                passed_tests += 1;
                logs.push(context.log_info(format!("Test {case_id}: PASSED")));
            } else {
                failed_tests += 1;
                logs.push(context.log_error(format!(
                    "Test {case_id}: FAILED - {}",
                    outcome.error.as_deref().unwrap_or("Unknown")
                )));
            }
        }

        let status = if failed_tests == 0 {
            logs.push(context.log_info(format!(
                "Test suite {suite_id} completed: {passed_tests}/{total_tests} passed"
            )));
            JobStatus::Completed
        } else if passed_tests > 0 {
            // Partial pass still counts as completed.
            logs.push(context.log_warn(format!(
                "Test suite {suite_id}: {passed_tests} passed, {failed_tests} failed"
            )));
            JobStatus::Completed
        } else {
            logs.push(context.log_error(format!("Test suite {suite_id}: All tests failed")));
            JobStatus::Failed
        };

        let pass_rate = if total_tests > 0 {
            (passed_tests as f64 / total_tests as f64 * 10000.0).round() / 100.0
        } else {
            0.0
        };
        context.share(
            format!("testing_{suite_id}"),
            json!({
                "passed": passed_tests,
                "failed": failed_tests,
                "total": total_tests,
                "pass_rate": pass_rate,
            }),
        );

        build_result(
            JobCategory::Testing,
            format!("test_{suite_id}"),
            format!("Testing: {suite_id}"),
            status,
            started_at,
            total_tests,
            passed_tests,
            failed_tests,
            None,
            logs,
        )
    }
}

fn default_process_steps(process: &str) -> Vec<String> {
    let steps: &[&str] = match process {
        "ORDER_TO_CASH" => &[
            "Create Sales Order",
            "Check Availability",
            "Create Delivery",
            "Post Goods Issue",
            "Create Invoice",
            "Post Payment",
        ],
        "PROCURE_TO_PAY" => &[
            "Create Purchase Requisition",
            "Create Purchase Order",
            "Goods Receipt",
            "Invoice Verification",
            "Payment Processing",
        ],
        "RECORD_TO_REPORT" => &[
            "Post Journal Entry",
            "Run Depreciation",
            "Period Close",
            "Generate Reports",
        ],
        "HIRE_TO_RETIRE" => &["Create Employee", "Assign Position", "Process Payroll"],
        _ => &["Initialize", "Execute", "Validate"],
    };
    steps.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{context, MockAdapter};
    use std::sync::Arc;

    #[test]
    fn validate_rejects_bad_cases() {
        let handler = TestingHandler::new();
        let errors = handler.validate(&json!({}));
        assert!(errors.contains(&"Test suite must have 'id'".to_string()));
        assert!(errors.contains(&"Test suite must have 'cases'".to_string()));

        let errors = handler.validate(&json!({
            "id": "S1",
            "cases": [
                {"type": "api"},
                {"id": "t2", "type": "quantum"},
                {"id": "t3"}
            ]
        }));
        assert!(errors.contains(&"Test case 0 missing 'id'".to_string()));
        assert!(errors.iter().any(|e| e.starts_with("Test case 1: Unknown type 'quantum'")));
        assert!(errors.contains(&"Test case 2 missing 'type'".to_string()));
    }

    #[test]
    fn api_case_checks_status_and_expected_data() {
        let adapter = Arc::new(MockAdapter {
            api_data: HashMap::from([(
                "/sap/health".to_string(),
                json!({"status": "UP", "client": "100"}),
            )]),
            ..Default::default()
        });
        let ctx = context(adapter);
        let config = json!({
            "id": "SMOKE",
            "cases": [
                {"id": "health", "type": "api", "endpoint": "/sap/health",
                 "expected_status": 200, "expected_data": {"status": "UP"}},
                {"id": "wrong", "type": "api", "endpoint": "/sap/health",
                 "expected_status": 200, "expected_data": {"status": "DOWN"}}
            ]
        });

        let result = TestingHandler::new().execute(&ctx, &config);
        // One pass, one fail: partial success, suite completed.
        assert_eq!(result.status, JobStatus::Completed);
        assert_eq!(result.records_success, 1);
        assert_eq!(result.records_failed, 1);

        let shared = ctx.shared_value("testing_SMOKE").unwrap();
        assert_eq!(shared["pass_rate"], json!(50.0));
    }

    #[test]
    fn all_cases_failing_fails_the_suite() {
        let adapter = Arc::new(MockAdapter {
            api_statuses: HashMap::from([("/missing".to_string(), 404u16)]),
            ..Default::default()
        });
        let ctx = context(adapter);
        let config = json!({
            "id": "S1",
            "cases": [
                {"id": "t1", "type": "api", "endpoint": "/missing", "expected_status": 200}
            ]
        });

        let result = TestingHandler::new().execute(&ctx, &config);
        assert_eq!(result.status, JobStatus::Failed);
        assert_eq!(result.records_success, 0);
    }

    #[test]
    fn bapi_case_passes_on_warning_type() {
        let adapter = Arc::new(MockAdapter {
            remote_return_type: "W".to_string(),
            ..Default::default()
        });
        let ctx = context(adapter);
        let config = json!({
            "id": "S1",
            "cases": [{"id": "commit", "type": "bapi", "bapi": "BAPI_TRANSACTION_COMMIT"}]
        });

        let result = TestingHandler::new().execute(&ctx, &config);
        assert_eq!(result.status, JobStatus::Completed);
    }

    #[test]
    fn data_case_verifies_row_counts() {
        let row = HashMap::from([("BUKRS".to_string(), json!("1000"))]);
        let adapter = Arc::new(MockAdapter {
            table_rows: HashMap::from([("T001".to_string(), vec![row])]),
            ..Default::default()
        });
        let ctx = context(adapter);
        let config = json!({
            "id": "S1",
            "cases": [
                {"id": "company-codes", "type": "data", "table": "T001", "expected_count": 1},
                {"id": "too-many", "type": "data", "table": "T001", "expected_count": 5}
            ]
        });

        let result = TestingHandler::new().execute(&ctx, &config);
        assert_eq!(result.records_success, 1);
        assert_eq!(result.records_failed, 1);
    }

    #[test]
    fn integration_case_uses_health_endpoint() {
        let adapter = Arc::new(MockAdapter::default());
        let ctx = context(adapter);
        let config = json!({
            "id": "S1",
            "cases": [{"id": "conn", "type": "integration"}]
        });
        let result = TestingHandler::new().execute(&ctx, &config);
        assert_eq!(result.status, JobStatus::Completed);
    }
}
