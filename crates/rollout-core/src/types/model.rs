//! The validated project model.
//!
//! A [`ProjectModel`] is produced by the configuration parser and is the
//! single source of truth for a run. It is immutable after validation:
//! nothing downstream mutates it, the planner and executor only read it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Project metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
    pub customer: String,
    #[serde(default = "default_template")]
    pub template: String,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_template() -> String {
    "STANDARD".to_string()
}

fn default_version() -> String {
    "1.0.0".to_string()
}

/// A target system in the landscape (e.g. DEV, QAS, PRD).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    pub id: String,
    pub client: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// System landscape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Landscape {
    #[serde(default)]
    pub systems: Vec<SystemConfig>,
}

/// Company code organizational unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyCode {
    pub code: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

fn default_currency() -> String {
    "EUR".to_string()
}

/// Plant organizational unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plant {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_code: Option<String>,
}

/// Organizational structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrgConfig {
    #[serde(default)]
    pub company_codes: Vec<CompanyCode>,
    #[serde(default)]
    pub plants: Vec<Plant>,
}

/// Rollout scope (countries, modules, org units).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    #[serde(default = "default_country")]
    pub country: Vec<String>,
    #[serde(default = "default_modules")]
    pub modules: Vec<String>,
    #[serde(default)]
    pub org: OrgConfig,
}

impl Default for Scope {
    fn default() -> Self {
        Self {
            country: default_country(),
            modules: default_modules(),
            org: OrgConfig::default(),
        }
    }
}

fn default_country() -> Vec<String> {
    vec!["DE".to_string()]
}

fn default_modules() -> Vec<String> {
    vec!["FI".to_string(), "MM".to_string()]
}

/// Single customizing step (table entry, remote function call, ...).
///
/// `extra` catches any additional per-action fields so handlers can
/// interpret actions this model does not know about in detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomizingStep {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<HashMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<HashMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bapi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<HashMap<String, Value>>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Package of customizing steps executed together on one system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomizingPackage {
    pub id: String,
    #[serde(default = "default_target")]
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Vec<CustomizingStep>,
}

fn default_target() -> String {
    "DEV".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomizingConfig {
    #[serde(default)]
    pub packages: Vec<CustomizingPackage>,
}

/// Data migration object definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationObject {
    pub id: String,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "default_target")]
    pub target: String,
    #[serde(default)]
    pub mapping: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_rules: Option<Vec<String>>,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

fn default_source() -> String {
    "csv".to_string()
}

fn default_batch_size() -> u32 {
    1000
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationConfig {
    #[serde(default)]
    pub objects: Vec<MigrationObject>,
}

/// Individual test case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    #[serde(default = "default_test_type")]
    pub r#type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_data: Option<HashMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

fn default_test_type() -> String {
    "api".to_string()
}

fn default_method() -> String {
    "GET".to_string()
}

/// Test suite run against one target system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuite {
    pub id: String,
    #[serde(default = "default_target")]
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub cases: Vec<TestCase>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestingConfig {
    #[serde(default)]
    pub suites: Vec<TestSuite>,
}

/// Complete validated project model.
///
/// Drives all three phases of a run: customizing, migration, testing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectModel {
    pub project: ProjectInfo,
    #[serde(default)]
    pub landscape: Landscape,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub customizing: CustomizingConfig,
    #[serde(default)]
    pub migration: MigrationConfig,
    #[serde(default)]
    pub testing: TestingConfig,
}

impl ProjectModel {
    /// Look up the client number for a landscape system.
    pub fn client_for(&self, system_id: &str) -> Option<&str> {
        self.landscape
            .systems
            .iter()
            .find(|s| s.id == system_id)
            .map(|s| s.client.as_str())
    }
}
