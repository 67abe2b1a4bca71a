//! Configuration parser.
//!
//! Turns a raw YAML document into a validated [`ProjectModel`]. Validation
//! runs in strict stages: syntax, structure, schema coercion, semantics.
//! The first stage that produces errors wins, with all errors of that
//! stage reported at once.

use std::collections::HashSet;
use std::path::Path;

use serde_yaml::Value;
use thiserror::Error;
use tracing::info;

use crate::types::ProjectModel;

/// Error raised when a configuration document cannot be turned into a
/// valid project model. Always carries at least one message.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML syntax error: {0}")]
    Syntax(String),
    #[error("configuration validation failed: {}", .0.join("; "))]
    Structure(Vec<String>),
    #[error("model validation failed: {}", .0.join("; "))]
    Schema(Vec<String>),
    #[error("semantic validation failed: {}", .0.join("; "))]
    Semantic(Vec<String>),
    #[error("cannot read file: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Flatten the error into the discrete messages a caller can act on.
    pub fn messages(&self) -> Vec<String> {
        match self {
            ConfigError::Syntax(msg) => vec![format!("YAML syntax error: {msg}")],
            ConfigError::Structure(errors)
            | ConfigError::Schema(errors)
            | ConfigError::Semantic(errors) => errors.clone(),
            ConfigError::Io(err) => vec![format!("Cannot read file: {err}")],
        }
    }
}

/// Parser for rollout configuration documents.
#[derive(Debug, Clone, Default)]
pub struct ConfigParser;

impl ConfigParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a YAML document into a validated [`ProjectModel`].
    pub fn parse(&self, content: &str) -> Result<ProjectModel, ConfigError> {
        let raw = self.parse_yaml(content)?;

        let structure_errors = self.validate_structure(&raw);
        if !structure_errors.is_empty() {
            return Err(ConfigError::Structure(structure_errors));
        }

        let model: ProjectModel = serde_yaml::from_value(raw)
            .map_err(|e| ConfigError::Schema(vec![e.to_string()]))?;

        let semantic_errors = self.validate_semantics(&model);
        if !semantic_errors.is_empty() {
            return Err(ConfigError::Semantic(semantic_errors));
        }

        info!(project = %model.project.name, "parsed configuration");
        Ok(model)
    }

    /// Parse a configuration file from disk.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<ProjectModel, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        self.parse(&content)
    }

    /// Validate without constructing a model. Never fails, never has
    /// side effects.
    pub fn validate_only(&self, content: &str) -> (bool, Vec<String>) {
        match self.parse(content) {
            Ok(_) => (true, Vec::new()),
            Err(err) => (false, err.messages()),
        }
    }

    fn parse_yaml(&self, content: &str) -> Result<Value, ConfigError> {
        let value: Value =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Syntax(e.to_string()))?;
        match value {
            Value::Null => Err(ConfigError::Syntax("empty configuration".to_string())),
            Value::Mapping(_) => Ok(value),
            _ => Err(ConfigError::Syntax(
                "configuration must be a YAML mapping".to_string(),
            )),
        }
    }

    fn validate_structure(&self, raw: &Value) -> Vec<String> {
        let mut errors = Vec::new();

        match raw.get("project") {
            None => errors.push("Missing required section: 'project'".to_string()),
            Some(project) if !project.is_mapping() => {
                errors.push("Section 'project' must be a mapping".to_string());
            }
            Some(project) => {
                if project.get("name").is_none() {
                    errors.push("project.name is required".to_string());
                }
                if project.get("customer").is_none() {
                    errors.push("project.customer is required".to_string());
                }
            }
        }

        if let Some(landscape) = raw.get("landscape").filter(|v| v.is_mapping()) {
            if let Some(systems) = landscape.get("systems") {
                match systems.as_sequence() {
                    None => errors.push("landscape.systems must be a list".to_string()),
                    Some(systems) => {
                        for (i, system) in systems.iter().enumerate() {
                            if !system.is_mapping() {
                                errors.push(format!("landscape.systems[{i}] must be a mapping"));
                            } else if system.get("id").is_none() {
                                errors.push(format!("landscape.systems[{i}].id is required"));
                            }
                        }
                    }
                }
            }
        }

        if let Some(customizing) = raw.get("customizing").filter(|v| v.is_mapping()) {
            if let Some(packages) = customizing.get("packages") {
                match packages.as_sequence() {
                    None => errors.push("customizing.packages must be a list".to_string()),
                    Some(packages) => {
                        for (i, pkg) in packages.iter().enumerate() {
                            if !pkg.is_mapping() {
                                errors.push(format!("customizing.packages[{i}] must be a mapping"));
                            } else if pkg.get("id").is_none() {
                                errors.push(format!("customizing.packages[{i}].id is required"));
                            }
                        }
                    }
                }
            }
        }

        if let Some(migration) = raw.get("migration").filter(|v| v.is_mapping()) {
            if let Some(objects) = migration.get("objects") {
                if !objects.is_sequence() {
                    errors.push("migration.objects must be a list".to_string());
                }
            }
        }

        if let Some(testing) = raw.get("testing").filter(|v| v.is_mapping()) {
            if let Some(suites) = testing.get("suites") {
                if !suites.is_sequence() {
                    errors.push("testing.suites must be a list".to_string());
                }
            }
        }

        errors
    }

    fn validate_semantics(&self, model: &ProjectModel) -> Vec<String> {
        let mut errors = Vec::new();

        // Cross-reference targets against the landscape, but only when
        // systems are actually declared.
        let system_ids: HashSet<&str> = model
            .landscape
            .systems
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        if !system_ids.is_empty() {
            for pkg in &model.customizing.packages {
                if !system_ids.contains(pkg.target.as_str()) {
                    errors.push(format!(
                        "Customizing package '{}' references unknown system '{}'",
                        pkg.id, pkg.target
                    ));
                }
            }
            for obj in &model.migration.objects {
                if !system_ids.contains(obj.target.as_str()) {
                    errors.push(format!(
                        "Migration object '{}' references unknown system '{}'",
                        obj.id, obj.target
                    ));
                }
            }
            for suite in &model.testing.suites {
                if !system_ids.contains(suite.target.as_str()) {
                    errors.push(format!(
                        "Test suite '{}' references unknown system '{}'",
                        suite.id, suite.target
                    ));
                }
            }
        }

        if has_duplicates(model.customizing.packages.iter().map(|p| p.id.as_str())) {
            errors.push("Duplicate customizing package IDs found".to_string());
        }
        if has_duplicates(model.migration.objects.iter().map(|o| o.id.as_str())) {
            errors.push("Duplicate migration object IDs found".to_string());
        }
        if has_duplicates(model.testing.suites.iter().map(|s| s.id.as_str())) {
            errors.push("Duplicate test suite IDs found".to_string());
        }

        errors
    }
}

fn has_duplicates<'a>(ids: impl Iterator<Item = &'a str>) -> bool {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return true;
        }
    }
    false
}
