//! Config validation
//!
//! Structural checks come from a JSON Schema document; provider-specific
//! rules run only once the structure is sound. Every structural violation
//! is reported, not just the first.

use crate::error::{PlanError, PlanResult};
use serde_json::Value;
use std::path::Path;

pub struct SchemaValidator {
    validator: jsonschema::Validator,
}

impl SchemaValidator {
    /// Compile a schema document
    pub fn from_document(schema: &Value, origin: &Path) -> PlanResult<Self> {
        let validator = jsonschema::validator_for(schema).map_err(|e| PlanError::SchemaLoad {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self { validator })
    }

    /// Read and compile the schema document at `path`
    pub fn load(path: &Path) -> PlanResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PlanError::SchemaLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let schema: Value = serde_json::from_str(&content).map_err(|e| PlanError::SchemaLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_document(&schema, path)
    }

    /// Validate raw config bytes. On failure the message lists every problem.
    pub fn validate(&self, config_bytes: &[u8]) -> Result<(), String> {
        let document: Value = serde_json::from_slice(config_bytes)
            .map_err(|e| format!("validation error: {}", e))?;
        self.validate_document(&document)
    }

    /// Validate an already decoded config document
    pub fn validate_document(&self, document: &Value) -> Result<(), String> {
        let errors: Vec<String> = self
            .validator
            .iter_errors(document)
            .map(|e| describe(&e.instance_path.to_string(), &e.to_string()))
            .collect();

        if !errors.is_empty() {
            tracing::debug!("Schema validation found {} errors", errors.len());
            return Err(errors.join("; "));
        }

        check_provider_rules(document)
    }
}

fn describe(path: &str, message: &str) -> String {
    if path.is_empty() {
        format!("(root): {}", message)
    } else {
        format!("{}: {}", path, message)
    }
}

/// Provider-specific requirements the schema cannot express
fn check_provider_rules(document: &Value) -> Result<(), String> {
    let provider = document.get("provider").and_then(|v| v.as_str());
    let services = document
        .get("services")
        .and_then(|v| v.as_array())
        .map(|s| s.as_slice())
        .unwrap_or_default();

    match provider {
        Some("gcp") => {
            let errors: Vec<String> = services
                .iter()
                .enumerate()
                .filter(|(_, service)| {
                    service
                        .get("project_id")
                        .and_then(|v| v.as_str())
                        .map_or(true, str::is_empty)
                })
                .map(|(idx, service)| {
                    let service_type = service
                        .get("type")
                        .and_then(|v| v.as_str())
                        .unwrap_or("unknown");
                    format!(
                        "GCP {} (service #{}) requires 'project_id' in service configuration",
                        service_type,
                        idx + 1
                    )
                })
                .collect();
            if errors.is_empty() {
                Ok(())
            } else {
                Err(errors.join("; "))
            }
        }
        // Subscription may come from the credential environment
        Some("azure") => Ok(()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator() -> SchemaValidator {
        let schema = json!({
            "type": "object",
            "required": ["provider", "region", "project_name", "services"],
            "properties": {
                "provider": {"type": "string", "enum": ["aws", "azure", "gcp"]},
                "region": {"type": "string"},
                "project_name": {"type": "string"},
                "services": {
                    "type": "array",
                    "items": {"type": "object", "required": ["type"]}
                }
            }
        });
        SchemaValidator::from_document(&schema, Path::new("schema.json")).unwrap()
    }

    #[test]
    fn test_valid_config_passes() {
        let config = json!({
            "provider": "aws",
            "region": "us-east-1",
            "project_name": "demo",
            "services": [{"type": "compute.instance"}]
        });
        assert!(validator().validate_document(&config).is_ok());
    }

    #[test]
    fn test_all_structural_errors_are_reported() {
        let config = json!({"provider": "oracle", "services": [{}]});
        let err = validator().validate_document(&config).unwrap_err();
        let parts: Vec<&str> = err.split("; ").collect();
        // bad enum, missing region, missing project_name, service missing type
        assert!(parts.len() >= 4, "expected every violation, got: {}", err);
        assert!(err.contains("region"));
        assert!(err.contains("project_name"));
    }

    #[test]
    fn test_gcp_requires_project_id() {
        let config = json!({
            "provider": "gcp",
            "region": "us-central1",
            "project_name": "demo",
            "services": [{"type": "storage.object", "bucket_id": "b1"}]
        });
        let err = validator().validate_document(&config).unwrap_err();
        assert!(err.contains("project_id"));
        assert!(err.contains("storage.object"));
    }

    #[test]
    fn test_gcp_rejects_empty_project_id() {
        let config = json!({
            "provider": "gcp",
            "region": "us-central1",
            "project_name": "demo",
            "services": [{"type": "compute.instance", "project_id": ""}]
        });
        assert!(validator().validate_document(&config).is_err());
    }

    #[test]
    fn test_azure_has_no_extra_requirements() {
        let config = json!({
            "provider": "azure",
            "region": "westeurope",
            "project_name": "demo",
            "services": [{"type": "compute.instance"}]
        });
        assert!(validator().validate_document(&config).is_ok());
    }

    #[test]
    fn test_malformed_bytes_fail_validation() {
        let err = validator().validate(b"{not json").unwrap_err();
        assert!(err.starts_with("validation error"));
    }

    #[test]
    fn test_invalid_schema_is_a_load_error() {
        let schema = json!({"type": 12});
        let result = SchemaValidator::from_document(&schema, Path::new("bad.json"));
        assert!(matches!(result, Err(PlanError::SchemaLoad { .. })));
    }
}
