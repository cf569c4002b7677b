//! Plan Builder
//!
//! Validates a deployment config, then projects every declared service into
//! a [`ResourcePlan`]. Only the config and schema documents are read; nothing
//! is written.

use super::model::{Config, DeploymentPlan, ResourcePlan, Service};
use super::projector::project;
use super::rules::RuleTable;
use super::schema::SchemaValidator;
use crate::error::{PlanError, PlanResult};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Schema document location, relative to the project root
pub const SCHEMA_PATH: &str = "parser/schema.json";

/// Rule document location, relative to the project root
pub const RULES_PATH: &str = "parser/generator_config.json";

/// Read `config_path`, validate it against the project schema and build the plan
pub fn generate_plan(
    config_path: &Path,
    root: &Path,
    rules: &RuleTable,
) -> PlanResult<DeploymentPlan> {
    let config_bytes = std::fs::read(config_path).map_err(|source| PlanError::ConfigRead {
        path: config_path.to_path_buf(),
        source,
    })?;
    let validator = SchemaValidator::load(&root.join(SCHEMA_PATH))?;

    build_plan(&config_bytes, &validator, rules, root)
}

/// Build a plan from raw config bytes
pub fn build_plan(
    config_bytes: &[u8],
    validator: &SchemaValidator,
    rules: &RuleTable,
    root: &Path,
) -> PlanResult<DeploymentPlan> {
    let document: Value = serde_json::from_slice(config_bytes)?;
    validator
        .validate_document(&document)
        .map_err(PlanError::Validation)?;

    let config: Config = serde_json::from_value(document)?;

    if config.project_name.is_empty() {
        return Err(PlanError::MissingField("project_name"));
    }

    let output_dir = output_dir(root, &config);
    let mut resources: Vec<ResourcePlan> = Vec::with_capacity(config.services.len());
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (idx, service) in config.services.iter().enumerate() {
        let module_dir = module_folder(&service.service_type);
        let id = resource_id(service, &module_dir, resources.len() + 1);

        if !is_safe_resource_id(&id) {
            return Err(PlanError::InvalidResourceId {
                id,
                position: idx + 1,
            });
        }
        if let Some(first) = seen.insert(id.clone(), idx + 1) {
            return Err(PlanError::DuplicateResourceId {
                id,
                first,
                second: idx + 1,
            });
        }

        let tfvars = project(rules, &config, service);
        tracing::debug!(
            "Planned {} ({}) -> {} [{} bytes of tfvars]",
            id,
            service.service_type,
            module_dir,
            tfvars.len()
        );

        resources.push(ResourcePlan {
            id,
            resource_type: service.service_type.clone(),
            tfvars,
            module_dir,
        });
    }

    tracing::info!(
        "Plan for {} in {}: {} resources -> {:?}",
        config.provider,
        config.region,
        resources.len(),
        output_dir
    );

    Ok(DeploymentPlan {
        provider: config.provider,
        region: config.region,
        output_dir,
        resources,
    })
}

/// `root/deployment/<provider>/<sanitized project name>`
fn output_dir(root: &Path, config: &Config) -> PathBuf {
    root.join("deployment")
        .join(config.provider.as_str())
        .join(sanitize_project_name(&config.project_name))
}

/// Spaces become `_`, slashes become `-`
pub fn sanitize_project_name(name: &str) -> String {
    name.replace(' ', "_").replace('/', "-")
}

/// Module folder for a dotted service type
pub fn module_folder(service_type: &str) -> String {
    match service_type {
        "compute.instance" => "compute_instance".to_string(),
        "storage.object" => "storage_object".to_string(),
        other => other.replace('.', "_"),
    }
}

/// instance_id, then bucket_id, then `<module folder>-<position>`
fn resource_id(service: &Service, module_dir: &str, position: usize) -> String {
    [&service.instance_id, &service.bucket_id]
        .into_iter()
        .flatten()
        .find(|id| !id.is_empty())
        .cloned()
        .unwrap_or_else(|| format!("{}-{}", module_dir, position))
}

/// Resource IDs name directories under the output directory, so they must
/// stay a single path component.
pub fn is_safe_resource_id(id: &str) -> bool {
    !(id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']))
}
