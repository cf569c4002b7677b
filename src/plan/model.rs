//! Deployment config and plan types

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Target cloud platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Azure,
    Gcp,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Azure => "azure",
            Self::Gcp => "gcp",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared service from the deployment config.
///
/// Known attributes are typed; anything else lands in `extra` so new
/// attributes can be projected by the rule table without a code change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Service {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(
        default,
        deserialize_with = "integral_size",
        skip_serializing_if = "Option::is_none"
    )]
    pub disk_size_gb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_tier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versioning: Option<bool>,
    /// Attributes without a typed field
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Service {
    pub fn new(service_type: &str) -> Self {
        Self {
            service_type: service_type.to_string(),
            ..Self::default()
        }
    }

    /// Look up an attribute by its config key. `None` means the attribute
    /// was not supplied.
    ///
    /// Typed attributes holding their zero value (`""`, `0`, `false`, `{}`)
    /// count as not supplied, so rule defaults apply to them. Untyped
    /// attributes in `extra` are returned as written.
    pub fn attribute(&self, key: &str) -> Option<Value> {
        match key {
            "type" => Some(Value::String(self.service_type.clone())),
            "instance_id" => non_empty(&self.instance_id),
            "bucket_id" => non_empty(&self.bucket_id),
            "size" => non_empty(&self.size),
            "os" => non_empty(&self.os),
            "disk_size_gb" => self.disk_size_gb.filter(|&gb| gb != 0).map(Value::from),
            "metadata" => self.metadata.as_ref().filter(|m| !m.is_empty()).map(|m| {
                Value::Object(
                    m.iter()
                        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                        .collect(),
                )
            }),
            "project_id" => non_empty(&self.project_id),
            "ssh_public_key" => non_empty(&self.ssh_public_key),
            "admin_username" => non_empty(&self.admin_username),
            "storage_tier" => non_empty(&self.storage_tier),
            "versioning" => self.versioning.filter(|&v| v).map(Value::Bool),
            other => self.extra.get(other).cloned(),
        }
    }
}

fn non_empty(field: &Option<String>) -> Option<Value> {
    field
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| Value::String(s.to_string()))
}

/// Accept any JSON number with an integral non-negative value, so `30.0`
/// reads the same as `30`.
fn integral_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Some(n) = number.as_u64() {
        return Ok(Some(n));
    }
    match number.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Ok(Some(f as u64)),
        _ => Err(serde::de::Error::custom(format!(
            "disk_size_gb must be a non-negative integer, got {}",
            number
        ))),
    }
}

/// Parsed deployment config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub provider: Provider,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Config {
    /// Look up a top-level config attribute by key
    pub fn attribute(&self, key: &str) -> Option<Value> {
        match key {
            "provider" => Some(Value::String(self.provider.as_str().to_string())),
            "region" => Some(Value::String(self.region.clone())),
            "project_name" => Some(Value::String(self.project_name.clone())),
            "services" => serde_json::to_value(&self.services).ok(),
            "subscription_id" => non_empty(&self.subscription_id),
            "version" => non_empty(&self.version),
            _ => None,
        }
    }
}

/// One resource to materialize
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourcePlan {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Variable-file body
    pub tfvars: String,
    /// Module folder under `opentofu/<provider>/`
    pub module_dir: String,
}

/// Everything the provisioning side needs for one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentPlan {
    pub provider: Provider,
    pub region: String,
    pub output_dir: PathBuf,
    pub resources: Vec<ResourcePlan>,
}
