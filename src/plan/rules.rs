//! Rule Table - attribute projection rules loaded from JSON
//!
//! The rule document maps provider -> service type -> ordered rules:
//!
//! ```json
//! { "aws": { "compute.instance": [
//!     { "field": "region", "source": "config", "required": true },
//!     { "field": "bucket_name", "source": "service", "mapping": "bucket_id" }
//! ] } }
//! ```
//!
//! The table is loaded once and only read afterwards, so one instance can be
//! shared by any number of plan builds.

use super::model::Provider;
use crate::error::{PlanError, PlanResult};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Which record a rule reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Service,
    Config,
}

/// One projected output variable
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AttributeRule {
    /// Output variable name
    pub field: String,
    pub source: Source,
    /// Advisory only; the projector does not enforce it
    #[serde(default)]
    pub required: bool,
    /// Source key to read instead of `field`
    #[serde(default)]
    pub mapping: Option<String>,
    /// Omit the line for an empty string or empty mapping
    #[serde(default)]
    pub skip_empty: bool,
    /// Used only when the source key is absent. A JSON `null` means no default.
    #[serde(default)]
    pub default: Option<Value>,
}

impl AttributeRule {
    /// Key looked up in the source record
    pub fn source_key(&self) -> &str {
        match self.mapping.as_deref() {
            Some(mapping) if !mapping.is_empty() => mapping,
            _ => &self.field,
        }
    }
}

/// provider -> service type -> rules, in output order
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct RuleTable {
    providers: HashMap<Provider, HashMap<String, Vec<AttributeRule>>>,
}

impl RuleTable {
    /// Load the rule document at `path`
    pub fn load(path: &Path) -> PlanResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PlanError::RuleLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let table = Self::from_json(&content).map_err(|e| PlanError::RuleLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        tracing::info!(
            "Loaded generator config from {:?} ({} rule lists)",
            path,
            table.len()
        );
        Ok(table)
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Rules for a provider and service type, if any are defined
    pub fn lookup(&self, provider: Provider, service_type: &str) -> Option<&[AttributeRule]> {
        self.providers
            .get(&provider)?
            .get(service_type)
            .map(|rules| rules.as_slice())
    }

    /// Providers named in the rule document, sorted
    pub fn providers(&self) -> Vec<Provider> {
        let mut providers: Vec<Provider> = self.providers.keys().copied().collect();
        providers.sort_by_key(|p| p.as_str());
        providers
    }

    /// Service types with rules for `provider`, sorted
    pub fn service_types(&self, provider: Provider) -> Vec<&str> {
        let mut types: Vec<&str> = self
            .providers
            .get(&provider)
            .map(|m| m.keys().map(|s| s.as_str()).collect())
            .unwrap_or_default();
        types.sort_unstable();
        types
    }

    /// Total number of (provider, service type) rule lists
    pub fn len(&self) -> usize {
        self.providers.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: &str = r#"{
        "aws": {
            "compute.instance": [
                {"field": "region", "source": "config", "required": true},
                {"field": "instance_id", "source": "service"},
                {"field": "bucket_name", "source": "service", "mapping": "bucket_id"},
                {"field": "tags", "source": "service", "skip_empty": true, "default": null}
            ]
        },
        "gcp": {}
    }"#;

    #[test]
    fn test_rules_keep_document_order() {
        let table = RuleTable::from_json(RULES).unwrap();
        let rules = table.lookup(Provider::Aws, "compute.instance").unwrap();
        let fields: Vec<&str> = rules.iter().map(|r| r.field.as_str()).collect();
        assert_eq!(fields, vec!["region", "instance_id", "bucket_name", "tags"]);
        assert_eq!(rules[0].source, Source::Config);
        assert!(rules[0].required);
    }

    #[test]
    fn test_mapping_overrides_source_key() {
        let table = RuleTable::from_json(RULES).unwrap();
        let rules = table.lookup(Provider::Aws, "compute.instance").unwrap();
        assert_eq!(rules[1].source_key(), "instance_id");
        assert_eq!(rules[2].source_key(), "bucket_id");
    }

    #[test]
    fn test_null_default_means_no_default() {
        let table = RuleTable::from_json(RULES).unwrap();
        let rules = table.lookup(Provider::Aws, "compute.instance").unwrap();
        assert!(rules[3].default.is_none());
        assert!(rules[3].skip_empty);
    }

    #[test]
    fn test_lookup_miss_is_none() {
        let table = RuleTable::from_json(RULES).unwrap();
        assert!(table.lookup(Provider::Aws, "storage.object").is_none());
        assert!(table.lookup(Provider::Gcp, "compute.instance").is_none());
        assert!(table.lookup(Provider::Azure, "compute.instance").is_none());
    }

    #[test]
    fn test_unknown_source_is_rejected() {
        let doc = r#"{"aws": {"x": [{"field": "a", "source": "env"}]}}"#;
        assert!(RuleTable::from_json(doc).is_err());
    }

    #[test]
    fn test_listing() {
        let table = RuleTable::from_json(RULES).unwrap();
        assert_eq!(table.providers(), vec![Provider::Aws, Provider::Gcp]);
        assert_eq!(table.service_types(Provider::Aws), vec!["compute.instance"]);
        assert!(table.service_types(Provider::Azure).is_empty());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_load_missing_file_is_rule_load_error() {
        let result = RuleTable::load(Path::new("/nonexistent/generator_config.json"));
        assert!(matches!(result, Err(PlanError::RuleLoad { .. })));
    }
}
