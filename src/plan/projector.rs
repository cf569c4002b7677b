//! Attribute Projector
//!
//! Turns one declared service into its variable-file body by walking the
//! rule list for its (provider, service type) in order. Output line order is
//! the rule order.

use super::model::{Config, Service};
use super::rules::{AttributeRule, RuleTable, Source};
use super::value::render_value;
use serde_json::Value;

/// Build the variable-file body for `service`.
///
/// A missing rule list yields an empty body; it is logged as a warning
/// rather than treated as an error.
pub fn project(rules: &RuleTable, config: &Config, service: &Service) -> String {
    let Some(attrs) = rules.lookup(config.provider, &service.service_type) else {
        tracing::warn!(
            provider = %config.provider,
            service_type = %service.service_type,
            "No generator rules for service type, variable file will be empty"
        );
        return String::new();
    };

    let lines: Vec<String> = attrs
        .iter()
        .filter_map(|rule| project_rule(rule, config, service))
        .collect();

    let mut body = lines.join("\n");
    body.push('\n');
    body
}

/// Resolve one rule into a `field = literal` line, or `None` when skipped
fn project_rule(rule: &AttributeRule, config: &Config, service: &Service) -> Option<String> {
    let key = rule.source_key();
    let found = match rule.source {
        Source::Service => service.attribute(key),
        Source::Config => config.attribute(key),
    };

    let Some(value) = found.or_else(|| rule.default.clone()) else {
        tracing::trace!(field = %rule.field, key, "Attribute absent, skipping");
        return None;
    };

    if rule.skip_empty && is_empty(&value) {
        tracing::trace!(field = %rule.field, "Empty value skipped");
        return None;
    }

    Some(format!("{} = {}", rule.field, render_value(&value)))
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::String(s) => s.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::model::Provider;
    use std::collections::BTreeMap;

    fn config(provider: Provider) -> Config {
        Config {
            provider,
            region: "us-east-1".to_string(),
            project_name: "demo".to_string(),
            services: Vec::new(),
            subscription_id: None,
            version: None,
        }
    }

    fn table(doc: &str) -> RuleTable {
        RuleTable::from_json(doc).unwrap()
    }

    #[test]
    fn test_lines_follow_rule_order() {
        let rules = table(
            r#"{"aws": {"compute.instance": [
                {"field": "os", "source": "service"},
                {"field": "region", "source": "config"},
                {"field": "instance_id", "source": "service"}
            ]}}"#,
        );
        let mut service = Service::new("compute.instance");
        service.instance_id = Some("web1".to_string());
        service.os = Some("linux".to_string());

        let body = project(&rules, &config(Provider::Aws), &service);
        assert_eq!(
            body,
            "os = \"linux\"\nregion = \"us-east-1\"\ninstance_id = \"web1\"\n"
        );
    }

    #[test]
    fn test_absent_value_without_default_is_skipped() {
        let rules = table(
            r#"{"aws": {"compute.instance": [
                {"field": "size", "source": "service", "required": true},
                {"field": "region", "source": "config"}
            ]}}"#,
        );
        let body = project(&rules, &config(Provider::Aws), &Service::new("compute.instance"));
        assert_eq!(body, "region = \"us-east-1\"\n");
    }

    #[test]
    fn test_default_fills_absent_value_only() {
        let rules = table(
            r#"{"aws": {"storage.object": [
                {"field": "storage_class", "source": "service", "mapping": "storage_tier", "default": "STANDARD"},
                {"field": "versioning", "source": "service", "default": false}
            ]}}"#,
        );
        let mut service = Service::new("storage.object");
        service.versioning = Some(true);

        let body = project(&rules, &config(Provider::Aws), &service);
        assert_eq!(body, "storage_class = \"STANDARD\"\nversioning = true\n");
    }

    #[test]
    fn test_skip_empty_omits_empty_string_and_mapping() {
        let rules = table(
            r#"{"azure": {"compute.instance": [
                {"field": "zone", "source": "service", "skip_empty": true},
                {"field": "tags", "source": "service", "skip_empty": true},
                {"field": "label", "source": "service"}
            ]}}"#,
        );
        let mut service = Service::new("compute.instance");
        service.extra.insert("zone".to_string(), Value::String(String::new()));
        service.extra.insert("tags".to_string(), Value::Object(Default::default()));
        service.extra.insert("label".to_string(), Value::String(String::new()));

        let body = project(&rules, &config(Provider::Azure), &service);
        assert_eq!(body, "label = \"\"\n");
    }

    #[test]
    fn test_empty_typed_values_take_the_default() {
        let rules = table(
            r#"{"azure": {"compute.instance": [
                {"field": "ssh_public_key", "source": "service", "skip_empty": true},
                {"field": "metadata", "source": "service", "skip_empty": true},
                {"field": "admin_username", "source": "service", "default": "azureuser"},
                {"field": "disk_size_gb", "source": "service", "default": 30},
                {"field": "subscription_id", "source": "config", "default": "sub-0"}
            ]}}"#,
        );
        let mut service = Service::new("compute.instance");
        service.ssh_public_key = Some(String::new());
        service.metadata = Some(BTreeMap::new());
        service.admin_username = Some(String::new());
        service.disk_size_gb = Some(0);
        let mut config = config(Provider::Azure);
        config.subscription_id = Some(String::new());

        let body = project(&rules, &config, &service);
        assert_eq!(
            body,
            "admin_username = \"azureuser\"\ndisk_size_gb = 30\nsubscription_id = \"sub-0\"\n"
        );
    }

    #[test]
    fn test_skip_empty_keeps_non_empty_value() {
        let rules = table(
            r#"{"azure": {"compute.instance": [
                {"field": "ssh_public_key", "source": "service", "skip_empty": true}
            ]}}"#,
        );
        let mut service = Service::new("compute.instance");
        service.ssh_public_key = Some("ssh-ed25519 AAAA".to_string());

        let body = project(&rules, &config(Provider::Azure), &service);
        assert_eq!(body, "ssh_public_key = \"ssh-ed25519 AAAA\"\n");
    }

    #[test]
    fn test_missing_rule_list_yields_empty_body() {
        let rules = table(r#"{"aws": {}}"#);
        let body = project(&rules, &config(Provider::Aws), &Service::new("queue.topic"));
        assert!(body.is_empty());
    }

    #[test]
    fn test_rule_list_with_no_hits_is_a_lone_newline() {
        let rules = table(r#"{"aws": {"compute.instance": [{"field": "os", "source": "service"}]}}"#);
        let body = project(&rules, &config(Provider::Aws), &Service::new("compute.instance"));
        assert_eq!(body, "\n");
    }

    #[test]
    fn test_extra_attributes_are_projected() {
        let rules = table(
            r#"{"gcp": {"compute.instance": [{"field": "zone", "source": "service"}]}}"#,
        );
        let mut service = Service::new("compute.instance");
        service
            .extra
            .insert("zone".to_string(), Value::String("us-central1-a".to_string()));

        let body = project(&rules, &config(Provider::Gcp), &service);
        assert_eq!(body, "zone = \"us-central1-a\"\n");
    }
}
