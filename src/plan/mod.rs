//! Deployment plan compiler
//!
//! Turns a declarative deployment config into per-resource variable files
//! and an ordered [`DeploymentPlan`]. Nothing here touches the provisioning
//! tool; the whole module is a pure function of its input documents.
//!
//! # Architecture
//!
//! - [`schema`] - JSON Schema plus provider-specific validation
//! - [`rules`] - Attribute projection rules loaded from the generator config
//! - [`projector`] - Applies rules to a service to produce its variable file
//! - [`value`] - Renders values as variable-file literals
//! - [`builder`] - Orchestrates the above into a deployment plan
//!
//! # Example
//!
//! ```ignore
//! use cloudplan::plan::{generate_plan, RuleTable, RULES_PATH};
//!
//! fn plan(root: &std::path::Path) -> cloudplan::error::PlanResult<()> {
//!     let rules = RuleTable::load(&root.join(RULES_PATH))?;
//!     let plan = generate_plan(&root.join("demos/aws_demo.json"), root, &rules)?;
//!     for res in &plan.resources {
//!         println!("{} -> {}", res.id, res.module_dir);
//!     }
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod model;
pub mod projector;
pub mod rules;
pub mod schema;
pub mod value;

pub use builder::{
    build_plan, generate_plan, is_safe_resource_id, module_folder, sanitize_project_name,
    RULES_PATH, SCHEMA_PATH,
};
pub use model::{Config, DeploymentPlan, Provider, ResourcePlan, Service};
pub use projector::project;
pub use rules::{AttributeRule, RuleTable, Source};
pub use schema::SchemaValidator;
pub use value::render_value;
