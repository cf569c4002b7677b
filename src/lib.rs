//! cloudplan - compile declarative multi-cloud deployment configs into
//! OpenTofu variable files and deployment plans.

pub mod config;
pub mod error;
pub mod plan;
pub mod tofu;
