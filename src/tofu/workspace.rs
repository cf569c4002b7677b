//! Deployment workspace materialization
//!
//! Writes one directory per planned resource holding a `main.tf` that
//! references the provider module, inlines the generated variables and
//! forwards every module output.

use crate::plan::{is_safe_resource_id, DeploymentPlan, Provider, ResourcePlan};
use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Manifest file written next to the resource directories
pub const MANIFEST_FILE: &str = "plan.json";

fn output_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"output\s+"([\w-]+)"\s+\{"#).expect("valid output regex"))
}

/// `root/opentofu/<provider>/<module_dir>`
pub fn module_path(root: &Path, provider: Provider, module_dir: &str) -> PathBuf {
    root.join("opentofu").join(provider.as_str()).join(module_dir)
}

/// Names of all outputs declared in the module's `.tf` files, in file order
pub fn scan_module_outputs(module_dir: &Path) -> Result<Vec<String>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(module_dir)
        .with_context(|| format!("error reading module directory {}", module_dir.display()))?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "tf"))
        .collect();
    files.sort();

    let mut outputs = Vec::new();
    for file in files {
        let content = std::fs::read_to_string(&file)
            .with_context(|| format!("error reading {}", file.display()))?;
        outputs.extend(
            output_re()
                .captures_iter(&content)
                .map(|cap| cap[1].to_string()),
        );
    }
    Ok(outputs)
}

/// Root module referencing `module_source` with the resource's variables
pub fn render_main_tf(module_source: &Path, tfvars: &str, outputs: &[String]) -> String {
    let output_blocks: String = outputs
        .iter()
        .map(|out| {
            format!(
                "\noutput \"{}\" {{\n  value = module.deploy.{}\n}}\n",
                out, out
            )
        })
        .collect();

    format!(
        "\nmodule \"deploy\" {{\n  source = \"{}\"\n\n{}\n}}\n\n{}\n",
        module_source.display(),
        tfvars,
        output_blocks
    )
}

/// Create `OutputDir/<id>/main.tf` for one resource; returns the directory
pub fn materialize_resource(
    plan: &DeploymentPlan,
    resource: &ResourcePlan,
    root: &Path,
) -> Result<PathBuf> {
    if !is_safe_resource_id(&resource.id) {
        return Err(anyhow::anyhow!(
            "resource id '{}' is not a plain directory name",
            resource.id
        ));
    }

    let module_source = module_path(root, plan.provider, &resource.module_dir);
    if !module_source.is_dir() {
        return Err(anyhow::anyhow!(
            "module not found at {}",
            module_source.display()
        ));
    }
    let module_source = std::fs::canonicalize(&module_source)
        .with_context(|| format!("error resolving {}", module_source.display()))?;

    let outputs = match scan_module_outputs(&module_source) {
        Ok(outputs) => outputs,
        Err(e) => {
            tracing::warn!("Could not scan module outputs: {:#}", e);
            println!("⚠️  Warning: Could not scan module outputs: {:#}", e);
            Vec::new()
        }
    };

    let target_dir = plan.output_dir.join(&resource.id);
    std::fs::create_dir_all(&target_dir)
        .with_context(|| format!("error creating resource directory {}", target_dir.display()))?;

    let main_tf = target_dir.join("main.tf");
    std::fs::write(&main_tf, render_main_tf(&module_source, &resource.tfvars, &outputs))
        .with_context(|| format!("error writing main.tf for {}", resource.id))?;

    tracing::info!(
        "Wrote {:?} ({} forwarded outputs)",
        main_tf,
        outputs.len()
    );
    Ok(target_dir)
}

#[derive(Serialize)]
struct Manifest<'a> {
    generated_at: String,
    #[serde(flatten)]
    plan: &'a DeploymentPlan,
}

/// Write the plan manifest into the output directory
pub fn write_manifest(plan: &DeploymentPlan) -> Result<PathBuf> {
    std::fs::create_dir_all(&plan.output_dir).with_context(|| {
        format!("error creating output directory {}", plan.output_dir.display())
    })?;

    let manifest = Manifest {
        generated_at: chrono::Utc::now().to_rfc3339(),
        plan,
    };
    let path = plan.output_dir.join(MANIFEST_FILE);
    let content = serde_json::to_string_pretty(&manifest)?;
    std::fs::write(&path, content)
        .with_context(|| format!("error writing {}", path.display()))?;
    Ok(path)
}

/// Resource subdirectories of a deployment directory, sorted by name
pub fn resource_dirs(deploy_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(deploy_dir)
        .with_context(|| format!("error reading deployment directory {}", deploy_dir.display()))?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}
