//! OpenTofu integration
//!
//! Everything that touches the filesystem or the `tofu` binary lives here;
//! the plan compiler hands over a finished [`DeploymentPlan`] and never
//! sees a process.
//!
//! - [`workspace`] - Writes per-resource root modules and the plan manifest
//! - [`runner`] - Runs `tofu` and reads its outputs

pub mod runner;
pub mod workspace;

use crate::plan::DeploymentPlan;
use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::Path;

pub use runner::{ShellResult, Tofu};

const SEPARATOR: &str = "----------------------------------------------------------------";
const BANNER: &str = "================================================================";

/// List the resources of `plan` on `out` and ask whether to go ahead.
///
/// Only `y` or `Y` confirms; anything else, including end of input,
/// declines.
pub fn confirm_deploy(
    plan: &DeploymentPlan,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<bool> {
    writeln!(out, "Output Directory: {}", plan.output_dir.display())?;
    writeln!(out, "Resources ({}):", plan.resources.len())?;
    for res in &plan.resources {
        writeln!(out, "  - {} (Type: {})", res.id, res.resource_type)?;
    }
    write!(out, "\nDo you want to proceed? [y/N]: ")?;
    out.flush()?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("error reading confirmation")?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

/// Materialize and apply every resource of `plan`, in plan order.
///
/// Stops at the first resource that fails to init or apply.
pub fn deploy(plan: &DeploymentPlan, root: &Path, tofu: &Tofu) -> Result<()> {
    println!("✓ Plan generated. Output directory: {}", plan.output_dir.display());
    println!("✓ Found {} resources to deploy.", plan.resources.len());

    let manifest = workspace::write_manifest(plan)?;
    tracing::info!("Wrote plan manifest {:?}", manifest);

    for res in &plan.resources {
        println!("\n{}", SEPARATOR);
        println!("Deploying Resource: {} (Type: {})", res.id, res.resource_type);
        println!("{}", SEPARATOR);

        let target_dir = workspace::materialize_resource(plan, res, root)?;
        println!(
            "✓ Generated main.tf referencing module {}/{}",
            plan.provider, res.module_dir
        );

        tofu.run(&target_dir, &["init", "-upgrade"])
            .into_result()
            .with_context(|| format!("error initializing OpenTofu for {}", res.id))?;
        tofu.run(&target_dir, &["apply", "-auto-approve"])
            .into_result()
            .with_context(|| format!("error applying OpenTofu for {}", res.id))?;

        println!("✓ Successfully deployed {}", res.id);

        match tofu.outputs(&target_dir) {
            Ok(outputs) => runner::print_outputs(&outputs),
            Err(e) => {
                tracing::warn!("Could not retrieve outputs for {}: {:#}", res.id, e);
                println!("⚠️  Warning: Could not retrieve outputs for {}: {:#}", res.id, e);
            }
        }
    }

    println!("\n{}", BANNER);
    println!("Deployment Complete!");
    println!("State stored in: {}", plan.output_dir.display());
    Ok(())
}

/// Destroy every resource directory under `deploy_dir`.
///
/// Keeps going past failures; the directory is removed only when every
/// resource was destroyed.
pub fn destroy(deploy_dir: &Path, tofu: &Tofu) -> Result<()> {
    let deploy_dir = std::fs::canonicalize(deploy_dir)
        .with_context(|| format!("error resolving {}", deploy_dir.display()))?;
    println!("Destroying deployment at: {}", deploy_dir.display());

    let mut failed: Vec<String> = Vec::new();

    for dir in workspace::resource_dirs(&deploy_dir)? {
        let name = dir_name(&dir);
        println!("\n{}", SEPARATOR);
        println!("Destroying Resource: {}", name);
        println!("{}", SEPARATOR);

        match tofu.run(&dir, &["destroy", "-auto-approve"]).into_result() {
            Ok(()) => println!("✓ Successfully destroyed {}", name),
            Err(e) => {
                tracing::error!("Destroy failed for {}: {:#}", name, e);
                println!("❌ Error destroying {}: {:#}", name, e);
                failed.push(name);
            }
        }
    }

    println!("\n{}", BANNER);
    if !failed.is_empty() {
        println!(
            "⚠️  Destruction finished with errors. Deployment directory preserved at: {}",
            deploy_dir.display()
        );
        return Err(anyhow::anyhow!(
            "some resources failed to destroy: {}",
            failed.join(", ")
        ));
    }

    println!("Destruction Complete! Removing deployment directory...");
    std::fs::remove_dir_all(&deploy_dir)
        .with_context(|| format!("error removing {}", deploy_dir.display()))?;
    println!("✓ Removed {}", deploy_dir.display());
    Ok(())
}

/// Print the outputs of every resource under `deploy_dir`
pub fn show_outputs(deploy_dir: &Path, tofu: &Tofu) -> Result<()> {
    let deploy_dir = std::fs::canonicalize(deploy_dir)
        .with_context(|| format!("error resolving {}", deploy_dir.display()))?;
    println!("Retrieving outputs from: {}", deploy_dir.display());

    for dir in workspace::resource_dirs(&deploy_dir)? {
        println!("\n{}", SEPARATOR);
        println!("Resource: {}", dir_name(&dir));
        println!("{}", SEPARATOR);

        match tofu.outputs(&dir) {
            Ok(outputs) => runner::print_outputs(&outputs),
            Err(e) => println!("❌ Error retrieving outputs: {:#}", e),
        }
    }
    println!("\n{}", BANNER);
    Ok(())
}

/// Minimal root modules that only succeed with working credentials
const CREDENTIAL_CHECKS: &[(&str, &str)] = &[
    (
        "AWS",
        "provider \"aws\" {\n  region = \"us-east-1\"\n}\ndata \"aws_caller_identity\" \"current\" {}\n",
    ),
    (
        "Azure",
        "provider \"azurerm\" {\n  features {}\n}\ndata \"azurerm_client_config\" \"current\" {}\n",
    ),
    (
        "GCP",
        "provider \"google\" {\n  region = \"us-central1\"\n}\ndata \"google_client_config\" \"current\" {}\n",
    ),
];

/// Check provider credentials by planning a tiny identity lookup per provider.
/// Returns the names of providers whose check passed.
pub fn verify_creds(tofu: &Tofu) -> Vec<&'static str> {
    CREDENTIAL_CHECKS
        .iter()
        .filter_map(|(name, main_tf)| {
            print!("Testing {} credentials... ", name);
            let _ = std::io::Write::flush(&mut std::io::stdout());
            match verify_provider(tofu, name, main_tf) {
                Ok(()) => {
                    println!("✅ Success!");
                    Some(*name)
                }
                Err(e) => {
                    println!("❌ {}", e);
                    None
                }
            }
        })
        .collect()
}

fn verify_provider(tofu: &Tofu, name: &str, main_tf: &str) -> Result<()> {
    let dir = tempfile::Builder::new()
        .prefix(&format!("verify_creds_{}", name.to_lowercase()))
        .tempdir()
        .context("Error creating temp dir")?;
    std::fs::write(dir.path().join("main.tf"), main_tf).context("Error writing main.tf")?;

    tofu.run_silent(dir.path(), &["init"])
        .map_err(|e| anyhow::anyhow!("Init failed:\n{}", e))?;
    tofu.run_silent(dir.path(), &["plan"])
        .map_err(|e| anyhow::anyhow!("Plan failed: {}", runner::first_error(&e.to_string())))?;
    Ok(())
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}
