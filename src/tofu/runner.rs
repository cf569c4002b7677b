//! OpenTofu process execution

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::process::{Command, Stdio};

/// Result of a tofu invocation with inherited stdio
#[derive(Debug)]
pub enum ShellResult {
    /// Command completed successfully
    Success,
    /// Command failed with exit code
    Failed(i32),
    /// Error launching command
    Error(String),
}

impl ShellResult {
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Success => Ok(()),
            Self::Failed(code) => Err(anyhow::anyhow!("exited with status {}", code)),
            Self::Error(msg) => Err(anyhow::anyhow!(msg)),
        }
    }
}

/// One entry of `tofu output -json`
#[derive(Debug, Clone, Deserialize)]
pub struct TofuOutput {
    pub value: Value,
    #[serde(default)]
    pub sensitive: bool,
}

/// Handle on the provisioning binary
#[derive(Debug, Clone)]
pub struct Tofu {
    bin: String,
}

impl Tofu {
    pub fn new(bin: &str) -> Self {
        Self {
            bin: bin.to_string(),
        }
    }

    pub fn bin(&self) -> &str {
        &self.bin
    }

    /// Run in `dir`, streaming output to the terminal
    pub fn run(&self, dir: &Path, args: &[&str]) -> ShellResult {
        println!("➜ Running {} {} in {}", self.bin, args.join(" "), dir.display());
        tracing::info!("Executing: {} {} (cwd {:?})", self.bin, args.join(" "), dir);

        match Command::new(&self.bin)
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
        {
            Ok(mut child) => match child.wait() {
                Ok(status) => {
                    if status.success() {
                        ShellResult::Success
                    } else {
                        ShellResult::Failed(status.code().unwrap_or(-1))
                    }
                }
                Err(e) => ShellResult::Error(format!("Failed to wait for process: {}", e)),
            },
            Err(e) => ShellResult::Error(format!("Failed to execute {}: {}", self.bin, e)),
        }
    }

    /// Run in `dir` capturing output; the error carries the combined output
    pub fn run_silent(&self, dir: &Path, args: &[&str]) -> Result<()> {
        tracing::debug!("Executing silently: {} {}", self.bin, args.join(" "));
        let output = Command::new(&self.bin)
            .args(args)
            .current_dir(dir)
            .output()
            .with_context(|| format!("Failed to execute {}", self.bin))?;

        if output.status.success() {
            return Ok(());
        }

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Err(anyhow::anyhow!(combined))
    }

    /// Read the root module outputs of an applied directory
    pub fn outputs(&self, dir: &Path) -> Result<BTreeMap<String, TofuOutput>> {
        let output = Command::new(&self.bin)
            .args(["output", "-json"])
            .current_dir(dir)
            .output()
            .with_context(|| format!("Failed to execute {}", self.bin))?;

        if !output.status.success() {
            return Err(anyhow::anyhow!(
                "{} output failed: {}",
                self.bin,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        parse_outputs(&output.stdout)
    }
}

pub fn parse_outputs(json: &[u8]) -> Result<BTreeMap<String, TofuOutput>> {
    serde_json::from_slice(json).context("error parsing output json")
}

/// Print outputs the way the deploy and output commands show them
pub fn print_outputs(outputs: &BTreeMap<String, TofuOutput>) {
    if outputs.is_empty() {
        println!("  (No outputs found)");
        return;
    }

    println!("  Outputs:");
    for (key, out) in outputs {
        if out.sensitive {
            println!("    {}: (sensitive)", key);
        } else {
            println!("    {}: {}", key, display_value(&out.value));
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Pull the message after the first `Error:` marker, if any
pub fn first_error(output: &str) -> String {
    match output.split_once("Error:") {
        Some((_, rest)) => rest.trim().to_string(),
        None => output.trim().to_string(),
    }
}
