//! Configuration Management
//!
//! Persistent user settings for cloudplan. These are tool settings, not the
//! deployment config the plan compiler reads.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment override for the project root
pub const ROOT_ENV: &str = "CLOUDPLAN_ROOT";
/// Environment override for the provisioning binary
pub const TOFU_ENV: &str = "CLOUDPLAN_TOFU";

const DEFAULT_TOFU_BIN: &str = "tofu";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Project root holding `parser/` and `opentofu/`
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Provisioning binary name or path
    #[serde(default)]
    pub tofu_bin: Option<String>,
}

impl Settings {
    /// Get the settings file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cloudplan").join("config.json"))
    }

    /// Load settings from disk; anything missing or unreadable yields defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed settings file {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Get effective root (CLI > env > settings > current directory)
    pub fn effective_root(&self, cli: Option<&Path>) -> PathBuf {
        cli.map(Path::to_path_buf)
            .or_else(|| std::env::var_os(ROOT_ENV).map(PathBuf::from))
            .or_else(|| self.root.clone())
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Get effective provisioning binary (CLI > env > settings > "tofu")
    pub fn effective_tofu_bin(&self, cli: Option<&str>) -> String {
        cli.map(str::to_string)
            .or_else(|| std::env::var(TOFU_ENV).ok())
            .or_else(|| self.tofu_bin.clone())
            .unwrap_or_else(|| DEFAULT_TOFU_BIN.to_string())
    }
}
