// src/config/app.rs
use super::defaults::*;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::error::Result;

/// Env var naming an explicit config file
pub const CONFIG_ENV: &str = "KBE_CONFIG";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_helper")]
    pub helper: HelperConfig,
    #[serde(default = "default_workspace")]
    pub workspace: WorkspaceConfig,
    #[serde(default = "default_output")]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelperConfig {
    /// Explicit helper path; discovered when unset
    #[serde(default)]
    pub binary: Option<PathBuf>,
    /// Answer the helper's terminal prompt through `expect`
    #[serde(default = "default_use_expect")]
    pub use_expect: bool,
    #[serde(default = "default_expect_binary")]
    pub expect_binary: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_temp_prefix")]
    pub temp_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_file")]
    pub file_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            helper: default_helper(),
            workspace: default_workspace(),
            output: default_output(),
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    /// `$KBE_CONFIG`, then `./keychain-editor.toml`, then the user config dir
    pub fn locate() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|dir| dir.join(env!("CARGO_PKG_NAME")).join("config.toml"))
            .filter(|path| path.exists())
    }
}

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Load config at runtime; falls back to defaults if missing or invalid
pub fn load() -> &'static Config {
    CONFIG.get_or_init(|| match Config::locate() {
        Some(path) => Config::from_file(&path).unwrap_or_else(|e| {
            tracing::warn!("{}: {e}, using built-in defaults", path.display());
            Config::default()
        }),
        None => {
            tracing::debug!("no config file found, using built-in defaults");
            Config::default()
        }
    })
}
