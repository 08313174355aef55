use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_RPC_ADDR: &str = "127.0.0.1:4270";
const SETTINGS_FILE: &str = "tether.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliSettings {
    #[serde(default = "default_rpc")]
    pub rpc: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_rpc() -> String {
    DEFAULT_RPC_ADDR.to_string()
}

fn default_connect_timeout_ms() -> u64 {
    3_000
}

impl Default for CliSettings {
    fn default() -> Self {
        Self { rpc: default_rpc(), connect_timeout_ms: default_connect_timeout_ms() }
    }
}

impl CliSettings {
    pub fn from_toml(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("invalid settings in {}", path.display()))
    }
}

pub fn config_root() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("TETHER_CONFIG_ROOT") {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    let base = dirs::config_dir().ok_or_else(|| anyhow!("failed to resolve config directory"))?;
    Ok(base.join("tether"))
}

pub fn settings_path() -> Result<PathBuf> {
    Ok(config_root()?.join(SETTINGS_FILE))
}

/// Loads the operator settings, falling back to defaults when no file
/// exists yet.
pub fn load_settings() -> Result<CliSettings> {
    let path = settings_path()?;
    if !path.exists() {
        return Ok(CliSettings::default());
    }
    CliSettings::from_path(&path)
}
