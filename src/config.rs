use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use directories::ProjectDirs;
use anyhow::{Context, Result};
use std::fs;

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    /// MIME type -> desktop file id, consulted before mimeapps.list
    #[serde(default)]
    pub default_apps: HashMap<String, String>,
    /// Extra environment for launched applications
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub desktop: DesktopConfig,
}

#[derive(Deserialize, Debug, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_terminal")]
    pub terminal: String,
    #[serde(default)]
    pub quick_exec: bool,
}

fn default_terminal() -> String { "xterm -e".to_string() }

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            terminal: default_terminal(),
            quick_exec: false,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct DesktopConfig {
    /// Searched before the XDG data dirs; each is used as-is, without
    /// appending `applications`.
    #[serde(default)]
    pub extra_dirs: Vec<PathBuf>,
}

pub fn config_path() -> PathBuf {
    match ProjectDirs::from("org", "filelaunch", "filelaunch") {
        Some(dirs) => dirs.config_dir().join("config.toml"),
        None => PathBuf::from("config.toml"),
    }
}

/// Loads `path`, or the default location when `None`. A missing file
/// yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(config_path);

    if !config_path.exists() {
        log::debug!("No config at {:?}, using defaults", config_path);
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("reading {}", config_path.display()))?;
    parse_config(&content).with_context(|| format!("parsing {}", config_path.display()))
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)?;
    Ok(config)
}
