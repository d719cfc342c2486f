use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProfileConfig {
    pub server: Option<String>,
    pub patch_dir: Option<PathBuf>,
    pub editor: Option<String>,
    pub max_attempts: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub log_level: Option<String>,
}

impl ProfileConfig {
    pub const KEYS: [&'static str; 6] = [
        "server",
        "patch_dir",
        "editor",
        "max_attempts",
        "timeout_secs",
        "log_level",
    ];

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "server" => self.server = Some(value.to_string()),
            "patch_dir" => self.patch_dir = Some(PathBuf::from(value)),
            "editor" => self.editor = Some(value.to_string()),
            "max_attempts" => {
                self.max_attempts = Some(value.parse().context("max_attempts must be a number")?)
            }
            "timeout_secs" => {
                self.timeout_secs = Some(value.parse().context("timeout_secs must be a number")?)
            }
            "log_level" => self.log_level = Some(value.to_string()),
            other => {
                anyhow::bail!(
                    "Unknown config key: {other}. Valid keys: {}",
                    Self::KEYS.join(", ")
                )
            }
        }
        Ok(())
    }
}

pub type ConfigFile = HashMap<String, ProfileConfig>;

fn config_dir() -> Result<PathBuf> {
    let dir = dirs::home_dir()
        .context("Cannot determine home directory")?
        .join(".octofhir");
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("upload.toml"))
}

pub fn load_all_from(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::new());
    }
    let content = fs::read_to_string(path)?;
    let cfg: ConfigFile =
        toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))?;
    Ok(cfg)
}

pub fn save_all_to(path: &Path, all: &ConfigFile) -> Result<()> {
    let content = toml::to_string_pretty(all)?;
    fs::write(path, content)?;
    Ok(())
}

pub fn load_profile(profile: &str) -> Result<ProfileConfig> {
    let all = load_all_from(&config_path()?)?;
    Ok(all.get(profile).cloned().unwrap_or_default())
}

pub fn save_profile(profile: &str, config: &ProfileConfig) -> Result<()> {
    let path = config_path()?;
    let mut all = load_all_from(&path)?;
    all.insert(profile.to_string(), config.clone());
    save_all_to(&path, &all)
}

pub fn resolve_server(cli_server: &Option<String>, cfg: &ProfileConfig, profile: &str) -> Result<String> {
    // 1. --server flag / OCTOFHIR_URL env
    if let Some(s) = cli_server {
        return Ok(s.clone());
    }
    // 2. upload.toml profile
    if let Some(s) = &cfg.server {
        return Ok(s.clone());
    }
    // 3. Stored credentials for this profile
    if let Ok(Some(creds)) = crate::auth::load_credentials(profile) {
        return Ok(creds.server().to_string());
    }
    anyhow::bail!(
        "No server URL configured. Use --server, set OCTOFHIR_URL env var, or run: octofhir-upload config set server <url>"
    )
}

/// `--editor`, then the profile, then `$VISUAL`, then `$EDITOR`, then `vi`.
pub fn resolve_editor(cli_editor: &Option<String>, cfg: &ProfileConfig) -> String {
    cli_editor
        .clone()
        .or_else(|| cfg.editor.clone())
        .or_else(|| non_empty_env("VISUAL"))
        .or_else(|| non_empty_env("EDITOR"))
        .unwrap_or_else(|| "vi".to_string())
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
