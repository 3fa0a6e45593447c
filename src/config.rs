//! Configuration loading
//!
//! Defaults, then a TOML file (`$JAXOS_CONFIG` or `./jaxos.toml`), then
//! environment overrides for the inference endpoint.

use crate::types::ShellConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "JAXOS_CONFIG";
pub const OLLAMA_URL_ENV: &str = "JAXOS_OLLAMA_URL";
pub const OLLAMA_MODEL_ENV: &str = "JAXOS_OLLAMA_MODEL";

const DEFAULT_CONFIG_FILE: &str = "jaxos.toml";

impl ShellConfig {
    /// Load configuration from file and environment.
    pub fn load() -> Result<Self> {
        let mut config = match config_path() {
            Some(path) => Self::from_file(&path)?,
            None => ShellConfig::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        log::info!("Loading config from: {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `JAXOS_OLLAMA_URL` / `JAXOS_OLLAMA_MODEL`; blank values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(OLLAMA_URL_ENV) {
            let url = url.trim();
            if !url.is_empty() {
                self.ollama_url = url.to_string();
            }
        }

        if let Some(model) = lookup(OLLAMA_MODEL_ENV) {
            let model = model.trim();
            if !model.is_empty() {
                self.model = model.to_string();
            }
        }
    }
}

fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    local.exists().then_some(local)
}
