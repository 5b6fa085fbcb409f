// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Client configuration.
//!
//! Settings live in `config.json` inside the docuverse home directory
//! (`~/.docuverse` unless `DOCUVERSE_HOME` points elsewhere). The API base
//! URL can be overridden per run with `DOCUVERSE_API_URL` or `--api-url`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Hosted DocuVerse service.
pub const DEFAULT_API_BASE_URL: &str = "https://docuverse-o7b1.onrender.com";

pub const CONFIG_FILE: &str = "config.json";
pub const HOME_ENV: &str = "DOCUVERSE_HOME";
pub const API_URL_ENV: &str = "DOCUVERSE_API_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// No timeout unless set.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Where the key/value store lives; defaults to the home directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: None,
            data_dir: None,
        }
    }
}

/// The docuverse home directory, created if needed.
pub fn home_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os(HOME_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir()
            .context("Could not find home directory")?
            .join(".docuverse"),
    };
    if !dir.exists() {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    Ok(dir)
}

impl Config {
    /// Read `config.json` from `dir`; a missing file gives the defaults.
    pub fn load_from(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn save_to(&self, dir: &Path) -> Result<()> {
        let path = dir.join(CONFIG_FILE);
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("CONFIG_SAVED | path={}", path.display());
        Ok(())
    }

    /// Apply `DOCUVERSE_API_URL` when set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_base_url = url.trim().to_string();
            }
        }
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Directory holding the key/value store.
    pub fn data_dir(&self, home: &Path) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| home.to_path_buf())
    }
}

/// Accept only http(s) URLs for the service.
pub fn validate_api_url(url: &str) -> bool {
    let url = url.trim();
    (url.starts_with("https://") || url.starts_with("http://")) && url.len() > "http://".len()
}
