//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the backend URL, the last used login email and the
//! session lifetime.
//!
//! Configuration is stored at `~/.config/portafolio-tui/config.json`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::auth::session::DEFAULT_SESSION_MINUTES;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "portafolio-tui";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Backend used when neither the environment nor the config names one.
pub const DEFAULT_API_URL: &str = "https://bkportafolio.fly.dev/api";

/// Role id the backend assigns to teacher accounts.
pub const DEFAULT_TEACHER_ROLE_ID: &str = "680ec523f6bc85c713d73d5c";

/// Environment variable overriding the backend URL
pub const API_URL_ENV: &str = "PORTAFOLIO_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub last_email: Option<String>,
    #[serde(default)]
    pub session_minutes: Option<i64>,
    #[serde(default)]
    pub teacher_role_id: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the session and history files.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Backend URL: environment first, then config, then the default.
    pub fn api_url(&self) -> String {
        self.resolve_api_url(std::env::var(API_URL_ENV).ok())
    }

    fn resolve_api_url(&self, from_env: Option<String>) -> String {
        from_env
            .filter(|u| !u.trim().is_empty())
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn session_minutes(&self) -> i64 {
        self.session_minutes
            .filter(|m| *m > 0)
            .unwrap_or(DEFAULT_SESSION_MINUTES)
    }

    pub fn teacher_role_id(&self) -> &str {
        self.teacher_role_id
            .as_deref()
            .unwrap_or(DEFAULT_TEACHER_ROLE_ID)
    }
}
