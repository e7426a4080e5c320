use hugocms_editor::{LocalZone, SessionConfig, DEFAULT_PREVIEW_BASE};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "hugocms.config.json";

pub const ENV_SERVER_URL: &str = "HUGOCMS_SERVER_URL";
pub const ENV_SESSION: &str = "HUGOCMS_SESSION";

/// hugocms client configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Base URL of the CMS backend
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Value of the backend's session cookie (`name=value`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_cookie: Option<String>,

    #[serde(default = "default_autosave_debounce_ms")]
    pub autosave_debounce_ms: u64,

    #[serde(default = "default_preview_base")]
    pub preview_base: String,

    /// Offset for datetime fields, e.g. `+09:00`; the system zone when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_offset: Option<String>,
}

fn default_server_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_autosave_debounce_ms() -> u64 {
    3000
}

fn default_preview_base() -> String {
    DEFAULT_PREVIEW_BASE.to_string()
}

impl Config {
    /// Load config from a directory, then apply environment overrides
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            serde_json::from_str(&content)?
        } else {
            Config::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override file settings from the environment
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_SERVER_URL).filter(|v| !v.trim().is_empty()) {
            self.server_url = url;
        }
        if let Some(cookie) = lookup(ENV_SESSION).filter(|v| !v.trim().is_empty()) {
            self.session_cookie = Some(cookie);
        }
    }

    /// Settings for the editing session
    pub fn session_config(&self) -> anyhow::Result<SessionConfig> {
        let zone = match &self.utc_offset {
            Some(offset) => LocalZone::parse(offset)?,
            None => LocalZone::System,
        };
        Ok(SessionConfig::default()
            .with_debounce(Duration::from_millis(self.autosave_debounce_ms))
            .with_preview_base(self.preview_base.clone())
            .with_zone(zone))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            session_cookie: None,
            autosave_debounce_ms: default_autosave_debounce_ms(),
            preview_base: default_preview_base(),
            utc_offset: None,
        }
    }
}
