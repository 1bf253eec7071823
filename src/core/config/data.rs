use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::url::construct_api_url;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_BLOB_BASE_URL: &str = "http://localhost:3000/blob";
pub const DEFAULT_UPLOAD_PATH: &str = "upload";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

pub const ENV_API_URL: &str = "SEQOPT_API_URL";
pub const ENV_BLOB_URL: &str = "SEQOPT_BLOB_URL";
pub const ENV_TOKEN: &str = "SEQOPT_TOKEN";

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct TypewriterSettings {
    /// Milliseconds per revealed character in block mode.
    pub speed_ms: Option<u64>,
    /// Pause between blocks.
    pub interval_ms: Option<u64>,
    /// Milliseconds per revealed character when animating rendered markdown.
    pub tree_speed_ms: Option<u64>,
    pub cursor: Option<String>,
}

impl TypewriterSettings {
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub blob_base_url: Option<String>,
    /// Upload endpoint, relative to `api_base_url`.
    pub upload_path: Option<String>,
    pub poll_interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "TypewriterSettings::is_empty")]
    pub typewriter: TypewriterSettings,
}

/// Effective values after applying environment fallbacks and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub blob_base_url: String,
    pub upload_url: String,
    pub token: Option<String>,
    pub poll_interval: Duration,
    pub typewriter: TypewriterSettings,
}

/// Keys accepted by `config set` / `config unset`.
pub const SETTING_KEYS: &[&str] = &[
    "api_base_url",
    "blob_base_url",
    "upload_path",
    "poll_interval_ms",
    "typewriter.speed_ms",
    "typewriter.interval_ms",
    "typewriter.tree_speed_ms",
    "typewriter.cursor",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingError {
    UnknownKey(String),
    InvalidNumber { key: String, value: String },
}

impl fmt::Display for SettingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingError::UnknownKey(key) => write!(
                f,
                "Unknown config key: {key} (expected one of {})",
                SETTING_KEYS.join(", ")
            ),
            SettingError::InvalidNumber { key, value } => {
                write!(f, "{key} expects a whole number of milliseconds, got {value:?}")
            }
        }
    }
}

impl std::error::Error for SettingError {}

fn parse_millis(key: &str, value: &str) -> Result<u64, SettingError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| SettingError::InvalidNumber {
            key: key.to_string(),
            value: value.to_string(),
        })
}

impl Config {
    pub fn resolve(&self) -> Settings {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Config file first, then `env`, then built-in defaults. The token only
    /// ever comes from the environment.
    pub fn resolve_with(&self, env: impl Fn(&str) -> Option<String>) -> Settings {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let api_base_url = non_empty(self.api_base_url.clone())
            .or_else(|| non_empty(env(ENV_API_URL)))
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let blob_base_url = non_empty(self.blob_base_url.clone())
            .or_else(|| non_empty(env(ENV_BLOB_URL)))
            .unwrap_or_else(|| DEFAULT_BLOB_BASE_URL.to_string());
        let upload_url = construct_api_url(
            &api_base_url,
            self.upload_path.as_deref().unwrap_or(DEFAULT_UPLOAD_PATH),
        );

        Settings {
            api_base_url,
            blob_base_url,
            upload_url,
            token: non_empty(env(ENV_TOKEN)),
            poll_interval: Duration::from_millis(
                self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
            typewriter: self.typewriter.clone(),
        }
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), SettingError> {
        match key {
            "api_base_url" => self.api_base_url = Some(value.to_string()),
            "blob_base_url" => self.blob_base_url = Some(value.to_string()),
            "upload_path" => self.upload_path = Some(value.to_string()),
            "poll_interval_ms" => self.poll_interval_ms = Some(parse_millis(key, value)?),
            "typewriter.speed_ms" => self.typewriter.speed_ms = Some(parse_millis(key, value)?),
            "typewriter.interval_ms" => {
                self.typewriter.interval_ms = Some(parse_millis(key, value)?)
            }
            "typewriter.tree_speed_ms" => {
                self.typewriter.tree_speed_ms = Some(parse_millis(key, value)?)
            }
            "typewriter.cursor" => self.typewriter.cursor = Some(value.to_string()),
            _ => return Err(SettingError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: &str) -> Result<(), SettingError> {
        match key {
            "api_base_url" => self.api_base_url = None,
            "blob_base_url" => self.blob_base_url = None,
            "upload_path" => self.upload_path = None,
            "poll_interval_ms" => self.poll_interval_ms = None,
            "typewriter.speed_ms" => self.typewriter.speed_ms = None,
            "typewriter.interval_ms" => self.typewriter.interval_ms = None,
            "typewriter.tree_speed_ms" => self.typewriter.tree_speed_ms = None,
            "typewriter.cursor" => self.typewriter.cursor = None,
            _ => return Err(SettingError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}

pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
