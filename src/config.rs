//! Configuration for rental-scout

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Backend base URL, without the `/api` suffix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Bearer token of the logged-in user
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Idle time before a typed search is committed
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Results per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Local file holding owner-entered denial reasons
    #[serde(default = "default_denial_log")]
    pub denial_log: PathBuf,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_page_size() -> u32 {
    10
}

fn default_denial_log() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rental-scout")
        .join("denial_reasons.json")
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            access_token: None,
            user_id: None,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            page_size: default_page_size(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            denial_log: default_denial_log(),
        }
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Page size clamped to what the backend accepts
    pub fn page_size(&self) -> u32 {
        self.page_size.clamp(1, 50)
    }
}

impl Config {
    /// Default config path
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(env_path) = std::env::var("RENTAL_SCOUT_CONFIG") {
            return Ok(PathBuf::from(env_path));
        }

        let local = PathBuf::from("rental-scout.toml");
        if local.exists() {
            return Ok(local);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("rental-scout");

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from default path, falling back to defaults
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Load config from specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Token from the environment wins over the file
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("RENTAL_SCOUT_TOKEN") {
            if !token.is_empty() {
                self.api.access_token = Some(token);
            }
        }
    }

    /// Save config to specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        let with_comments = format!(
            "# rental-scout configuration\n\
             # Set api.access_token and api.user_id to use wishlist and viewing requests.\n\n\
             {}",
            content
        );

        std::fs::write(path, with_comments).context("Failed to write config file")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [api]
            base_url = "https://rent.example.com"
            "#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://rent.example.com");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.search.debounce(), Duration::from_millis(500));
        assert_eq!(config.search.page_size(), 10);
    }

    #[test]
    fn page_size_is_clamped() {
        let search = SearchConfig {
            debounce_ms: 500,
            page_size: 500,
        };
        assert_eq!(search.page_size(), 50);
        let search = SearchConfig {
            debounce_ms: 500,
            page_size: 0,
        };
        assert_eq!(search.page_size(), 1);
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.api.user_id = Some(12);
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api.user_id, Some(12));
        assert_eq!(loaded.search.page_size, 10);
    }
}
