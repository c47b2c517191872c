//! Configuration management for the FoodShare client.
//!
//! Loads configuration from ${FOODSHARE_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for FoodShare configuration and credential files.
    //!
    //! FOODSHARE_HOME resolution order:
    //! 1. FOODSHARE_HOME environment variable (if set)
    //! 2. ~/.config/foodshare (default)

    use std::path::PathBuf;

    /// Returns the FoodShare home directory.
    ///
    /// Checks FOODSHARE_HOME env var first, falls back to ~/.config/foodshare
    pub fn foodshare_home() -> PathBuf {
        if let Ok(home) = std::env::var("FOODSHARE_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("foodshare"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        foodshare_home().join("config.toml")
    }

    /// Returns the path to the stored credentials file.
    pub fn credentials_path() -> PathBuf {
        foodshare_home().join("credentials.json")
    }
}

/// Remote service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the FoodShare service (for proxies or self-hosted setups).
    pub base_url: Option<String>,

    /// Upper bound for a single request round trip, in milliseconds.
    pub request_timeout_ms: u64,
}

impl ApiConfig {
    /// Default service address, matching a local development backend.
    pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
    const DEFAULT_TIMEOUT_MS: u64 = 10_000;

    /// Resolves the effective base URL with precedence: env > config > default.
    ///
    /// `FOODSHARE_API_URL` wins over the config file value. The result must
    /// parse as a URL; trailing slashes are stripped so paths can be joined
    /// with a plain `/`-prefixed suffix.
    pub fn resolve_base_url(&self) -> Result<String> {
        if let Ok(env_url) = std::env::var("FOODSHARE_API_URL") {
            let trimmed = env_url.trim();
            if !trimmed.is_empty() {
                validate_url(trimmed)?;
                return Ok(trimmed.trim_end_matches('/').to_string());
            }
        }

        if let Some(config_url) = self.base_url.as_deref() {
            let trimmed = config_url.trim();
            if !trimmed.is_empty() {
                validate_url(trimmed)?;
                return Ok(trimmed.trim_end_matches('/').to_string());
            }
        }

        Ok(Self::DEFAULT_BASE_URL.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout_ms: Self::DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Validates that a URL is well-formed.
fn validate_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid FoodShare base URL: {url}"))?;
    Ok(())
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote service configuration.
    pub api: ApiConfig,
}

impl Config {
    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}
