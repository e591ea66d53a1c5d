//! Application configuration backed by the `config` crate.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Backend used when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";
/// Number of genre tags requested for the selection screen.
pub const DEFAULT_TAG_COUNT: usize = 10;
/// Directory under the user's config dir holding `config.toml`.
pub const CONFIG_DIR_NAME: &str = "gamefinder";

const DEFAULT_CONFIG: &str = r#"# GameFinder client configuration.
# Every key can be overridden with a GAMEFINDER_<KEY> environment variable.

# Base URL of the recommendation backend.
api_base_url = "http://localhost:3000"

# How many genre tags to offer on the selection screen.
tag_count = 10

# Per-request timeout in seconds. Leave unset to use the HTTP client default.
# request_timeout_secs = 30

# Extra attempts when loading the signed-in user's search history.
history_retries = 1

# Seconds before a loaded search history is considered stale.
history_stale_secs = 300

# Directory for gamefinder.log.
log_dir = "logs"
"#;

/// Runtime settings for the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Base URL every API path is joined onto.
    pub api_base_url: String,
    /// Tag count requested from `/game/tags`.
    pub tag_count: usize,
    /// Optional request timeout; `None` keeps the transport default.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Extra attempts for the history request.
    pub history_retries: u32,
    /// Staleness window for the cached history.
    pub history_stale_secs: u64,
    /// Where the log file is written.
    pub log_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            tag_count: DEFAULT_TAG_COUNT,
            request_timeout_secs: None,
            history_retries: 1,
            history_stale_secs: 300,
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file location and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load configuration from `path` (optional) layered under `GAMEFINDER_*` variables.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let defaults = Self::default();
        let settings = Config::builder()
            .set_default("api_base_url", defaults.api_base_url.as_str())?
            .set_default("tag_count", defaults.tag_count as i64)?
            .set_default("history_retries", i64::from(defaults.history_retries))?
            .set_default("history_stale_secs", defaults.history_stale_secs as i64)?
            .set_default("log_dir", defaults.log_dir.to_string_lossy().as_ref())?
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("GAMEFINDER").try_parsing(true))
            .build()
            .with_context(|| format!("failed to read configuration {}", path.display()))?;

        let mut config: AppConfig = settings
            .try_deserialize()
            .context("failed to parse configuration")?;
        config.api_base_url = config.api_base_url.trim_end_matches('/').to_string();
        Ok(config)
    }

    /// Timeout to apply to outgoing requests, if any.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Staleness window for the history cache.
    pub fn history_stale_after(&self) -> Duration {
        Duration::from_secs(self.history_stale_secs)
    }
}

/// Location of the user's configuration file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
        .join("config.toml")
}

/// Write the default configuration file when none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write default config {}", path.display()))?;
    info!(path = %path.display(), "Wrote default configuration");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_from(dir.path().join("absent.toml"))?;
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.tag_count, DEFAULT_TAG_COUNT);
        assert_eq!(config.history_retries, 1);
        assert!(config.request_timeout().is_none());
        Ok(())
    }

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "api_base_url = \"https://games.example.com/\"\ntag_count = 4\nrequest_timeout_secs = 12\n",
        )?;

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.api_base_url, "https://games.example.com");
        assert_eq!(config.tag_count, 4);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(12)));
        assert_eq!(config.history_stale_after(), Duration::from_secs(300));
        Ok(())
    }

    #[test]
    fn default_file_parses_back_to_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("config.toml");
        write_default_config(&path)?;
        assert!(path.exists());

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config, AppConfig::default());

        // An existing file is never overwritten.
        fs::write(&path, "tag_count = 7\n")?;
        write_default_config(&path)?;
        assert_eq!(AppConfig::load_from(&path)?.tag_count, 7);
        Ok(())
    }
}
