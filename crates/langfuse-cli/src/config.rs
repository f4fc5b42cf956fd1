use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cli::Cli;

pub const DEFAULT_CONFIG_FILE: &str = "langfuse.toml";
pub const DEFAULT_STATE_FILE: &str = "langfuse.state.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub host: Option<String>,
    /// Prefer LANGFUSE_ADMIN_KEY over putting this in a file.
    #[serde(default)]
    pub admin_key: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: None,
            admin_key: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default = "default_state_path")]
    pub path: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

fn default_state_path() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_FILE)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Settings {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(host) = self.api.host.as_deref() {
            let url = Url::parse(host).map_err(|e| format!("api.host is not a valid URL: {e}"))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err("api.host must use http or https".into());
            }
        }
        if self.api.request_timeout_secs == 0 {
            return Err("api.request_timeout_secs must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    pub fn host(&self) -> Result<&str> {
        self.api.host.as_deref().filter(|h| !h.is_empty()).context(
            "No Langfuse host configured. Use --host, set LANGFUSE_HOST, or set api.host in langfuse.toml",
        )
    }

    pub fn admin_key(&self) -> Result<&str> {
        self.api.admin_key.as_deref().filter(|k| !k.is_empty()).context(
            "An admin API key is required to manage organizations. Use --admin-api-key or set LANGFUSE_ADMIN_KEY",
        )
    }

    /// Flags and their env vars win over the config file.
    fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.api.host = Some(host.clone());
        }
        if let Some(key) = &cli.admin_api_key {
            self.api.admin_key = Some(key.clone());
        }
        if let Some(state) = &cli.state {
            self.state.path = state.clone();
        }
        if let Some(level) = &cli.log_level {
            self.logging.level = level.clone();
        }
    }
}

pub mod loader {
    use super::*;
    use config::{Config, Environment, File};

    /// Explicit path, then ./langfuse.toml, then the user config directory.
    fn config_file(path: Option<&Path>) -> Option<PathBuf> {
        if let Some(p) = path {
            return Some(p.to_path_buf());
        }
        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|dir| dir.join("langfuse-provider").join("config.toml"))
            .filter(|p| p.exists())
    }

    pub fn load_config(path: Option<&Path>) -> Result<Settings> {
        let mut builder = Config::builder();
        if let Some(file) = config_file(path) {
            if path.is_some() && !file.exists() {
                anyhow::bail!("Config file not found: {}", file.display());
            }
            builder = builder.add_source(File::from(file));
        }
        // e.g. LANGFUSE__API__REQUEST_TIMEOUT_SECS=60
        builder = builder.add_source(
            Environment::with_prefix("LANGFUSE")
                .try_parsing(true)
                .separator("__"),
        );
        let settings: Settings = builder
            .build()
            .context("config build error")?
            .try_deserialize()
            .context("config deserialize error")?;
        Ok(settings)
    }

    /// Load, apply command-line overrides, validate.
    pub fn load_for_cli(cli: &Cli) -> Result<Settings> {
        let mut settings = load_config(cli.config.as_deref())?;
        settings.apply_overrides(cli);
        settings.validate().map_err(anyhow::Error::msg)?;
        Ok(settings)
    }
}
