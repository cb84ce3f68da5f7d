//! Configuration loading and resolution.
//!
//! Settings come from three places, in increasing precedence:
//!
//! 1. Built-in defaults.
//! 2. An optional TOML file (`./gsync.toml` unless `--config` is given).
//! 3. Command-line flags.
//!
//! The API token is never read from the file; it comes from the environment
//! variable named by `api.token_env` (default `GSYNC_API_TOKEN`).
//!
//! ```toml
//! [api]
//! base_url = "https://tests.example.com/api"
//! timeout_secs = 30
//! token_env = "GSYNC_API_TOKEN"
//!
//! [sync]
//! extension = ".feature"
//! warn_uncommitted = true
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "./gsync.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Name of the environment variable holding the API token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            token_env: default_token_env(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_token_env() -> String {
    "GSYNC_API_TOKEN".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    /// Files ending with this extension are spec files.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Warn about spec files with uncommitted edits before syncing.
    #[serde(default = "default_warn_uncommitted")]
    pub warn_uncommitted: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            warn_uncommitted: default_warn_uncommitted(),
        }
    }
}

fn default_extension() -> String {
    gherkin_sync_core::classify::DEFAULT_EXTENSION.to_string()
}
fn default_warn_uncommitted() -> bool {
    true
}

/// Load and validate a configuration file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists. A missing file falls back to defaults unless
/// the path was given explicitly.
pub fn load_config_or_default(path: &Path, explicit: bool) -> Result<Config> {
    if !explicit && !path.exists() {
        return Ok(Config::default());
    }
    load_config(path)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.api.timeout_secs == 0 {
        bail!("api.timeout_secs must be > 0");
    }
    if !config.api.base_url.starts_with("http://") && !config.api.base_url.starts_with("https://")
    {
        bail!(
            "api.base_url must start with http:// or https:// (got '{}')",
            config.api.base_url
        );
    }
    if config.api.token_env.trim().is_empty() {
        bail!("api.token_env must not be empty");
    }
    if !config.sync.extension.starts_with('.') || config.sync.extension.len() < 2 {
        bail!(
            "sync.extension must look like '.feature' (got '{}')",
            config.sync.extension
        );
    }
    Ok(())
}

/// Command-line values that override the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub dry_run: bool,
    pub debug: bool,
}

/// Fully resolved settings for one `push` run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub project_id: i64,
    pub api_url: String,
    pub token: String,
    pub timeout: Duration,
    pub extension: String,
    pub warn_uncommitted: bool,
    pub dry_run: bool,
    pub debug: bool,
}

impl Settings {
    /// Combine file config, CLI overrides, and the token taken from the
    /// environment. Fails before any I/O when the token is missing.
    pub fn resolve(
        config: &Config,
        project_id: i64,
        overrides: Overrides,
        token: Option<String>,
    ) -> Result<Self> {
        let token = match token.map(|t| t.trim().to_string()) {
            Some(t) if !t.is_empty() => t,
            _ => bail!(
                "{} is not set; export your API token before running a sync",
                config.api.token_env
            ),
        };

        let api_url = overrides
            .api_url
            .unwrap_or_else(|| config.api.base_url.clone());
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            bail!("API URL must start with http:// or https:// (got '{}')", api_url);
        }

        Ok(Self {
            project_id,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
            timeout: Duration::from_secs(config.api.timeout_secs),
            extension: config.sync.extension.clone(),
            warn_uncommitted: config.sync.warn_uncommitted,
            dry_run: overrides.dry_run,
            debug: overrides.debug,
        })
    }
}

/// Read the API token from the environment variable named in `config`.
pub fn token_from_env(config: &Config) -> Option<String> {
    std::env::var(&config.api.token_env).ok()
}

/// Coerce a project identifier to an integer.
pub fn parse_project_id(s: &str) -> Result<i64, String> {
    s.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| format!("project id must be a positive integer, got '{}'", s))
}
