//! Application configuration: parsing, defaults, and environment overrides.
//!
//! A small TOML file drives the binary and the analytics service:
//!
//! ```toml
//! [database]
//! url = "sqlite://data/vehicle_data.db"
//!
//! [logging]
//! filter = "info,registration_stats=debug"
//!
//! [analytics]
//! top_n = 10
//! ```
//!
//! Every section and key is optional. Unknown keys are rejected so typos surface
//! early. `DATABASE_URL` in the environment takes precedence over `[database] url`
//! (see [`AppConfig::with_env_overrides`]).

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use toml::from_str;

/// Default SQLite location, relative to the working directory.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/vehicle_data.db";

/// Default `tracing` filter directive.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default number of rows returned by top-performer rankings.
pub const DEFAULT_TOP_N: usize = 10;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Where the registration store lives.
    #[serde(default)]
    pub database: DatabaseCfg,
    /// Log filtering.
    #[serde(default)]
    pub logging: LoggingCfg,
    /// Analytics defaults.
    #[serde(default)]
    pub analytics: AnalyticsCfg,
}

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseCfg {
    /// `sqlite://path`, `sqlite:path`, a bare path, or `:memory:`.
    #[serde(default = "default_database_url")]
    pub url: String,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingCfg {
    /// `EnvFilter` directive string; `RUST_LOG` wins when set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

/// `[analytics]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyticsCfg {
    /// Default limit for top-performer rankings. Must be at least 1.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

impl Default for DatabaseCfg {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

impl Default for LoggingCfg {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Default for AnalyticsCfg {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
        }
    }
}

impl AppConfig {
    /// Apply environment overrides (`DATABASE_URL`).
    pub fn with_env_overrides(self) -> Self {
        self.with_database_url(std::env::var("DATABASE_URL").ok())
    }

    /// Replace the database URL when `url` is set and not blank.
    pub fn with_database_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()) {
            tracing::debug!(%url, "database url overridden");
            self.database.url = url;
        }
        self
    }
}

/// Trim values and reject settings that cannot work.
fn normalize(cfg: &mut AppConfig) -> anyhow::Result<()> {
    cfg.database.url = cfg.database.url.trim().to_string();
    if cfg.database.url.is_empty() {
        bail!("database.url cannot be empty");
    }
    cfg.logging.filter = cfg.logging.filter.trim().to_string();
    if cfg.logging.filter.is_empty() {
        cfg.logging.filter = default_log_filter();
    }
    if cfg.analytics.top_n == 0 {
        bail!("analytics.top_n must be at least 1");
    }
    Ok(())
}

/// Parse and normalize configuration from a TOML string.
pub fn load_config_str(toml_str: &str) -> anyhow::Result<AppConfig> {
    let mut cfg: AppConfig = from_str(toml_str).context("failed to parse config TOML")?;
    normalize(&mut cfg).context("invalid configuration")?;
    Ok(cfg)
}

/// Read a configuration file from disk, parse, and normalize it.
///
/// See [`load_config_str`] for details.
pub fn load_config_path(path: impl AsRef<std::path::Path>) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read config file {}", path.as_ref().display()))?;
    load_config_str(&text)
}
