//! Configuration.
//!
//! Loaded from a TOML file (default `dataprobe.toml` in the working
//! directory, optional), then patched from the environment:
//!
//! | Variable | Field |
//! | --- | --- |
//! | `DATAPROBE_MCP_URL` | `mcp.url` |
//! | `DATAPROBE_DB` | `sales.database` |
//! | `DATAPROBE_OUTPUT` | `report.output_dir` |
//!
//! Every field has a default, so an empty file is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::quotes::{eastmoney, sina, tencent, ProviderKind};
use crate::shared::logging::LogConfig;

/// File looked up when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "dataprobe.toml";

/// MCP server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McpSettings {
    /// Server endpoint
    pub url: String,
    /// Per-request timeout, seconds
    pub timeout_secs: u64,
    /// Name announced in `clientInfo`
    pub client_name: String,
    /// Pause between consecutive searches, milliseconds
    pub pause_ms: u64,
    /// Default search keywords for `feeds trends`
    pub search_keywords: Vec<String>,
    /// Feeds kept per search keyword
    pub feeds_per_keyword: usize,
}

impl Default for McpSettings {
    fn default() -> Self {
        Self {
            url: crate::DEFAULT_MCP_URL.to_string(),
            timeout_secs: crate::DEFAULT_REQUEST_TIMEOUT_MS / 1000,
            client_name: env!("CARGO_PKG_NAME").to_string(),
            pause_ms: 1000,
            search_keywords: ["爆款", "热门", "种草", "必看", "推荐"]
                .into_iter()
                .map(String::from)
                .collect(),
            feeds_per_keyword: 10,
        }
    }
}

impl McpSettings {
    /// Timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Pause as a [`Duration`].
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }
}

/// Quote endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotesConfig {
    /// Sina endpoint
    pub sina_url: String,
    /// Tencent endpoint
    pub tencent_url: String,
    /// Eastmoney quote endpoint
    pub eastmoney_url: String,
    /// Eastmoney history endpoint
    pub eastmoney_history_url: String,
    /// Per-request timeout, seconds
    pub timeout_secs: u64,
    /// Providers used when none is given on the command line
    pub providers: Vec<ProviderKind>,
    /// Day-over-day move, percent, that raises a price alert
    pub alert_threshold_pct: f64,
}

impl Default for QuotesConfig {
    fn default() -> Self {
        Self {
            sina_url: sina::DEFAULT_BASE_URL.to_string(),
            tencent_url: tencent::DEFAULT_BASE_URL.to_string(),
            eastmoney_url: eastmoney::DEFAULT_BASE_URL.to_string(),
            eastmoney_history_url: eastmoney::DEFAULT_HISTORY_URL.to_string(),
            timeout_secs: 10,
            providers: ProviderKind::ALL.to_vec(),
            alert_threshold_pct: 5.0,
        }
    }
}

/// Sales database settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalesConfig {
    /// Path of the SQLite export; required by the `sales` commands
    pub database: Option<PathBuf>,
}

/// Report output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Output directory
    pub output_dir: PathBuf,
    /// Write a UTF-8 BOM at the start of CSV files
    pub csv_bom: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("reports"),
            csv_bom: true,
        }
    }
}

/// Whole configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// `[mcp]`
    pub mcp: McpSettings,
    /// `[quotes]`
    pub quotes: QuotesConfig,
    /// `[sales]`
    pub sales: SalesConfig,
    /// `[report]`
    pub report: ReportConfig,
    /// `[logging]`
    pub logging: LogConfig,
}

impl AppConfig {
    /// Parse TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("invalid TOML: {e}")))
    }

    /// Load `path`. The file must exist.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {e}", path.display())))?;
        Self::parse(&content)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))
    }

    /// Load `path` when given, else [`DEFAULT_CONFIG_FILE`] when present,
    /// else defaults; then apply the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            },
            None => {
                debug!("no configuration file, using defaults");
                Self::default()
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Override fields from environment variables read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty("DATAPROBE_MCP_URL") {
            self.mcp.url = url;
        }
        if let Some(db) = non_empty("DATAPROBE_DB") {
            self.sales.database = Some(PathBuf::from(db));
        }
        if let Some(dir) = non_empty("DATAPROBE_OUTPUT") {
            self.report.output_dir = PathBuf::from(dir);
        }
    }

    /// Check URLs and limits.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("mcp.url", &self.mcp.url),
            ("quotes.sina_url", &self.quotes.sina_url),
            ("quotes.tencent_url", &self.quotes.tencent_url),
            ("quotes.eastmoney_url", &self.quotes.eastmoney_url),
            ("quotes.eastmoney_history_url", &self.quotes.eastmoney_history_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| Error::config(format!("{name} = {value:?}: {e}")))?;
        }
        if self.mcp.timeout_secs == 0 || self.quotes.timeout_secs == 0 {
            return Err(Error::config("timeouts must be at least one second"));
        }
        let threshold = self.quotes.alert_threshold_pct;
        if threshold.is_nan() || threshold <= 0.0 {
            return Err(Error::config("quotes.alert_threshold_pct must be positive"));
        }
        Ok(())
    }
}
