//! User configuration file.
//!
//! # Location
//!
//! - **Windows**: `%LOCALAPPDATA%\common-tpl\config.toml`
//! - **Unix/macOS**: `~/.common-tpl/config.toml`
//!
//! # File Format
//!
//! ```toml
//! base_url = "https://shop.example.com"
//! endpoint = "/common/template"
//! method = "get"
//! param = "tpl"
//! csp_selector = ".csp-data"
//! store_path = "~/.common-tpl/store.json"
//! store_quota_bytes = 5242880
//! debug = true
//! timeout_secs = 30
//! ```
//!
//! Every key is optional; a missing file means all defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::ajax::Method;
use crate::constants::{
    DEFAULT_BASE_URL, DEFAULT_CSP_SELECTOR, DEFAULT_REQUEST_TIMEOUT, DEFAULT_TEMPLATE_ENDPOINT,
    DEFAULT_TEMPLATE_PARAM,
};
use crate::core::TplError;
use crate::utils::fs::{atomic_write, resolve_path};

/// Settings for the template pipeline and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TplConfig {
    /// Prefix for relative endpoints
    pub base_url: String,

    /// Template-serving endpoint path
    pub endpoint: String,

    /// HTTP method of template requests
    pub method: Method,

    /// Request field carrying the batched keys (sent as `<param>[]`)
    pub param: String,

    /// Selector of the hidden CSP data nodes
    pub csp_selector: String,

    /// Durable store file; in-memory storage when unset, except in the CLI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<String>,

    /// Byte budget of the durable store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_quota_bytes: Option<u64>,

    /// Force developer mode regardless of the page's CSP data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,

    /// HTTP timeout in seconds
    pub timeout_secs: u64,
}

impl Default for TplConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            endpoint: DEFAULT_TEMPLATE_ENDPOINT.to_string(),
            method: Method::default(),
            param: DEFAULT_TEMPLATE_PARAM.to_string(),
            csp_selector: DEFAULT_CSP_SELECTOR.to_string(),
            store_path: None,
            store_quota_bytes: None,
            debug: None,
            timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

impl TplConfig {
    /// Load configuration from the default location, or defaults if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory is unknown, or if the file
    /// exists but cannot be read, parsed or validated.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load configuration from `path`, falling back to the default location.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed or
    /// validated.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            tracing::debug!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use common_tpl::config::TplConfig;
    /// use std::path::Path;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let config = TplConfig::load_from(Path::new("/etc/common-tpl.toml")).await?;
    /// println!("Templates come from {}{}", config.base_url, config.endpoint);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid TOML, or
    /// holds values [`TplConfig::validate`] rejects.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = toml::from_str(&content).map_err(|e| TplError::ConfigParseError {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty TOML, atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        let path = path.to_path_buf();

        tokio::task::spawn_blocking(move || atomic_write(&path, content.as_bytes()))
            .await
            .context("Config writer task failed")?
    }

    /// Reject values the pipeline cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`TplError::ConfigError`] naming the offending key.
    pub fn validate(&self) -> Result<(), TplError> {
        let problem = if self.endpoint.trim().is_empty() {
            Some("'endpoint' must not be empty")
        } else if self.param.trim().is_empty() {
            Some("'param' must not be empty")
        } else if self.csp_selector.trim().is_empty() {
            Some("'csp_selector' must not be empty")
        } else if self.timeout_secs == 0 {
            Some("'timeout_secs' must be at least 1")
        } else {
            None
        };

        match problem {
            Some(message) => Err(TplError::ConfigError {
                message: message.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// HTTP timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Whether developer mode is forced on.
    pub fn is_debug(&self) -> bool {
        self.debug.unwrap_or(false)
    }

    /// The configured store file with `~` and variables expanded.
    ///
    /// # Errors
    ///
    /// Returns an error if expansion fails.
    pub fn resolved_store_path(&self) -> Result<Option<PathBuf>> {
        self.store_path.as_deref().map(resolve_path).transpose()
    }

    /// The configured store file, or the default one next to the config file.
    ///
    /// # Errors
    ///
    /// Returns an error if expansion fails or the home directory is unknown.
    pub fn store_path_or_default(&self) -> Result<PathBuf> {
        match self.resolved_store_path()? {
            Some(path) => Ok(path),
            None => Ok(Self::config_dir()?.join("store.json")),
        }
    }

    /// Default configuration file location.
    ///
    /// # Errors
    ///
    /// Returns an error if the home (or, on Windows, local data) directory
    /// cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    fn config_dir() -> Result<PathBuf> {
        let dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("common-tpl")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".common-tpl")
        };
        Ok(dir)
    }
}
