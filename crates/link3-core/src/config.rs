//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/link3/config.toml)
//! 3. Environment variables (LINK3_* prefix)
//!
//! Environment variables take precedence over config file values.
//! Hub data itself is never stored locally; the remote store is the only
//! source of truth.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::AccountId;

/// Environment variable prefix
const ENV_PREFIX: &str = "LINK3";

/// Keys accepted by [`Config::set`]
pub const KEYS: &[&str] = &[
    "gateway_url",
    "upload_url",
    "account_id",
    "link_limit",
    "request_timeout_secs",
    "ipfs_gateway",
    "log_level",
    "log_file",
];

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the hub service
    #[serde(default)]
    pub gateway_url: Option<String>,

    /// Image upload endpoint (uploads are disabled when unset)
    #[serde(default)]
    pub upload_url: Option<String>,

    /// Account signed in at startup
    #[serde(default)]
    pub account_id: Option<String>,

    /// Maximum number of links per hub
    #[serde(default = "default_link_limit")]
    pub link_limit: usize,

    /// Timeout for every remote call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Public gateway used to display image references
    #[serde(default = "default_ipfs_gateway")]
    pub ipfs_gateway: String,

    /// Default log level for link3 crates
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Write logs here instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway_url: None,
            upload_url: None,
            account_id: None,
            link_limit: default_link_limit(),
            request_timeout_secs: default_request_timeout_secs(),
            ipfs_gateway: default_ipfs_gateway(),
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (LINK3_GATEWAY_URL, LINK3_ACCOUNT_ID, ...)
    /// 2. Config file (~/.config/link3/config.toml or LINK3_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// Values that don't parse are ignored.
    fn apply_env_overrides(&mut self) {
        let var = |name: &str| std::env::var(format!("{}_{}", ENV_PREFIX, name)).ok();
        let optional = |val: String| if val.is_empty() { None } else { Some(val) };

        if let Some(val) = var("GATEWAY_URL") {
            self.gateway_url = optional(val);
        }
        if let Some(val) = var("UPLOAD_URL") {
            self.upload_url = optional(val);
        }
        if let Some(val) = var("ACCOUNT_ID") {
            self.account_id = optional(val);
        }
        if let Some(limit) = var("LINK_LIMIT").and_then(|v| v.parse().ok()) {
            self.link_limit = limit;
        }
        if let Some(secs) = var("REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.request_timeout_secs = secs;
        }
        if let Some(val) = var("LOG_LEVEL") {
            self.log_level = val;
        }
    }

    /// Set a value by key, as given on the command line
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let optional = || {
            if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            }
        };

        match key {
            "gateway_url" => self.gateway_url = optional(),
            "upload_url" => self.upload_url = optional(),
            "account_id" => self.account_id = optional(),
            "link_limit" => {
                self.link_limit = value
                    .parse()
                    .with_context(|| format!("link_limit must be a number, got {:?}", value))?
            }
            "request_timeout_secs" => {
                self.request_timeout_secs = value.parse().with_context(|| {
                    format!("request_timeout_secs must be a number, got {:?}", value)
                })?
            }
            "ipfs_gateway" => self.ipfs_gateway = value.to_string(),
            "log_level" => self.log_level = value.to_string(),
            "log_file" => self.log_file = optional().map(PathBuf::from),
            _ => bail!("Unknown config key {:?} (expected one of: {})", key, KEYS.join(", ")),
        }
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with LINK3_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("link3")
            .join("config.toml")
    }

    /// Configured account, if it is a usable id
    pub fn account(&self) -> Option<AccountId> {
        self.account_id.as_deref().and_then(AccountId::new)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Public URL for an image reference
    pub fn image_url(&self, reference: &str) -> String {
        format!("{}/{}", self.ipfs_gateway.trim_end_matches('/'), reference)
    }
}

fn default_link_limit() -> usize {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_ipfs_gateway() -> String {
    "https://ipfs.io/ipfs/".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "LINK3_GATEWAY_URL",
        "LINK3_UPLOAD_URL",
        "LINK3_ACCOUNT_ID",
        "LINK3_LINK_LIMIT",
        "LINK3_REQUEST_TIMEOUT_SECS",
        "LINK3_LOG_LEVEL",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.link_limit, 10);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.log_level, "warn");
        assert!(config.gateway_url.is_none());
        assert!(config.account().is_none());
    }

    #[test]
    fn test_env_override_gateway_and_account() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("LINK3_GATEWAY_URL", "http://localhost:3030");
        env::set_var("LINK3_ACCOUNT_ID", "alice.testnet");
        config.apply_env_overrides();

        assert_eq!(config.gateway_url.as_deref(), Some("http://localhost:3030"));
        assert_eq!(config.account().unwrap().as_str(), "alice.testnet");

        // Empty string clears it
        env::set_var("LINK3_ACCOUNT_ID", "");
        config.apply_env_overrides();
        assert!(config.account_id.is_none());
    }

    #[test]
    fn test_env_override_numbers() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("LINK3_LINK_LIMIT", "3");
        env::set_var("LINK3_REQUEST_TIMEOUT_SECS", "5");
        config.apply_env_overrides();
        assert_eq!(config.link_limit, 3);
        assert_eq!(config.request_timeout_secs, 5);

        env::set_var("LINK3_LINK_LIMIT", "many");
        config.apply_env_overrides();
        assert_eq!(config.link_limit, 3);
    }

    #[test]
    fn test_set() {
        let mut config = Config::default();

        config.set("upload_url", "http://localhost:4000/api/file").unwrap();
        config.set("link_limit", "12").unwrap();
        config.set("log_file", "/tmp/link3.log").unwrap();
        assert_eq!(config.upload_url.as_deref(), Some("http://localhost:4000/api/file"));
        assert_eq!(config.link_limit, 12);
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/link3.log")));

        config.set("upload_url", "").unwrap();
        assert!(config.upload_url.is_none());

        assert!(config.set("link_limit", "ten").is_err());
        assert!(config.set("colour", "blue").is_err());
    }

    #[test]
    fn test_image_url() {
        let mut config = Config::default();
        assert_eq!(config.image_url("QmAbc"), "https://ipfs.io/ipfs/QmAbc");

        config.ipfs_gateway = "https://cloudflare-ipfs.com/ipfs".to_string();
        assert_eq!(config.image_url("QmAbc"), "https://cloudflare-ipfs.com/ipfs/QmAbc");
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            gateway_url = "http://example.com/api"
            account_id = "bob.testnet"
            link_limit = 5
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.gateway_url.as_deref(), Some("http://example.com/api"));
        assert_eq!(config.account_id.as_deref(), Some("bob.testnet"));
        assert_eq!(config.link_limit, 5);
        assert_eq!(config.ipfs_gateway, "https://ipfs.io/ipfs/");
    }

    #[test]
    fn test_save_and_load() {
        let _guard = EnvGuard::new(ENV_VARS);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.set("gateway_url", "http://localhost:3030").unwrap();
        config.set("account_id", "carol.testnet").unwrap();
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config, Config::default());
    }
}
