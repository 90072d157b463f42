//! Database configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/golem-db/config.toml)
//! 3. Environment variables (GOLEM_DB_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::MAX_STORED_HOSTS;

/// Environment variable prefix
const ENV_PREFIX: &str = "GOLEM_DB";

/// Name of the database file inside the data directory
const DATABASE_FILE: &str = "golem.db";

/// Default wait for a write lock held by another connection
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 30_000;

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the database file
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// How long a blocked write waits before failing, in milliseconds
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Log filter directive for the CLI (e.g. "info", "debug")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Cap on stored known hosts, defaulting to [`MAX_STORED_HOSTS`]
    ///
    /// The store never trims `known_hosts` itself. Peer discovery reads this
    /// value and prunes past it using [`crate::KnownHost::newest_first`].
    #[serde(default = "default_max_stored_hosts")]
    pub max_stored_hosts: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            busy_timeout_ms: default_busy_timeout_ms(),
            log_level: default_log_level(),
            max_stored_hosts: default_max_stored_hosts(),
        }
    }
}

impl Config {
    /// Configuration rooted at a specific data directory
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration from default location and environment
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

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_BUSY_TIMEOUT_MS", ENV_PREFIX)) {
            self.busy_timeout_ms = val
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}_BUSY_TIMEOUT_MS: {:?}", ENV_PREFIX, val))?;
        }

        if let Ok(val) = std::env::var(format!("{}_LOG_LEVEL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.log_level = val;
            }
        }

        Ok(())
    }

    /// Save configuration to a file
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Save configuration to the default config file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path())
    }

    /// Get the config file path
    ///
    /// Can be overridden with GOLEM_DB_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("golem-db")
            .join("config.toml")
    }

    /// Get the path to the SQLite database
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    /// Busy timeout as a duration
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("golem")
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_stored_hosts() -> usize {
    MAX_STORED_HOSTS
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
        "GOLEM_DB_DATA_DIR",
        "GOLEM_DB_BUSY_TIMEOUT_MS",
        "GOLEM_DB_LOG_LEVEL",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.busy_timeout_ms, 30_000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.max_stored_hosts, MAX_STORED_HOSTS);
        assert!(config.data_dir.ends_with("golem"));
    }

    #[test]
    fn test_database_path() {
        let config = Config::with_data_dir("/data/node");
        assert_eq!(config.database_path(), PathBuf::from("/data/node/golem.db"));
        assert_eq!(config.busy_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("GOLEM_DB_DATA_DIR", "/tmp/golem-test");
        config.apply_env_overrides().unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/golem-test"));
    }

    #[test]
    fn test_env_override_busy_timeout() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("GOLEM_DB_BUSY_TIMEOUT_MS", "500");
        config.apply_env_overrides().unwrap();
        assert_eq!(config.busy_timeout_ms, 500);

        env::set_var("GOLEM_DB_BUSY_TIMEOUT_MS", "soon");
        assert!(config.apply_env_overrides().is_err());
    }

    #[test]
    fn test_env_override_log_level() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("GOLEM_DB_LOG_LEVEL", "debug");
        config.apply_env_overrides().unwrap();
        assert_eq!(config.log_level, "debug");

        // Empty string keeps the current level
        env::set_var("GOLEM_DB_LOG_LEVEL", "");
        config.apply_env_overrides().unwrap();
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            busy_timeout_ms = 1000
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.busy_timeout_ms, 1000);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config::load_from_path(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.busy_timeout_ms, 30_000);
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::with_data_dir("/data/node");
        config.log_level = "warn".to_string();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.data_dir, config.data_dir);
        assert_eq!(loaded.log_level, "warn");
    }
}
