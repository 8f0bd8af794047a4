//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/alki/config.toml)
//! 3. Environment variables (ALKI_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable prefix
const ENV_PREFIX: &str = "ALKI";

/// Collection resource of a locally running item server
pub const DEFAULT_API_URL: &str = "http://localhost:4177/api/items";

/// How edits and removals reach the remote collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Writes go to the remote; removals wait for confirmation
    #[default]
    Remote,
    /// Everything stays in memory; nothing is sent
    Local,
}

impl FromStr for SyncMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "remote" => Ok(SyncMode::Remote),
            "local" => Ok(SyncMode::Local),
            other => bail!("Invalid mode '{}'. Use 'remote' or 'local'.", other),
        }
    }
}

/// Which remote collection implementation to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// REST service at `api_url`
    #[default]
    Http,
    /// JSON document at `<data_dir>/db.json`
    File,
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Backend::Http),
            "file" => Ok(Backend::File),
            other => bail!("Invalid backend '{}'. Use 'http' or 'file'.", other),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Collection resource of the item server
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Remote or local-only operation
    #[serde(default)]
    pub mode: SyncMode,

    /// Remote collection implementation
    #[serde(default)]
    pub backend: Backend,

    /// Directory for the file backend and logs
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Delay after the last edit before it is written
    #[serde(default = "default_quiet_period_ms")]
    pub quiet_period_ms: u64,

    /// Upper bound for a single HTTP request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Log file (logs go to stderr when unset)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            mode: SyncMode::default(),
            backend: Backend::default(),
            data_dir: default_data_dir(),
            quiet_period_ms: default_quiet_period_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (ALKI_API_URL, ALKI_MODE, ...)
    /// 2. Config file (~/.config/alki/config.toml or ALKI_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        config.ensure_data_dir()?;
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
        // ALKI_API_URL
        if let Ok(val) = std::env::var(format!("{}_API_URL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.api_url = val;
            }
        }

        // ALKI_MODE
        if let Ok(val) = std::env::var(format!("{}_MODE", ENV_PREFIX)) {
            self.mode = val.parse().context("Invalid ALKI_MODE")?;
        }

        // ALKI_BACKEND
        if let Ok(val) = std::env::var(format!("{}_BACKEND", ENV_PREFIX)) {
            self.backend = val.parse().context("Invalid ALKI_BACKEND")?;
        }

        // ALKI_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // ALKI_QUIET_PERIOD_MS
        if let Ok(val) = std::env::var(format!("{}_QUIET_PERIOD_MS", ENV_PREFIX)) {
            self.quiet_period_ms = val
                .parse()
                .with_context(|| format!("Invalid ALKI_QUIET_PERIOD_MS: {:?}", val))?;
        }

        Ok(())
    }

    /// Ensure data directory exists when the file backend needs it
    fn ensure_data_dir(&self) -> Result<()> {
        if self.backend == Backend::File && !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with ALKI_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("alki")
            .join("config.toml")
    }

    /// Get the path to the file backend's document
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("db.json")
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("alki")
}

fn default_quiet_period_ms() -> u64 {
    400
}

fn default_request_timeout_secs() -> u64 {
    30
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
            // Clear all the vars
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
        "ALKI_API_URL",
        "ALKI_MODE",
        "ALKI_BACKEND",
        "ALKI_DATA_DIR",
        "ALKI_QUIET_PERIOD_MS",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api_url, "http://localhost:4177/api/items");
        assert_eq!(config.mode, SyncMode::Remote);
        assert_eq!(config.backend, Backend::Http);
        assert_eq!(config.quiet_period(), Duration::from_millis(400));
        assert!(config.data_dir.ends_with("alki"));
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_store_path() {
        let config = Config::default();
        assert!(config.store_path().ends_with("db.json"));
    }

    #[test]
    fn test_env_override_mode_and_backend() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("ALKI_MODE", "LOCAL");
        env::set_var("ALKI_BACKEND", "file");
        config.apply_env_overrides().unwrap();

        assert_eq!(config.mode, SyncMode::Local);
        assert_eq!(config.backend, Backend::File);

        env::set_var("ALKI_MODE", "sideways");
        assert!(config.apply_env_overrides().is_err());
    }

    #[test]
    fn test_env_override_api_url() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("ALKI_API_URL", "http://example.com/items");
        config.apply_env_overrides().unwrap();
        assert_eq!(config.api_url, "http://example.com/items");

        // Empty string keeps the current value
        env::set_var("ALKI_API_URL", "");
        config.apply_env_overrides().unwrap();
        assert_eq!(config.api_url, "http://example.com/items");
    }

    #[test]
    fn test_env_override_quiet_period() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("ALKI_QUIET_PERIOD_MS", "50");
        config.apply_env_overrides().unwrap();
        assert_eq!(config.quiet_period(), Duration::from_millis(50));

        env::set_var("ALKI_QUIET_PERIOD_MS", "soon");
        assert!(config.apply_env_overrides().is_err());
    }

    #[test]
    fn test_serialization() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config {
            api_url: "http://items.example.com/api/items".to_string(),
            mode: SyncMode::Local,
            backend: Backend::File,
            data_dir: PathBuf::from("/data/alki"),
            quiet_period_ms: 250,
            request_timeout_secs: 5,
            log_file: Some(PathBuf::from("/tmp/alki.log")),
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("mode = \"local\""));
        assert!(toml_str.contains("backend = \"file\""));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.api_url, config.api_url);
        assert_eq!(parsed.mode, config.mode);
        assert_eq!(parsed.quiet_period_ms, 250);
        assert_eq!(parsed.log_file, config.log_file);
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            api_url = "http://example.com/api/items"
            mode = "local"
            quiet_period_ms = 100
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.api_url, "http://example.com/api/items");
        assert_eq!(config.mode, SyncMode::Local);
        assert_eq!(config.backend, Backend::Http);
        assert_eq!(config.quiet_period_ms, 100);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        // Should return defaults when file doesn't exist
        assert_eq!(config.mode, SyncMode::Remote);
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.backend = Backend::File;
        config.data_dir = temp_dir.path().join("data");
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.backend, Backend::File);
        // The file backend's data directory is created on load
        assert!(loaded.data_dir.exists());
    }
}
