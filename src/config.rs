use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Share server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Base URL of the share server (e.g., "http://localhost:8080")
    pub server_url: Option<String>,
    /// Seconds before a share request is abandoned
    pub timeout_secs: u64,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ShareConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Rate used by `log summary`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    pub rate_per_hour: f64,
    pub currency: String,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            rate_per_hour: 0.0,
            currency: "USD".to_string(),
        }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Path to the SQLite database
    pub database_path: ConfigValue<PathBuf>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    pub share: ShareConfig,
    pub billing: BillingConfig,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    share: Option<ShareConfig>,
    billing: Option<BillingConfig>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut database_path = ConfigValue::new(
            Self::default_data_dir().join("worklog.db"),
            ConfigSource::Default,
        );
        let mut config_file = None;
        let mut share = ShareConfig::default();
        let mut billing = BillingConfig::default();

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(db_path) = file_config.database_path {
                // Resolve relative paths against config file's directory
                let resolved_path = if db_path.is_relative() {
                    path.parent().map(|p| p.join(&db_path)).unwrap_or(db_path)
                } else {
                    db_path
                };
                database_path = ConfigValue::new(resolved_path, ConfigSource::File);
            }
            if let Some(share_config) = file_config.share {
                share = share_config;
            }
            if let Some(billing_config) = file_config.billing {
                billing = billing_config;
            }
        }

        if let Ok(db_path) = std::env::var("WORKLOG_DATABASE_PATH") {
            database_path = ConfigValue::new(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Ok(url) = std::env::var("WORKLOG_SHARE_URL") {
            share.server_url = Some(url);
        }
        if let Ok(timeout) = std::env::var("WORKLOG_SHARE_TIMEOUT") {
            share.timeout_secs = timeout
                .parse()
                .map_err(|_| ConfigError::InvalidValue("WORKLOG_SHARE_TIMEOUT", timeout))?;
        }

        Ok(Self {
            database_path,
            config_file,
            share,
            billing,
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/worklog/
    /// - macOS: ~/Library/Application Support/worklog/
    /// - Windows: %APPDATA%/worklog/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("worklog")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/worklog/
    /// - macOS: ~/Library/Application Support/worklog/
    /// - Windows: %APPDATA%/worklog/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("worklog")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }

    /// Writes a commented starter config to `path`.
    pub fn write_template(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteError(path.to_path_buf(), e))?;
        }
        std::fs::write(path, TEMPLATE).map_err(|e| ConfigError::WriteError(path.to_path_buf(), e))
    }
}

const TEMPLATE: &str = r#"# worklog configuration

# database_path: /path/to/worklog.db

share:
  # server_url: "http://localhost:8080"
  timeout_secs: 10

billing:
  rate_per_hour: 0
  currency: USD
"#;

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    WriteError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::WriteError(path, e) => {
                write!(f, "Failed to write config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidValue(name, value) => {
                write!(f, "Invalid value for {}: '{}'", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let config = Config::load(Some(config_path)).unwrap();
        assert!(config
            .database_path
            .value
            .to_string_lossy()
            .contains("worklog.db"));
        assert_eq!(config.database_path.source, ConfigSource::Default);
        assert_eq!(config.share.timeout_secs, 10);
        assert_eq!(config.billing.currency, "USD");
        assert!(config.config_file.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "database_path: /custom/path/db.sqlite").unwrap();
        writeln!(file, "share:").unwrap();
        writeln!(file, "  server_url: http://share.example.com").unwrap();
        writeln!(file, "  timeout_secs: 3").unwrap();
        writeln!(file, "billing:").unwrap();
        writeln!(file, "  rate_per_hour: 45.5").unwrap();
        writeln!(file, "  currency: EUR").unwrap();

        let config = Config::load(Some(config_path.clone())).unwrap();
        assert_eq!(
            config.database_path.value,
            PathBuf::from("/custom/path/db.sqlite")
        );
        assert_eq!(config.database_path.source, ConfigSource::File);
        assert_eq!(
            config.share.server_url.as_deref(),
            Some("http://share.example.com")
        );
        assert_eq!(config.share.timeout(), Duration::from_secs(3));
        assert_eq!(config.billing.rate_per_hour, 45.5);
        assert_eq!(config.billing.currency, "EUR");
        assert_eq!(config.config_file, Some(config_path));
    }

    #[test]
    fn test_relative_database_path() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "database_path: data/w.db\n").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.database_path.value, temp_dir.path().join("data/w.db"));
    }

    #[test]
    fn test_partial_share_section_keeps_defaults() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "share:\n  server_url: http://x\n").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.share.timeout_secs, 10);
        assert_eq!(config.database_path.source, ConfigSource::Default);
    }

    #[test]
    #[ignore] // Run with --ignored; env vars can pollute parallel tests
    fn test_env_var_overrides_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "database_path: /from/file.db\n").unwrap();

        std::env::set_var("WORKLOG_DATABASE_PATH", "/from/env.db");

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.database_path.value, PathBuf::from("/from/env.db"));
        assert_eq!(config.database_path.source, ConfigSource::Environment);

        std::env::remove_var("WORKLOG_DATABASE_PATH");
    }

    #[test]
    fn test_invalid_yaml_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let result = Config::load(Some(config_path));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_template_loads() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.yaml");

        Config::write_template(&config_path).unwrap();
        let config = Config::load(Some(config_path)).unwrap();
        assert!(config.share.server_url.is_none());
        assert_eq!(config.billing.currency, "USD");
    }
}
