use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5001/chat";
pub const ENDPOINT_ENV: &str = "BEYOND_ENDPOINT";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Chat service URL that receives `{"message": ...}` posts
    pub endpoint: String,
    pub request_timeout_secs: u64,
    /// How long a "Copied!" indicator stays up
    pub copy_indicator_ms: u64,
    /// Input box height bounds in rows, borders included
    pub input_min_height: u16,
    pub input_max_height: u16,
    /// Interval between animation ticks
    pub tick_rate_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: 60,
            copy_indicator_ms: 1500,
            input_min_height: 3,
            input_max_height: 10,
            tick_rate_ms: 50,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the config from the default location, falling back to defaults
    /// when no file exists yet.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config =
            serde_json::from_str(&config_content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let config_content = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, config_content).map_err(io_err)?;
        Ok(())
    }

    /// Applies `BEYOND_ENDPOINT` on top of the file settings.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            if !endpoint.trim().is_empty() {
                self.endpoint = endpoint;
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("endpoint must not be empty".to_string()));
        }
        if self.input_min_height == 0 || self.input_min_height > self.input_max_height {
            return Err(ConfigError::Invalid(format!(
                "input height bounds {}..{} are not a valid range",
                self.input_min_height, self.input_max_height
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.tick_rate_ms == 0 {
            return Err(ConfigError::Invalid("tick_rate_ms must be positive".to_string()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn copy_indicator(&self) -> Duration {
        Duration::from_millis(self.copy_indicator_ms)
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }

    pub fn get_config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// `<platform config dir>/beyond`, home of the config file and the log.
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("beyond"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.copy_indicator(), Duration::from_millis(1500));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            endpoint: "http://chat.internal:8080/chat".to_string(),
            request_timeout_secs: 5,
            ..Config::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"endpoint": "http://localhost:9000/chat"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.endpoint, "http://localhost:9000/chat");
        assert_eq!(config.input_min_height, 3);
        assert_eq!(config.input_max_height, 10);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_inverted_height_bounds_rejected() {
        let config = Config {
            input_min_height: 12,
            input_max_height: 4,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_request_timeout_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"request_timeout_secs": 0}"#).unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::Invalid(_))));
    }
}
