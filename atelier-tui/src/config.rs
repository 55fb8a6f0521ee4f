//! Configuration loading for the Atelier TUI.
//!
//! Every field is required except the polling intervals, which fall back to
//! the intervals the studio forms have always used.

use atelier_client::{ApiConfig, PollingConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TuiConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    pub refresh_interval_ms: u64,
    pub persistence_path: PathBuf,
    pub log_path: PathBuf,
    pub log_level: String,
    pub log_format: LogFormat,
    pub theme: ThemeConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThemeConfig {
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or ATELIER_TUI_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl TuiConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        let config = Self::from_path(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.api.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api.base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "api.base_url",
                reason: "must start with http:// or https://".to_string(),
            });
        }
        if self.api.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "api.request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.api.session_cookie_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api.session_cookie_name",
                reason: "must not be empty".to_string(),
            });
        }
        for (field, value) in [
            ("polling.video_interval_ms", self.polling.video_interval_ms),
            ("polling.image_interval_ms", self.polling.image_interval_ms),
            ("polling.chain_interval_ms", self.polling.chain_interval_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be > 0".to_string(),
                });
            }
        }
        if self.refresh_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "refresh_interval_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.persistence_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "persistence_path",
                reason: "must not be empty".to_string(),
            });
        }
        if self.log_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "log_path",
                reason: "must not be empty".to_string(),
            });
        }
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "log_level",
                reason: format!("must be one of {}", LOG_LEVELS.join(", ")),
            });
        }
        if self.theme.name.to_ascii_lowercase() != "atelier" {
            return Err(ConfigError::InvalidValue {
                field: "theme.name",
                reason: "only 'atelier' is supported".to_string(),
            });
        }
        Ok(())
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var("ATELIER_TUI_CONFIG").ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
refresh_interval_ms = 2000
persistence_path = "tmp/atelier-tui.json"
log_path = "tmp/atelier-tui.log"
log_level = "info"
log_format = "text"

[api]
base_url = "http://localhost:8080"
request_timeout_ms = 30000

[theme]
name = "atelier"
"#;

    #[test]
    fn polling_defaults_apply() {
        let config = TuiConfig::from_toml(SAMPLE).unwrap();
        config.validate().unwrap();
        assert_eq!(config.polling, PollingConfig::default());
        assert_eq!(config.polling.chain_interval_ms, 2_000);
        assert_eq!(config.api.session_cookie_name, "session");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let contents = format!("{SAMPLE}\nextra = 1\n");
        assert!(matches!(
            TuiConfig::from_toml(&contents),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn zero_poll_interval_is_invalid() {
        let mut config = TuiConfig::from_toml(SAMPLE).unwrap();
        config.polling.image_interval_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "polling.image_interval_ms",
                ..
            })
        ));
    }
}
