//! Tracing setup.
//!
//! The terminal belongs to the UI, so events go to `log_path` instead of
//! stderr. `RUST_LOG` overrides the configured level.

use crate::config::{LogFormat, TuiConfig};
use crate::error::TuiError;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init(config: &TuiConfig) -> Result<(), TuiError> {
    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "atelier_tui={level},atelier_client={level},warn",
            level = config.log_level.to_ascii_lowercase()
        ))
    });
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false);

    let result = match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.json())
            .try_init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(env_filter)
            .with(layer)
            .try_init(),
    };
    result.map_err(|e| TuiError::Logging(e.to_string()))?;

    tracing::info!(
        log_path = %config.log_path.display(),
        base_url = %config.api.base_url,
        "logging initialized"
    );
    Ok(())
}
