//! Connection and polling settings for the client layer.
//!
//! These are plain data; loading and validation live with the application
//! that embeds the client.

use serde::Deserialize;
use std::time::Duration;

/// Name of the session cookie set by the backend's login flow.
pub const DEFAULT_SESSION_COOKIE: &str = "session";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_ms: u64,
    /// Value of an existing session cookie, forwarded on every request.
    #[serde(default)]
    pub session_cookie: Option<String>,
    #[serde(default = "default_cookie_name")]
    pub session_cookie_name: String,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout_ms: 30_000,
            session_cookie: None,
            session_cookie_name: default_cookie_name(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_cookie_name() -> String {
    DEFAULT_SESSION_COOKIE.to_string()
}

/// Poll intervals. Video forms and image work poll every 5 s; chained
/// generation in the node graph polls every 2 s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollingConfig {
    #[serde(default = "default_video_ms")]
    pub video_interval_ms: u64,
    #[serde(default = "default_image_ms")]
    pub image_interval_ms: u64,
    #[serde(default = "default_chain_ms")]
    pub chain_interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            video_interval_ms: default_video_ms(),
            image_interval_ms: default_image_ms(),
            chain_interval_ms: default_chain_ms(),
        }
    }
}

impl PollingConfig {
    pub fn video_interval(&self) -> Duration {
        Duration::from_millis(self.video_interval_ms)
    }

    pub fn image_interval(&self) -> Duration {
        Duration::from_millis(self.image_interval_ms)
    }

    pub fn chain_interval(&self) -> Duration {
        Duration::from_millis(self.chain_interval_ms)
    }
}

fn default_video_ms() -> u64 {
    5_000
}

fn default_image_ms() -> u64 {
    5_000
}

fn default_chain_ms() -> u64 {
    2_000
}
