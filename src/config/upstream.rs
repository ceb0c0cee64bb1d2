//! Upstream chat service configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Configuration for the upstream DuckDuckGo AI Chat endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the upstream service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Upstream request timeout in seconds (covers the whole streamed reply)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl UpstreamConfig {
    /// Session negotiation endpoint.
    pub fn status_url(&self) -> String {
        format!("{}/duckchat/v1/status", self.base_url.trim_end_matches('/'))
    }

    /// Chat endpoint.
    pub fn chat_url(&self) -> String {
        format!("{}/duckchat/v1/chat", self.base_url.trim_end_matches('/'))
    }

    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate upstream configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidUpstreamUrl);
        }
        if self.timeout_secs == 0 || self.timeout_secs > 600 {
            return Err(ValidationError::InvalidUpstreamTimeout);
        }
        Ok(())
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://duckduckgo.com".to_string()
}

fn default_timeout() -> u64 {
    120
}
