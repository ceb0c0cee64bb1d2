//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Values are read with the `DUCKGATE` prefix
//! and nested sections use double underscores as separators, e.g.
//! `DUCKGATE__SERVER__PORT=3000`. A bare `PORT` variable is also honored as
//! an override for deployment platforms that inject one.

mod error;
mod server;
mod sessions;
mod upstream;

pub use error::{ConfigError, ValidationError};
pub use server::ServerConfig;
pub use sessions::SessionsConfig;
pub use upstream::UpstreamConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    /// Server configuration (bind address, timeouts, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream chat service endpoints
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Session registry eviction policy
    #[serde(default)]
    pub sessions: SessionsConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Loads a `.env` file if present, then reads `DUCKGATE__*` variables.
    /// Every section has defaults, so an empty environment yields a working
    /// configuration pointing at the real upstream service.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut config: Self = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("DUCKGATE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        // Platform-injected PORT wins over the default but not over an
        // explicit DUCKGATE__SERVER__PORT.
        if std::env::var("DUCKGATE__SERVER__PORT").is_err() {
            if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
                config.server.port = port;
            }
        }

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.upstream.validate()?;
        self.sessions.validate()?;
        Ok(())
    }
}
