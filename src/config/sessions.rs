//! Session lifecycle configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Idle-eviction policy for the in-memory session registry.
///
/// Sessions live only for the process lifetime; eviction bounds memory for
/// clients that stop talking without deleting their session.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionsConfig {
    /// Evict sessions idle for longer than this many seconds
    #[serde(default = "default_max_idle")]
    pub max_idle_secs: u64,

    /// How often the eviction sweep runs, in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl SessionsConfig {
    pub fn max_idle(&self) -> Duration {
        Duration::from_secs(self.max_idle_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Validate session configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.sweep_interval_secs == 0 || self.max_idle_secs <= self.sweep_interval_secs {
            return Err(ValidationError::InvalidIdleWindow);
        }
        Ok(())
    }
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            max_idle_secs: default_max_idle(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_max_idle() -> u64 {
    1800
}

fn default_sweep_interval() -> u64 {
    300
}
