//! Server configuration module.
//!
//! Settings for the line-oriented stdio server.

use super::ConfigResult;
use super::Validate;
use crate::error::config::ConfigError;
use serde::{Deserialize, Serialize};

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Name of the server (used in logs)
    pub name: String,

    /// Maximum length of one request line in bytes
    pub max_line_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "sketch-store".to_string(),
            max_line_bytes: 1024 * 1024, // 1 MiB
        }
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Server name cannot be empty".to_string(),
            ));
        }

        if self.max_line_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "max_line_bytes must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
