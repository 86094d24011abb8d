//! Configuration types for the logger

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use tracing::Level;

fn default_level() -> String {
    "info".to_string()
}

fn default_colored() -> bool {
    true
}

/// `[logger]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Level or full `EnvFilter` directive, e.g. `info,cluster_cache=debug`
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Colored output, only honored on a terminal
    #[serde(default = "default_colored")]
    pub colored: bool,
}

impl LoggerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.parse_level()?;
        Ok(())
    }

    /// Parse the base level of the directive string into a tracing::Level
    ///
    /// Only the first comma-separated directive is checked when it carries no
    /// target; per-target directives are left to `EnvFilter`.
    pub fn parse_level(&self) -> Result<Level> {
        let base = self.level.split(',').next().unwrap_or_default().trim();
        if base.contains('=') {
            return Ok(Level::INFO);
        }
        match base.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => bail!(
                "Invalid log level '{}'. Valid levels are: trace, debug, info, warn, error",
                self.level
            ),
        }
    }

    /// Same configuration at another level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            colored: default_colored(),
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
    Json,
}
