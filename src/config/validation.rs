//! Settings validation
//!
//! Runs after loading so that a bad file fails at startup rather than on the
//! first cache operation.

use crate::cache::{store_name, validate_servers};
use crate::config::error::ConfigError;
use crate::config::settings::{CacheConfig, Settings};

impl CacheConfig {
    /// Validate cache configuration
    ///
    /// # Validation Rules
    /// - At least one server, no blank address, unique node ids
    /// - `options.store_name` present and a non-empty string
    /// - Default timeout, when set, greater than 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_servers(&self.servers)?;
        store_name(&self.options)?;

        if self.timeout == Some(0) {
            return Err(ConfigError::validation(
                "cache.timeout",
                "A default timeout of 0 would expire every entry immediately.",
            ));
        }

        Ok(())
    }
}

impl Settings {
    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.logger
            .validate()
            .map_err(|e| ConfigError::validation("logger".to_string(), format!("{:#}", e)))?;
        self.cache.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ServerAddr;

    fn valid_settings() -> Settings {
        let mut settings = Settings::default();
        settings.cache.servers = vec![ServerAddr::new("127.0.0.1:6379", 0)];
        settings.cache.options.insert(
            "store_name".to_string(),
            serde_json::Value::String("sessions".to_string()),
        );
        settings
    }

    fn field_of(err: ConfigError) -> String {
        match err {
            ConfigError::ValidationError { field, .. } => field,
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_valid_settings() {
        assert!(valid_settings().validate().is_ok());
    }

    #[test]
    fn test_missing_servers() {
        let mut settings = valid_settings();
        settings.cache.servers.clear();
        assert_eq!(field_of(settings.validate().unwrap_err()), "cache.servers");
    }

    #[test]
    fn test_missing_store_name() {
        let mut settings = valid_settings();
        settings.cache.options.clear();
        assert_eq!(
            field_of(settings.validate().unwrap_err()),
            "cache.options.store_name"
        );
    }

    #[test]
    fn test_zero_timeout() {
        let mut settings = valid_settings();
        settings.cache.timeout = Some(0);
        assert_eq!(field_of(settings.validate().unwrap_err()), "cache.timeout");

        settings.cache.timeout = None;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut settings = valid_settings();
        settings.logger.level = "loud".to_string();
        assert_eq!(field_of(settings.validate().unwrap_err()), "logger");
    }
}
