use super::{
    types::{Config, MAX_TTL_MINUTES},
    ConfigError,
};

/// Smallest combined-query length that still fits one contact term.
pub const MIN_QUERY_LENGTH: usize = 150;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Helpdesk timeout is not 0
/// - Max query length admits at least one search term
/// - Retry TTL is positive and at most `MAX_TTL_MINUTES`
/// - Sweep interval is not 0 when sweeping is enabled
///
/// Missing helpdesk credentials are deliberately not checked here.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.helpdesk.timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "helpdesk.timeout_ms cannot be 0".to_string(),
        ));
    }

    if config.helpdesk.max_query_length < MIN_QUERY_LENGTH {
        return Err(ConfigError::ValidationError(format!(
            "helpdesk.max_query_length must be at least {}",
            MIN_QUERY_LENGTH
        )));
    }

    if config.retry.ttl_minutes <= 0 {
        return Err(ConfigError::ValidationError(
            "retry.ttl_minutes must be positive".to_string(),
        ));
    }

    if config.retry.ttl_minutes > MAX_TTL_MINUTES {
        return Err(ConfigError::ValidationError(format!(
            "retry.ttl_minutes cannot exceed {}",
            MAX_TTL_MINUTES
        )));
    }

    if config.sweep.enabled && config.sweep.interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "sweep.interval_secs cannot be 0 when sweeping is enabled".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = Config::default();
        config.server.port = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_zero_timeout_fails() {
        let mut config = Config::default();
        config.helpdesk.timeout_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_short_query_length_fails() {
        let mut config = Config::default();
        config.helpdesk.max_query_length = 149;
        assert!(validate_config(&config).is_err());

        config.helpdesk.max_query_length = MIN_QUERY_LENGTH;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_missing_credentials_is_ok() {
        let config = Config::default();
        assert!(config.helpdesk.token.is_none());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_non_positive_ttl_fails() {
        let mut config = Config::default();
        config.retry.ttl_minutes = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_oversized_ttl_fails() {
        let mut config = Config::default();
        config.retry.ttl_minutes = i64::MAX;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));

        config.retry.ttl_minutes = MAX_TTL_MINUTES;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_sweep_interval() {
        let mut config = Config::default();
        config.sweep.interval_secs = 0;
        assert!(validate_config(&config).is_err());

        config.sweep.enabled = false;
        assert!(validate_config(&config).is_ok());
    }
}
