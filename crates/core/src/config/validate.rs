use super::{types::Config, ConfigError};
use crate::time::ReferenceZone;

/// Validate configuration
/// Currently validates:
/// - Catalog URL is not blank and the timeout is within 1..=120 seconds
/// - Reference timezone is a known IANA name
/// - Lookup concurrency is at least 1
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.catalog.url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "catalog.url cannot be empty".to_string(),
        ));
    }

    if !(1..=120).contains(&config.catalog.timeout_secs) {
        return Err(ConfigError::ValidationError(format!(
            "catalog.timeout_secs must be between 1 and 120, got {}",
            config.catalog.timeout_secs
        )));
    }

    if config.reconcile.max_concurrent_lookups == 0 {
        return Err(ConfigError::ValidationError(
            "reconcile.max_concurrent_lookups cannot be 0".to_string(),
        ));
    }

    ReferenceZone::from_name(&config.reconcile.reference_timezone)
        .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

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
    fn test_validate_zero_concurrency_fails() {
        let mut config = Config::default();
        config.reconcile.max_concurrent_lookups = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_unknown_timezone_fails() {
        let mut config = Config::default();
        config.reconcile.reference_timezone = "Mars/Olympus_Mons".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("Mars/Olympus_Mons"));
    }

    #[test]
    fn test_validate_timeout_out_of_range_fails() {
        let mut config = Config::default();
        config.catalog.timeout_secs = 0;
        assert!(validate_config(&config).is_err());

        config.catalog.timeout_secs = 600;
        assert!(validate_config(&config).is_err());
    }
}
