//! Configuration validation
//!
//! Runs after the file and CLI flags have been merged. Dates are normalized
//! in place so everything downstream only ever sees canonical `YYYYMMDD`.

use crate::config::dates::{ensure_ordered, normalize_date};
use crate::config::types::{Config, MAX_THREADS};
use crate::ConfigError;

/// Validates and canonicalizes a merged configuration.
pub fn validate(config: &mut Config) -> Result<(), ConfigError> {
    if config.mirror.domain.trim().is_empty() {
        return Err(ConfigError::Validation(
            "a domain to mirror is required".to_string(),
        ));
    }
    if config.mirror.domain.contains('/') || config.mirror.domain.contains(' ') {
        return Err(ConfigError::Validation(format!(
            "'{}' is not a bare domain name",
            config.mirror.domain
        )));
    }

    if let Some(date) = &config.mirror.start_date {
        config.mirror.start_date = Some(normalize_date(date)?);
    }
    if let Some(date) = &config.mirror.end_date {
        config.mirror.end_date = Some(normalize_date(date)?);
    }
    if let (Some(start), Some(end)) = (&config.mirror.start_date, &config.mirror.end_date) {
        ensure_ordered(start, end)?;
    }

    if config.network.threads == 0 {
        return Err(ConfigError::Validation(
            "threads must be at least 1".to_string(),
        ));
    }
    if config.network.threads > MAX_THREADS {
        tracing::warn!(
            "Capping threads from {} to {}",
            config.network.threads,
            MAX_THREADS
        );
        config.network.threads = MAX_THREADS;
    }

    if config.network.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be at least 1".to_string(),
        ));
    }

    if !(50.0..=99.0).contains(&config.memory.threshold_percent) {
        return Err(ConfigError::Validation(format!(
            "memory threshold {}% must be between 50 and 99",
            config.memory.threshold_percent
        )));
    }

    if let Some(0) = config.mirror.max_pages {
        return Err(ConfigError::Validation(
            "max-pages of 0 would mirror nothing".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        let mut config = Config::default();
        config.mirror.domain = "example.com".to_string();
        config
    }

    #[test]
    fn accepts_minimal_config() {
        let mut config = base_config();
        assert!(validate(&mut config).is_ok());
    }

    #[test]
    fn rejects_missing_domain() {
        let mut config = Config::default();
        assert!(validate(&mut config).is_err());
    }

    #[test]
    fn rejects_url_as_domain() {
        let mut config = base_config();
        config.mirror.domain = "http://example.com/".to_string();
        assert!(validate(&mut config).is_err());
    }

    #[test]
    fn canonicalizes_dates_in_place() {
        let mut config = base_config();
        config.mirror.start_date = Some("2004-06-01".to_string());
        config.mirror.end_date = Some("01/06/2010".to_string());
        validate(&mut config).unwrap();
        assert_eq!(config.mirror.start_date.as_deref(), Some("20040601"));
        assert_eq!(config.mirror.end_date.as_deref(), Some("20100601"));
    }

    #[test]
    fn rejects_inverted_range() {
        let mut config = base_config();
        config.mirror.start_date = Some("20200101".to_string());
        config.mirror.end_date = Some("20100101".to_string());
        assert!(validate(&mut config).is_err());
    }

    #[test]
    fn caps_thread_count() {
        let mut config = base_config();
        config.network.threads = 64;
        validate(&mut config).unwrap();
        assert_eq!(config.network.threads, MAX_THREADS);
    }

    #[test]
    fn rejects_zero_threads() {
        let mut config = base_config();
        config.network.threads = 0;
        assert!(validate(&mut config).is_err());
    }
}
