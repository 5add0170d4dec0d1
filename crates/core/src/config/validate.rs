use reqwest::Url;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - API base URL is set and parses as an http(s) URL
/// - Request timeout is not 0
/// - Year bounds are not inverted
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let url = config.api.url.trim();
    if url.is_empty() {
        return Err(ConfigError::MissingApiUrl);
    }

    let parsed = Url::parse(url)
        .map_err(|e| ConfigError::ValidationError(format!("api.url is not a valid URL: {}", e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::ValidationError(format!(
            "api.url must use http or https, got {}",
            parsed.scheme()
        )));
    }

    if config.api.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "api.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.validation.min_year > config.validation.max_year {
        return Err(ConfigError::ValidationError(format!(
            "validation.min_year ({}) is greater than validation.max_year ({})",
            config.validation.min_year, config.validation.max_year
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::validation::YearPolicy;

    fn config_with_url(url: &str) -> Config {
        Config {
            api: ApiConfig {
                url: url.to_string(),
                ..ApiConfig::default()
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&config_with_url("http://localhost:8000/api/v1")).is_ok());
    }

    #[test]
    fn test_missing_url_is_fatal() {
        let result = validate_config(&Config::default());
        assert!(matches!(result, Err(ConfigError::MissingApiUrl)));

        let result = validate_config(&config_with_url("   "));
        assert!(matches!(result, Err(ConfigError::MissingApiUrl)));
    }

    #[test]
    fn test_invalid_url_fails() {
        let result = validate_config(&config_with_url("localhost"));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));

        let result = validate_config(&config_with_url("ftp://example.com"));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_zero_timeout_fails() {
        let mut config = config_with_url("http://localhost:8000");
        config.api.timeout_secs = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_inverted_year_range_fails() {
        let mut config = config_with_url("http://localhost:8000");
        config.validation = YearPolicy {
            min_year: 2021,
            max_year: 1900,
        };
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
