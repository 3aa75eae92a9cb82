use crate::config::types::{
    Config, ImageRetryConfig, OcrConfig, OutputConfig, PageRetryConfig, RateLimitConfig,
    ScrapeConfig, TrackingConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scrape_config(&config.scrape)?;
    validate_page_retry(&config.retry.page)?;
    validate_image_retry(&config.retry.image)?;
    validate_rate_limit(&config.rate_limit)?;
    validate_ocr_config(&config.ocr)?;
    validate_tracking_config(&config.tracking)?;
    validate_output_config(&config.output)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

fn validate_scrape_config(config: &ScrapeConfig) -> Result<(), ConfigError> {
    if config.page_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "page_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.image_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "image_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_page_retry(config: &PageRetryConfig) -> Result<(), ConfigError> {
    validate_backoff(
        "retry.page",
        config.initial_delay_ms,
        config.backoff_factor,
        config.max_delay_ms,
    )
}

fn validate_image_retry(config: &ImageRetryConfig) -> Result<(), ConfigError> {
    validate_backoff(
        "retry.image",
        config.initial_delay_ms,
        config.backoff_factor,
        config.max_delay_ms,
    )
}

/// Checks the shape shared by both retry budgets
fn validate_backoff(
    section: &str,
    initial_delay_ms: u64,
    backoff_factor: f64,
    max_delay_ms: u64,
) -> Result<(), ConfigError> {
    if !backoff_factor.is_finite() || backoff_factor < 1.0 {
        return Err(ConfigError::Validation(format!(
            "{}: backoff_factor must be >= 1.0, got {}",
            section, backoff_factor
        )));
    }

    if max_delay_ms < initial_delay_ms {
        return Err(ConfigError::Validation(format!(
            "{}: max_delay_ms ({}) must be >= initial_delay_ms ({})",
            section, max_delay_ms, initial_delay_ms
        )));
    }

    Ok(())
}

fn validate_rate_limit(config: &RateLimitConfig) -> Result<(), ConfigError> {
    if !config.requests_per_second.is_finite() || config.requests_per_second <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "requests_per_second must be > 0, got {}",
            config.requests_per_second
        )));
    }

    if config.burst < 1 {
        return Err(ConfigError::Validation(format!(
            "burst must be >= 1, got {}",
            config.burst
        )));
    }

    Ok(())
}

fn validate_ocr_config(config: &OcrConfig) -> Result<(), ConfigError> {
    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "ocr timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.tesseract_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "tesseract_path cannot be empty".to_string(),
        ));
    }

    if config.languages.trim().is_empty() {
        return Err(ConfigError::Validation(
            "ocr languages cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_tracking_config(config: &TrackingConfig) -> Result<(), ConfigError> {
    if config.enabled && config.database_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty when tracking is enabled".to_string(),
        ));
    }

    if config.source_tag.is_empty() {
        return Err(ConfigError::Validation(
            "source_tag cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.root.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output root cannot be empty".to_string(),
        ));
    }

    if let Some(name) = &config.run_name {
        if name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "run_name cannot be blank when set".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.agent_name.is_empty() {
        return Err(ConfigError::Validation(
            "agent_name cannot be empty".to_string(),
        ));
    }

    if !config
        .agent_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "agent_name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            config.agent_name
        )));
    }

    if let Some(contact) = &config.contact_url {
        Url::parse(contact).map_err(|e| {
            ConfigError::Validation(format!("Invalid contact_url '{}': {}", contact, e))
        })?;
    }

    Ok(())
}
