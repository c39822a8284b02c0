use crate::config::types::{
    Config, CrawlerConfig, NavigationMode, OutputConfig, RetailerConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_retailer_config(&config.retailer)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    // rate_limit_ms of 0 disables spacing, which is allowed

    if !config.retry_backoff.is_finite() || config.retry_backoff < 1.0 {
        return Err(ConfigError::Validation(format!(
            "retry_backoff must be >= 1.0, got {}",
            config.retry_backoff
        )));
    }

    if config.max_retry_delay_ms < config.retry_delay_ms {
        return Err(ConfigError::Validation(format!(
            "max_retry_delay_ms ({}ms) must be >= retry_delay_ms ({}ms)",
            config.max_retry_delay_ms, config.retry_delay_ms
        )));
    }

    if config.max_attempts == Some(0) {
        return Err(ConfigError::Validation(
            "max_attempts must be >= 1 when set".to_string(),
        ));
    }

    if config.cache && config.cache_path.is_empty() {
        return Err(ConfigError::Validation(
            "cache_path cannot be empty when the cache is enabled".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    // Validate contact URL
    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    // Validate contact email (basic validation)
    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates retailer configuration
fn validate_retailer_config(config: &RetailerConfig) -> Result<(), ConfigError> {
    if config.name.is_empty() {
        return Err(ConfigError::Validation(
            "retailer name cannot be empty".to_string(),
        ));
    }

    if config.default_brand.trim().is_empty() {
        return Err(ConfigError::Validation(
            "default_brand cannot be empty".to_string(),
        ));
    }

    validate_http_url("root_url", &config.root_url)?;
    validate_url_template("feed_url", &config.feed_url)?;

    match (&config.navigation, &config.submenu_url) {
        (NavigationMode::MenuApi, None) => {
            return Err(ConfigError::Validation(
                "submenu_url is required when navigation is 'menu-api'".to_string(),
            ));
        }
        (_, Some(template)) => validate_url_template("submenu_url", template)?,
        (NavigationMode::Markup, None) => {}
    }

    Ok(())
}

/// Validates an http(s) URL
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use the http or https scheme",
            field, value
        )));
    }

    Ok(())
}

/// Validates a URL template containing an `{id}` placeholder
fn validate_url_template(field: &str, template: &str) -> Result<(), ConfigError> {
    if !template.contains("{id}") {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must contain an {{id}} placeholder",
            field, template
        )));
    }

    validate_http_url(field, &template.replace("{id}", "0"))
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    // Domain part should contain at least one dot
    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
