use crate::config::types::{Config, CrawlerConfig, UserAgentConfig, WatchEntry, MAX_WATCH_HOURS};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_watch_entries(&config.watch)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.page_delay_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "page_delay_ms must be >= 100ms, got {}ms",
            config.page_delay_ms
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
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

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates watched sites
fn validate_watch_entries(entries: &[WatchEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in entries {
        validate_site(&entry.site)?;

        if !(1..=MAX_WATCH_HOURS).contains(&entry.hours) {
            return Err(ConfigError::Validation(format!(
                "Watch window for '{}' must be between 1 and {} hours, got {}",
                entry.site, MAX_WATCH_HOURS, entry.hours
            )));
        }

        // Sites share one cache each, so a second entry would only shadow the first
        if !seen.insert(entry.site.to_ascii_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "Site '{}' is watched more than once",
                entry.site
            )));
        }
    }

    Ok(())
}

/// Validates a site identifier: a bare hostname with an optional port
pub(crate) fn validate_site(site: &str) -> Result<(), ConfigError> {
    let (host, port) = match site.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (site, None),
    };

    if let Some(port) = port {
        if port.parse::<u16>().is_err() {
            return Err(ConfigError::InvalidSite(format!(
                "Site '{}' has an invalid port",
                site
            )));
        }
    }

    if host.is_empty() {
        return Err(ConfigError::InvalidSite(
            "Site cannot be empty".to_string(),
        ));
    }

    // Check for invalid characters (this also rejects schemes and paths)
    if !host
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidSite(format!(
            "Site '{}' contains invalid characters",
            site
        )));
    }

    if host.starts_with('.') || host.ends_with('.') || host.starts_with('-') || host.ends_with('-')
    {
        return Err(ConfigError::InvalidSite(format!(
            "Site '{}' cannot start or end with '.' or '-'",
            site
        )));
    }

    if host.contains("..") {
        return Err(ConfigError::InvalidSite(format!(
            "Site '{}' cannot contain consecutive dots",
            site
        )));
    }

    if !host.contains('.') && host != "localhost" {
        return Err(ConfigError::InvalidSite(format!(
            "Site '{}' must contain at least one dot (e.g., 'stackoverflow.com')",
            site
        )));
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

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
