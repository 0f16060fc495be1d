use crate::config::types::{CrawlJob, FetcherConfig, FilterConfig};
use crate::ConfigError;
use regex::Regex;

/// Minimum length of a project (workspace) name
const MIN_PROJECT_LEN: usize = 5;

/// Validates the entire job
pub fn validate(job: &CrawlJob) -> Result<(), ConfigError> {
    validate_project_name(&job.project)?;
    validate_start_urls(&job.start_urls)?;
    validate_user_agent(&job.user_agent)?;
    validate_fetcher_config(&job.fetcher)?;
    validate_filter_config(&job.filters)?;
    Ok(())
}

/// Validates the project name used as the workspace directory
///
/// Must start with a letter, contain no whitespace, and not escape the
/// workspace root.
fn validate_project_name(project: &str) -> Result<(), ConfigError> {
    let first = project.chars().next().ok_or_else(|| {
        ConfigError::Validation("project name cannot be empty".to_string())
    })?;

    if !first.is_ascii_alphabetic() {
        return Err(ConfigError::Validation(format!(
            "project name must start with a letter, got '{}'",
            project
        )));
    }

    if project.chars().count() < MIN_PROJECT_LEN {
        return Err(ConfigError::Validation(format!(
            "project name must be at least {} characters, got '{}'",
            MIN_PROJECT_LEN, project
        )));
    }

    if project
        .chars()
        .any(|c| c.is_whitespace() || c == '/' || c == '\\' || c == ':')
    {
        return Err(ConfigError::Validation(format!(
            "project name cannot contain whitespace or path separators, got '{}'",
            project
        )));
    }

    Ok(())
}

/// Validates that the job has seeds; malformed ones are skipped at crawl time
fn validate_start_urls(urls: &[String]) -> Result<(), ConfigError> {
    if urls.iter().all(|url| url.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "at least one start URL is required".to_string(),
        ));
    }
    Ok(())
}

fn validate_user_agent(user_agent: &str) -> Result<(), ConfigError> {
    if user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates fetcher pool settings
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 100 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 100, got {}",
            config.workers
        )));
    }

    if config.request_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-ms must be > 0".to_string(),
        ));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    Ok(())
}

/// Validates URL filter rules
fn validate_filter_config(config: &FilterConfig) -> Result<(), ConfigError> {
    for param in config
        .include_url_params
        .iter()
        .chain(&config.exclude_url_params)
    {
        if param.trim().is_empty() || param.contains('=') || param.contains('&') {
            return Err(ConfigError::InvalidPattern(format!(
                "Invalid URL parameter name '{}'",
                param
            )));
        }
    }

    for pattern in config
        .include_url_regex
        .iter()
        .chain(&config.exclude_url_regex)
    {
        Regex::new(pattern).map_err(|e| {
            ConfigError::InvalidPattern(format!("Invalid regex '{}': {}", pattern, e))
        })?;
    }

    for domain in &config.allowed_domains {
        validate_domain_pattern(domain)?;
    }

    Ok(())
}

/// Validates an allowed-domain pattern (supports a leading "*.")
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);

    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            pattern
        )));
    }

    if domain.starts_with('.') || domain.ends_with('.') || domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' has misplaced dots",
            pattern
        )));
    }

    Ok(())
}
