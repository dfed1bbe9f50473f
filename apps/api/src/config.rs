use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    /// When set, grading jobs go through a Redis list instead of the in-process channel.
    pub redis_url: Option<String>,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub grading: GradingSettings,
}

/// Tuning knobs for the answer grading path.
#[derive(Debug, Clone)]
pub struct GradingSettings {
    /// Upper bound on the evaluator call made while the submitting request waits.
    /// Zero skips the inline attempt and always hands off to the worker.
    pub inline_timeout: Duration,
    /// Upper bound on a single evaluator call made by a background worker.
    pub worker_timeout: Duration,
    pub max_attempts: u32,
    pub retry_base: Duration,
    pub workers: usize,
}

impl Default for GradingSettings {
    fn default() -> Self {
        Self {
            inline_timeout: Duration::from_secs(25),
            worker_timeout: Duration::from_secs(90),
            max_attempts: 3,
            retry_base: Duration::from_millis(2000),
            workers: 2,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = GradingSettings::default();
        let grading = GradingSettings {
            inline_timeout: Duration::from_secs(parse_env(
                "INLINE_GRADING_TIMEOUT_SECS",
                defaults.inline_timeout.as_secs(),
            )?),
            worker_timeout: Duration::from_secs(parse_env(
                "WORKER_GRADING_TIMEOUT_SECS",
                defaults.worker_timeout.as_secs(),
            )?),
            max_attempts: parse_env("GRADING_MAX_ATTEMPTS", defaults.max_attempts)?.max(1),
            retry_base: Duration::from_millis(parse_env(
                "GRADING_RETRY_BASE_MS",
                defaults.retry_base.as_millis() as u64,
            )?),
            workers: parse_env("GRADING_WORKERS", defaults.workers)?.max(1),
        };

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            database_max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10)?,
            redis_url: std::env::var("REDIS_URL").ok().filter(|v| !v.trim().is_empty()),
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            grading,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("{key} must be a valid number, got '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_accepts_padded_numbers() {
        let port: u16 = parse_value("PORT", " 9090 ").unwrap();
        assert_eq!(port, 9090);
    }

    #[test]
    fn test_parse_value_rejects_garbage_with_key_in_message() {
        let err = parse_value::<u16>("PORT", "eighty").unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_grading_defaults_allow_inline_attempt() {
        let settings = GradingSettings::default();
        assert!(!settings.inline_timeout.is_zero());
        assert!(settings.max_attempts >= 1);
        assert!(settings.workers >= 1);
    }
}
