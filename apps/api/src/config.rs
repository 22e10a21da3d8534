use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub pipeline: PipelineSettings,
}

/// Per-collaborator time limits and cache lifetimes used by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub generation_timeout: Duration,
    pub judge_timeout: Duration,
    pub scrape_timeout: Duration,
    pub retrieval_timeout: Duration,
    pub company_cache_ttl: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            generation_timeout: Duration::from_secs(90),
            judge_timeout: Duration::from_secs(60),
            scrape_timeout: Duration::from_secs(20),
            retrieval_timeout: Duration::from_secs(10),
            company_cache_ttl: Duration::from_secs(86_400),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = PipelineSettings::default();
        let pipeline = PipelineSettings {
            generation_timeout: env_secs("GENERATION_TIMEOUT_SECS", defaults.generation_timeout)?,
            judge_timeout: env_secs("JUDGE_TIMEOUT_SECS", defaults.judge_timeout)?,
            scrape_timeout: env_secs("SCRAPE_TIMEOUT_SECS", defaults.scrape_timeout)?,
            retrieval_timeout: env_secs("RETRIEVAL_TIMEOUT_SECS", defaults.retrieval_timeout)?,
            company_cache_ttl: env_secs("COMPANY_CACHE_TTL_SECS", defaults.company_cache_ttl)?,
        };

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            pipeline,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_secs(key: &str, default: Duration) -> Result<Duration> {
    match std::env::var(key) {
        Ok(raw) => parse_secs(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<Duration> {
    let secs = raw
        .trim()
        .parse::<u64>()
        .with_context(|| format!("{key} must be a whole number of seconds"))?;
    anyhow::ensure!(secs > 0, "{key} must be greater than zero");
    Ok(Duration::from_secs(secs))
}
