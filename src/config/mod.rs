//! Application configuration management

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::graphql::orm::CompileOptions;
use crate::services::logging::LogFormat;

/// Configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// GraphQL endpoint of the backend
    pub graphql_url: Option<String>,

    /// Bearer token sent with every request
    pub api_token: Option<String>,

    /// Tenant every query is scoped to
    pub organization_id: i64,

    /// User recorded as author of writes
    pub user_id: Option<i64>,

    pub default_page_size: u32,

    /// Upper bound for requested page sizes
    pub max_page_size: u32,

    /// Offset of the users' calendar from UTC, in minutes
    pub timezone_offset_minutes: i32,

    pub request_timeout: Duration,

    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            graphql_url: None,
            api_token: None,
            organization_id: 1,
            user_id: None,
            default_page_size: 10,
            max_page_size: 100,
            timezone_offset_minutes: 0,
            request_timeout: Duration::from_secs(30),
            log_format: LogFormat::Json,
        }
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(raw) => raw.parse().with_context(|| format!("Invalid {}: {:?}", name, raw)),
        None => Ok(default),
    }
}

impl Config {
    /// Load `.env` (if present) and the process environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let user_id = match non_empty("USER_ID") {
            Some(raw) => Some(raw.trim().parse().context("Invalid USER_ID")?),
            None => None,
        };

        let log_format = match non_empty("LOG_FORMAT") {
            Some(raw) => LogFormat::from_arg(&raw)
                .with_context(|| format!("Invalid LOG_FORMAT: {:?}", raw))?,
            None => defaults.log_format,
        };

        let config = Self {
            graphql_url: non_empty("GRAPHQL_URL"),
            api_token: non_empty("API_TOKEN"),
            organization_id: parse_or(
                lookup("ORGANIZATION_ID"),
                "ORGANIZATION_ID",
                defaults.organization_id,
            )?,
            user_id,
            default_page_size: parse_or(
                lookup("DEFAULT_PAGE_SIZE"),
                "DEFAULT_PAGE_SIZE",
                defaults.default_page_size,
            )?,
            max_page_size: parse_or(
                lookup("MAX_PAGE_SIZE"),
                "MAX_PAGE_SIZE",
                defaults.max_page_size,
            )?,
            timezone_offset_minutes: parse_or(
                lookup("TIMEZONE_OFFSET_MINUTES"),
                "TIMEZONE_OFFSET_MINUTES",
                defaults.timezone_offset_minutes,
            )?,
            request_timeout: Duration::from_secs(parse_or(
                lookup("REQUEST_TIMEOUT_SECS"),
                "REQUEST_TIMEOUT_SECS",
                30u64,
            )?),
            log_format,
        };

        if config.default_page_size == 0 || config.max_page_size == 0 {
            anyhow::bail!("Page sizes must be positive");
        }
        Ok(config)
    }

    /// Compiler settings derived from this configuration
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            organization_id: self.organization_id,
            default_page_size: self.default_page_size.min(self.max_page_size),
            max_page_size: self.max_page_size,
            utc_offset_minutes: self.timezone_offset_minutes,
        }
    }

    pub fn require_graphql_url(&self) -> Result<&str> {
        self.graphql_url.as_deref().context("GRAPHQL_URL is required")
    }
}
