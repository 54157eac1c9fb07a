use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Shared secret presented by every data-plane caller
    pub api_token: String,
    /// Base URL of the compute-unit fleet (per-job units addressed under it)
    pub crawler_base_url: String,
    pub crawler_timeout_secs: u64,
    /// Blob store for raw page snapshots; snapshots are skipped when unset
    pub snapshot_base_url: Option<String>,
    pub snapshot_token: Option<String>,
    pub default_max_pages: i32,
    pub default_max_depth: i32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            api_token: env::var("API_TOKEN")
                .context("API_TOKEN must be set")?,
            crawler_base_url: env::var("CRAWLER_BASE_URL")
                .context("CRAWLER_BASE_URL must be set")?,
            crawler_timeout_secs: env::var("CRAWLER_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("CRAWLER_TIMEOUT_SECS must be a valid number")?,
            snapshot_base_url: env::var("SNAPSHOT_BASE_URL").ok(),
            snapshot_token: env::var("SNAPSHOT_TOKEN").ok(),
            default_max_pages: env::var("DEFAULT_MAX_PAGES")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .context("DEFAULT_MAX_PAGES must be a valid number")?,
            default_max_depth: env::var("DEFAULT_MAX_DEPTH")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("DEFAULT_MAX_DEPTH must be a valid number")?,
        })
    }
}
