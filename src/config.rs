// src/config.rs
use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use tracing::{debug, info};

use crate::error::{Result, SessionError};
use crate::overpass::DEFAULT_ENDPOINTS;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub sync_poll_interval: Duration,
    pub write_attempts: u32,
    pub overpass_endpoints: Vec<String>,
    pub overpass_backoff: Duration,
    pub public_base_url: String,
    pub places_fixture: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3030,
            database_url: None,
            database_max_connections: 5,
            sync_poll_interval: Duration::from_millis(3000),
            write_attempts: 5,
            overpass_endpoints: DEFAULT_ENDPOINTS.iter().map(|s| s.to_string()).collect(),
            overpass_backoff: Duration::from_millis(300),
            public_base_url: "http://localhost:5173/".to_string(),
            places_fixture: None,
        }
    }
}

impl Config {
    /// Reads the environment. Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn load() -> Result<Self> {
        let defaults = Config::default();

        let config = Self {
            port: try_load("PORT", defaults.port)?,
            database_url: var("DATABASE_URL"),
            database_max_connections: try_load(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,
            sync_poll_interval: Duration::from_millis(try_load("SYNC_POLL_INTERVAL_MS", 3000u64)?),
            write_attempts: try_load("WRITE_ATTEMPTS", defaults.write_attempts)?,
            overpass_endpoints: var("OVERPASS_ENDPOINTS")
                .map(|raw| split_list(&raw))
                .unwrap_or(defaults.overpass_endpoints),
            overpass_backoff: Duration::from_millis(try_load("OVERPASS_BACKOFF_MS", 300u64)?),
            public_base_url: var("PUBLIC_BASE_URL").unwrap_or(defaults.public_base_url),
            places_fixture: var("PLACES_FIXTURE").map(PathBuf::from),
        };

        if config.write_attempts == 0 {
            return Err(SessionError::Config("WRITE_ATTEMPTS must be at least 1".into()));
        }
        reqwest::Url::parse(&config.public_base_url)
            .map_err(|e| SessionError::Config(format!("Invalid PUBLIC_BASE_URL: {e}")))?;

        Ok(config)
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn try_load<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| SessionError::Config(format!("Invalid {key} value {raw:?}: {e}"))),
        None => {
            debug!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    let list: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    info!(count = list.len(), "using configured overpass endpoints");
    list
}
