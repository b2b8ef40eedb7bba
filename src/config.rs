use std::{net::SocketAddr, str::FromStr, time::Duration};

use dotenvy::dotenv;
use url::Url;

use crate::error::{Error, Result};

const DEFAULT_PACING_MS: u64 = 500;
const DEFAULT_RECENT_CAPACITY: usize = 10;
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 15;

/// Process configuration read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub admin: AdminId,
    pub database_url: Option<String>,
    pub log_level: String,
    pub webhook: Option<(Url, SocketAddr)>,
    pub engine: EngineConfig,
}

/// Telegram user id of the single bot administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminId(pub u64);

impl AdminId {
    pub fn is(&self, user_id: u64) -> bool {
        self.0 == user_id
    }
}

/// Tunables of the dispatch engine.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub pacing: Duration,
    pub recent_capacity: usize,
    pub call_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pacing: Duration::from_millis(DEFAULT_PACING_MS),
            recent_capacity: DEFAULT_RECENT_CAPACITY,
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let token = required("TELOXIDE_TOKEN")?;
        let admin = AdminId(parse_var("ADMIN_USER_ID", &required("ADMIN_USER_ID")?)?);
        let database_url = std::env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());
        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into());

        let webhook = match (std::env::var("NGROK_URL"), std::env::var("NGROK_ADDR")) {
            (Ok(url), Ok(addr)) => Some((parse_var("NGROK_URL", &url)?, parse_var("NGROK_ADDR", &addr)?)),
            _ => None,
        };

        let pacing_ms = optional("DISPATCH_PACING_MS", DEFAULT_PACING_MS)?;
        let recent_capacity = optional("RECENT_WINDOW_CAPACITY", DEFAULT_RECENT_CAPACITY)?;
        let timeout_secs = optional("CALL_TIMEOUT_SECS", DEFAULT_CALL_TIMEOUT_SECS)?;

        if recent_capacity == 0 {
            return Err(Error::Config("RECENT_WINDOW_CAPACITY must be positive".into()));
        }

        Ok(Self {
            token,
            admin,
            database_url,
            log_level,
            webhook,
            engine: EngineConfig {
                pacing: Duration::from_millis(pacing_ms),
                recent_capacity,
                call_timeout: Duration::from_secs(timeout_secs.max(1)),
            },
        })
    }
}

fn required(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| Error::Config(format!("{name} should be set")))
}

fn optional<T: FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) => parse_var(name, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_var<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("{name} can't be parsed: '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbers_and_addresses() {
        assert_eq!(parse_var::<u64>("X", " 42 ").unwrap(), 42);
        assert!(parse_var::<SocketAddr>("X", "127.0.0.1:8443").is_ok());
        assert!(matches!(parse_var::<u64>("X", "abc"), Err(Error::Config(_))));
    }

    #[test]
    fn engine_defaults() {
        let engine = EngineConfig::default();
        assert_eq!(engine.pacing, Duration::from_millis(500));
        assert_eq!(engine.recent_capacity, 10);
    }
}
