//! Server configuration loaded from the process environment

use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{InboxError, InboxResult};

/// Messages shown per inbox page
pub const INBOX_PAGE_SIZE: u32 = 25;

/// Messages shown on the home page
pub const HOME_PAGE_SIZE: u32 = 10;

/// Deployment environment, selects the log format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" => Environment::Production,
            "staging" => Environment::Staging,
            _ => Environment::Development,
        }
    }

    /// Whether logs should be emitted as JSON
    pub fn structured_logs(&self) -> bool {
        matches!(self, Environment::Production | Environment::Staging)
    }
}

/// Runtime configuration for the inbox server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    pub public_dir: PathBuf,
    pub heartbeat_interval: Duration,
    pub send_timeout: Duration,
    pub max_body_bytes: usize,
    pub environment: Environment,
    /// Raw `LOG_LEVEL` value, validated when logging starts
    pub log_level: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_path: PathBuf::from("inbox.db"),
            public_dir: PathBuf::from("public"),
            heartbeat_interval: Duration::from_secs(5),
            send_timeout: Duration::from_secs(10),
            max_body_bytes: 32 << 20,
            environment: Environment::Development,
            log_level: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> InboxResult<Self> {
        let current_dir = env::current_dir()?;
        let mut config = Self::from_lookup(|key| env::var(key).ok())?;
        config.database_path = resolve(&current_dir, &config.database_path);
        config.public_dir = resolve(&current_dir, &config.public_dir);
        Ok(config)
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> InboxResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let heartbeat_secs: u64 = parse_var(&lookup, "INBOX_HEARTBEAT_SECS")?
            .unwrap_or(defaults.heartbeat_interval.as_secs());
        if heartbeat_secs == 0 {
            return Err(InboxError::Config(
                "INBOX_HEARTBEAT_SECS must be greater than zero".to_string(),
            ));
        }
        let send_timeout_secs: u64 = parse_var(&lookup, "INBOX_SEND_TIMEOUT_SECS")?
            .unwrap_or(defaults.send_timeout.as_secs());

        Ok(Self {
            bind_addr: parse_var(&lookup, "INBOX_BIND_ADDR")?.unwrap_or(defaults.bind_addr),
            database_path: lookup("INBOX_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            public_dir: lookup("INBOX_PUBLIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.public_dir),
            heartbeat_interval: Duration::from_secs(heartbeat_secs),
            send_timeout: Duration::from_secs(send_timeout_secs),
            max_body_bytes: parse_var(&lookup, "INBOX_MAX_BODY_BYTES")?
                .unwrap_or(defaults.max_body_bytes),
            environment: lookup("ENVIRONMENT")
                .map(|value| Environment::parse(&value))
                .unwrap_or(defaults.environment),
            log_level: lookup("LOG_LEVEL").filter(|value| !value.trim().is_empty()),
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> InboxResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| InboxError::Config(format!("invalid {}={:?}: {}", key, raw, e))),
        _ => Ok(None),
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
