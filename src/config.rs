use crate::error::ConfigError;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_POOL_SIZE: u32 = 5;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub timeout: Duration,
    pub pool_size: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub bot_token: String,
    pub signing_secret: String,
    pub port: u16,
    pub report_dir: PathBuf,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<DatabaseConfig, ConfigError> {
        DatabaseConfig::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<DatabaseConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_secs = parse_or(&lookup, "DATABASE_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;

        Ok(DatabaseConfig {
            url: required(&lookup, "DATABASE_URL")?,
            timeout: Duration::from_secs(timeout_secs),
            pool_size: parse_or(&lookup, "DATABASE_POOL_SIZE", DEFAULT_POOL_SIZE)?,
        })
    }
}

impl Config {
    /// Reads the process environment; binaries load `.env` first.
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // SIGNING_SECRET is the older name for the same value
        let signing_secret = match lookup("SLACK_SIGNING_SECRET").or_else(|| lookup("SIGNING_SECRET")) {
            Some(secret) if !secret.is_empty() => secret,
            _ => return Err(ConfigError::Missing("SLACK_SIGNING_SECRET")),
        };

        Ok(Config {
            database: DatabaseConfig::from_lookup(&lookup)?,
            bot_token: required(&lookup, "SLACK_BOT_TOKEN")?,
            signing_secret,
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            report_dir: lookup("REPORT_DIR")
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
        })
    }
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
