use std::env;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use strum_macros::{AsRefStr, Display, EnumString};

/// How consumed leave days are counted against a quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum QuotaPolicy {
    /// Every submitted request consumes quota at submission time.
    Submit,
    /// Only approved requests consume quota; the submission check is advisory.
    Approved,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub api_prefix: String,

    pub quota_policy: QuotaPolicy,

    // Database
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub lock_wait_timeout_secs: u32,

    // Rate limiting
    pub rate_protected_per_min: u32,

    pub leave_type_cache_ttl: Duration,

    pub log_dir: String,
    pub log_level: tracing::Level,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key/value source; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let or_default = |name: &'static str, default: &str| {
            lookup(name).unwrap_or_else(|| default.to_string())
        };

        Ok(Self {
            server_addr: or_default("SERVER_ADDR", "0.0.0.0:8080"),
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            api_prefix: or_default("API_PREFIX", "/api"),

            quota_policy: parse(&lookup, "QUOTA_POLICY", "submit")?,

            db_max_connections: parse(&lookup, "DB_MAX_CONNECTIONS", "10")?,
            db_acquire_timeout: Duration::from_secs(parse(
                &lookup,
                "DB_ACQUIRE_TIMEOUT_SECS",
                "5",
            )?),
            lock_wait_timeout_secs: parse(&lookup, "LOCK_WAIT_TIMEOUT_SECS", "5")?,

            rate_protected_per_min: parse(&lookup, "RATE_PROTECTED_PER_MIN", "1000")?,

            leave_type_cache_ttl: Duration::from_secs(parse(
                &lookup,
                "LEAVE_TYPE_CACHE_TTL_SECS",
                "300",
            )?),

            log_dir: or_default("LOG_DIR", "logs"),
            log_level: parse(&lookup, "LOG_LEVEL", "debug")?,
        })
    }
}

fn parse<F, T>(lookup: &F, name: &'static str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let value = lookup(name).unwrap_or_else(|| default.to_string());
    let parsed = value.trim().parse();
    parsed.map_err(|_| ConfigError::Invalid { name, value })
}
