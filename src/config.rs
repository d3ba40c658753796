use crate::auth::challenge::{DEFAULT_CHALLENGE_PREFIX, DEFAULT_CHALLENGE_TTL_SECS};
use crate::auth::ChallengeSettings;
use chrono::TimeDelta;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    // Server
    pub bind_addr: SocketAddr,

    // Redis (None = in-process stores)
    pub redis_url: Option<String>,

    // Challenges
    pub challenge_ttl_secs: u64,
    pub challenge_prefix: String,
    pub challenge_sweep_interval_secs: u64,
    pub max_outstanding_challenges: usize,

    // Limits
    pub max_body_bytes: usize,

    // CORS (empty = deny cross-origin)
    pub cors_allowed_origins: Vec<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.bind_addr)
            .field(
                "redis_url",
                &self.redis_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("challenge_ttl_secs", &self.challenge_ttl_secs)
            .field("challenge_prefix", &self.challenge_prefix)
            .field(
                "challenge_sweep_interval_secs",
                &self.challenge_sweep_interval_secs,
            )
            .field("max_outstanding_challenges", &self.max_outstanding_challenges)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            redis_url: None,
            challenge_ttl_secs: DEFAULT_CHALLENGE_TTL_SECS as u64,
            challenge_prefix: DEFAULT_CHALLENGE_PREFIX.to_string(),
            challenge_sweep_interval_secs: 60,
            max_outstanding_challenges: 100_000,
            max_body_bytes: 16_384,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Attempt to load .env file, but don't fail if it doesn't exist
        // (env vars may be set directly in production)
        let _ = dotenvy::dotenv();

        let defaults = Config::default();

        // Server
        let bind_addr = match env::var("BIND_ADDR") {
            Ok(val) => val
                .parse::<SocketAddr>()
                .map_err(|e| ConfigError::ParseError("BIND_ADDR".to_string(), e.to_string()))?,
            Err(_) => defaults.bind_addr,
        };

        // Redis — optional, blank counts as unset
        let redis_url = env::var("REDIS_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        // Challenges
        let challenge_ttl_secs: u64 =
            parse_env_or_default("CHALLENGE_TTL_SECS", defaults.challenge_ttl_secs)?;
        require_positive("CHALLENGE_TTL_SECS", challenge_ttl_secs)?;
        if challenge_ttl_secs > 86_400 {
            return Err(ConfigError::InvalidValue(
                "CHALLENGE_TTL_SECS".to_string(),
                "must be at most 86400".to_string(),
            ));
        }

        let challenge_prefix =
            env::var("CHALLENGE_PREFIX").unwrap_or_else(|_| defaults.challenge_prefix.clone());
        if challenge_prefix.is_empty() {
            return Err(ConfigError::InvalidValue(
                "CHALLENGE_PREFIX".to_string(),
                "cannot be empty".to_string(),
            ));
        }
        if challenge_prefix.contains(':') || challenge_prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidValue(
                "CHALLENGE_PREFIX".to_string(),
                "may not contain ':' or whitespace".to_string(),
            ));
        }

        let challenge_sweep_interval_secs: u64 = parse_env_or_default(
            "CHALLENGE_SWEEP_INTERVAL_SECS",
            defaults.challenge_sweep_interval_secs,
        )?;
        require_positive(
            "CHALLENGE_SWEEP_INTERVAL_SECS",
            challenge_sweep_interval_secs,
        )?;

        let max_outstanding_challenges: usize = parse_env_or_default(
            "MAX_OUTSTANDING_CHALLENGES",
            defaults.max_outstanding_challenges,
        )?;
        require_positive("MAX_OUTSTANDING_CHALLENGES", max_outstanding_challenges as u64)?;

        // Limits
        let max_body_bytes = parse_env_or_default("MAX_BODY_BYTES", defaults.max_body_bytes)?;

        // CORS
        let cors_allowed_origins: Vec<String> = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Config {
            bind_addr,
            redis_url,
            challenge_ttl_secs,
            challenge_prefix,
            challenge_sweep_interval_secs,
            max_outstanding_challenges,
            max_body_bytes,
            cors_allowed_origins,
        })
    }

    pub fn challenge_settings(&self) -> ChallengeSettings {
        ChallengeSettings {
            ttl: TimeDelta::seconds(self.challenge_ttl_secs as i64),
            prefix: self.challenge_prefix.clone(),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.challenge_sweep_interval_secs)
    }
}

fn require_positive(key: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            "must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// Helper function to parse environment variable with a default value
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(key.to_string(), format!("{}: {}", e, val))),
        Err(_) => Ok(default),
    }
}
