use std::{env, fmt::Display, fs::read_to_string, path::PathBuf, str::FromStr};

use tracing::{info, warn};

const SECRETS_DIR: &str = "/run/secrets";

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub jwt_secret: String,
    /// JSON document loaded into the in-memory store at startup
    pub seed_file: Option<PathBuf>,
    /// Origin of the web front end allowed by CORS
    pub cors_origin: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {key} value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("{0} is not set and no secret file was found")]
    MissingSecret(&'static str),
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            port: try_load("NABTA_PORT", "8080")?,
            jwt_secret: read_secret("NABTA_JWT_SECRET")?,
            seed_file: optional("NABTA_SEED_FILE").map(PathBuf::from),
            cors_origin: optional("NABTA_CORS_ORIGIN"),
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = optional(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: e.to_string(),
        value,
    })
}

/// Secret from the environment, or from a mounted secret file
fn read_secret(key: &'static str) -> Result<String, ConfigError> {
    if let Some(value) = optional(key) {
        return Ok(value);
    }

    let path = format!("{SECRETS_DIR}/{key}");
    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            warn!("Failed to read {key} from {path}: {e}");
            ConfigError::MissingSecret(key)
        })
}
