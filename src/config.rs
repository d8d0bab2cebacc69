//! Runtime configuration read from the environment (a `.env` file is honoured).

use crate::error::ConfigError;
use crate::routes::{DEFAULT_PER_PAGE, MAX_PER_PAGE};
use std::net::SocketAddr;
use std::str::FromStr;

pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    /// Postgres connection string; `None` selects the in-memory driver.
    pub database_url: Option<String>,
    pub schema: String,
    pub bind: SocketAddr,
    pub per_page: u32,
    pub max_per_page: u32,
    pub body_limit: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            database_url: None,
            schema: "public".into(),
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            per_page: DEFAULT_PER_PAGE,
            max_per_page: MAX_PER_PAGE,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = ApiConfig {
            database_url: lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            schema: lookup("MODEL_REST_SCHEMA").unwrap_or(defaults.schema),
            bind: parse(&lookup, "MODEL_REST_BIND")?.unwrap_or(defaults.bind),
            per_page: parse(&lookup, "MODEL_REST_PER_PAGE")?.unwrap_or(defaults.per_page),
            max_per_page: parse(&lookup, "MODEL_REST_MAX_PER_PAGE")?.unwrap_or(defaults.max_per_page),
            body_limit: parse(&lookup, "MODEL_REST_BODY_LIMIT")?.unwrap_or(defaults.body_limit),
        };
        if config.max_per_page == 0 {
            return Err(ConfigError::Invalid {
                key: "MODEL_REST_MAX_PER_PAGE",
                value: "0".into(),
            });
        }
        if config.per_page == 0 || config.per_page > config.max_per_page {
            return Err(ConfigError::Invalid {
                key: "MODEL_REST_PER_PAGE",
                value: config.per_page.to_string(),
            });
        }
        if !is_identifier(&config.schema) {
            return Err(ConfigError::Invalid {
                key: "MODEL_REST_SCHEMA",
                value: config.schema,
            });
        }
        Ok(config)
    }
}

fn parse<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
