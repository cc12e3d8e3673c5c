//! Server Configuration
//!
//! Everything the binary reads from the environment, parsed once at startup.

use anyhow::{Context, bail};
use conduit::ConduitConfig;
use std::env;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug)]
pub struct ServerConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    /// `None` allows any origin
    pub cors_origins: Option<Vec<String>>,
    pub log_format: LogFormat,
    pub conduit: ConduitConfig,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = get("DATABASE_URL").context("DATABASE_URL must be set")?;

        let max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(v) => v
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let port = match get("SERVER_PORT") {
            Some(v) => v.parse().context("SERVER_PORT must be a port number")?,
            None => DEFAULT_PORT,
        };

        let cors_origins = get("CORS_ORIGINS").map(|origins| {
            origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect()
        });

        let log_format = match get("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        let mut conduit = match get("JWT_SECRET") {
            Some(secret) if !secret.is_empty() => ConduitConfig {
                jwt_secret: secret.into_bytes(),
                ..ConduitConfig::default()
            },
            _ if cfg!(debug_assertions) => ConduitConfig::development(),
            _ => bail!("JWT_SECRET must be set in production"),
        };
        if let Some(issuer) = get("JWT_ISSUER") {
            conduit.token_issuer = issuer;
        }
        conduit.password_pepper = get("PASSWORD_PEPPER")
            .filter(|pepper| !pepper.is_empty())
            .map(String::into_bytes);

        Ok(Self {
            database_url,
            max_connections,
            host: get("SERVER_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            cors_origins,
            log_format,
            conduit,
        })
    }
}
