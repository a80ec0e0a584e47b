//! Connection descriptor resolution.
//!
//! The target database is described by one URL-shaped value, read from
//! `DATABASE_URL` (or `DATAPUMP_DATABASE_URL`). Its absence is fatal.

use std::fmt;
use std::str::FromStr;

use sqlx::postgres::PgConnectOptions;
use url::Url;

use crate::error::{PipelineError, Result};

/// Environment variables consulted, in order, for the connection string.
pub const DATABASE_URL_VARS: [&str; 2] = ["DATABASE_URL", "DATAPUMP_DATABASE_URL"];

const DEFAULT_PORT: u16 = 5432;

/// Host, port, database and credentials of the target Postgres instance.
#[derive(Clone)]
pub struct ConnectionDescriptor {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    options: PgConnectOptions,
}

impl ConnectionDescriptor {
    /// Resolves the descriptor from the process environment.
    pub fn from_env() -> Result<Self> {
        let value = DATABASE_URL_VARS
            .iter()
            .find_map(|name| std::env::var(name).ok());
        Self::resolve(value.as_deref())
    }

    /// Resolves the descriptor from an optional configuration value.
    pub fn resolve(value: Option<&str>) -> Result<Self> {
        match value.map(str::trim) {
            Some(url) if !url.is_empty() => Self::from_url(url),
            _ => Err(PipelineError::Configuration(format!(
                "could not find environment variable '{}'; did you copy .env.example to .env?",
                DATABASE_URL_VARS[0]
            ))),
        }
    }

    pub fn from_url(value: &str) -> Result<Self> {
        let invalid = |reason: String| {
            PipelineError::Configuration(format!("invalid database url: {reason}"))
        };

        let url = Url::parse(value).map_err(|err| invalid(err.to_string()))?;
        if !matches!(url.scheme(), "postgres" | "postgresql") {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }

        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| invalid("missing host".to_string()))?
            .to_string();
        let database = url.path().trim_start_matches('/').to_string();
        if database.is_empty() {
            return Err(invalid("missing database name".to_string()));
        }
        let username = Some(url.username())
            .filter(|user| !user.is_empty())
            .map(str::to_string);

        // sqlx handles percent-decoding of the credentials.
        let options = PgConnectOptions::from_str(value).map_err(|err| invalid(err.to_string()))?;

        Ok(Self {
            host,
            port: url.port().unwrap_or(DEFAULT_PORT),
            database,
            username,
            options,
        })
    }

    pub fn connect_options(&self) -> &PgConnectOptions {
        &self.options
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "postgres://")?;
        if let Some(user) = &self.username {
            write!(f, "{user}@")?;
        }
        write!(f, "{}:{}/{}", self.host, self.port, self.database)
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}
