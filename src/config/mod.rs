//! Connection configuration
//!
//! The outer framework hands over a loosely typed JSON object. `Config::from_map`
//! coerces each recognized key from an enumerated set of accepted encodings:
//!
//! | key | accepted |
//! |---|---|
//! | `host`, `username`, `password`, `db`, `username_template` | string |
//! | `port`, `max_open_connections`, `max_idle_connections` | integer, or decimal string |
//! | `max_connection_lifetime` | number of seconds, decimal string, or duration string (`"90s"`) |
//!
//! `null` counts as absent. Unrecognized keys are kept in the raw map and ignored.

mod connection_string;
mod duration;

pub use connection_string::ConnectionString;
pub use duration::parse_duration;

use crate::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Default YSQL port
pub const DEFAULT_PORT: u16 = 5433;

/// Default YSQL database
pub const DEFAULT_DATABASE: &str = "yugabyte";

/// Default cap on concurrent credential operations
pub const DEFAULT_MAX_OPEN_CONNECTIONS: usize = 4;

/// Typed connection configuration
#[derive(Clone, Serialize)]
pub struct Config {
    /// Database host (required)
    pub host: String,
    /// Database port
    pub port: u16,
    /// Administrative user (required)
    pub username: String,
    /// Administrative password (required)
    #[serde(skip)]
    pub password: String,
    /// Database name
    #[serde(rename = "db")]
    pub database: String,
    /// Maximum concurrent credential operations sharing the handle
    pub max_open_connections: usize,
    /// Maximum idle connections (normalized against `max_open_connections`)
    pub max_idle_connections: usize,
    /// Maximum age of the live handle before it is replaced (zero: unlimited)
    pub max_connection_lifetime: Duration,
    /// Username grammar override (empty: built-in default)
    pub username_template: String,
    /// Raw configuration as received
    #[serde(skip)]
    pub raw: Map<String, Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            username: String::new(),
            password: String::new(),
            database: DEFAULT_DATABASE.to_string(),
            max_open_connections: DEFAULT_MAX_OPEN_CONNECTIONS,
            max_idle_connections: 0,
            max_connection_lifetime: Duration::ZERO,
            username_template: String::new(),
            raw: Map::new(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("max_open_connections", &self.max_open_connections)
            .field("max_idle_connections", &self.max_idle_connections)
            .field("max_connection_lifetime", &self.max_connection_lifetime)
            .field("username_template", &self.username_template)
            .finish()
    }
}

impl Config {
    /// Create a configuration with the required fields and defaults elsewhere
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    /// Decode and validate a raw configuration map
    ///
    /// # Errors
    ///
    /// `Error::Config` when a value has an unaccepted type or a required field
    /// is missing or empty.
    pub fn from_map(raw: &Map<String, Value>) -> Result<Self> {
        let defaults = Self::default();
        let mut config = Self {
            host: string_field(raw, "host")?.unwrap_or_default(),
            port: match int_field(raw, "port")? {
                Some(port) => u16::try_from(port)
                    .map_err(|_| Error::Config(format!("port {} out of range", port)))?,
                None => defaults.port,
            },
            username: string_field(raw, "username")?.unwrap_or_default(),
            password: string_field(raw, "password")?.unwrap_or_default(),
            database: string_field(raw, "db")?.unwrap_or(defaults.database),
            max_open_connections: int_field(raw, "max_open_connections")?
                .map(to_usize)
                .unwrap_or(defaults.max_open_connections),
            max_idle_connections: int_field(raw, "max_idle_connections")?
                .map(to_usize)
                .unwrap_or(defaults.max_idle_connections),
            max_connection_lifetime: duration_field(raw, "max_connection_lifetime")?
                .unwrap_or(defaults.max_connection_lifetime),
            username_template: string_field(raw, "username_template")?.unwrap_or_default(),
            raw: raw.clone(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check required fields and normalize pool limits
    pub fn validate(&mut self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::Config("host cannot be empty".into()));
        }
        if self.username.is_empty() {
            return Err(Error::Config("username cannot be empty".into()));
        }
        if self.password.is_empty() {
            return Err(Error::Config("password cannot be empty".into()));
        }

        if self.max_open_connections == 0 {
            self.max_open_connections = DEFAULT_MAX_OPEN_CONNECTIONS;
        }
        if self.max_open_connections > Semaphore::MAX_PERMITS {
            return Err(Error::Config(format!(
                "max_open_connections {} exceeds limit {}",
                self.max_open_connections,
                Semaphore::MAX_PERMITS
            )));
        }
        if self.max_idle_connections == 0 || self.max_idle_connections > self.max_open_connections
        {
            self.max_idle_connections = self.max_open_connections;
        }
        Ok(())
    }

    /// Connection string for the driver
    pub fn connection_string(&self) -> ConnectionString {
        ConnectionString::from_config(self)
    }
}

fn lookup<'a>(raw: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    raw.get(key).filter(|v| !v.is_null())
}

fn type_error(key: &str, expected: &str, got: &Value) -> Error {
    Error::Config(format!("{} must be {}, got {}", key, expected, got))
}

fn string_field(raw: &Map<String, Value>, key: &str) -> Result<Option<String>> {
    match lookup(raw, key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(type_error(key, "a string", other)),
    }
}

fn int_field(raw: &Map<String, Value>, key: &str) -> Result<Option<i64>> {
    let value = match lookup(raw, key) {
        None => return Ok(None),
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };
    match value {
        Some(v) if v >= 0 => Ok(Some(v)),
        _ => Err(type_error(
            key,
            "a non-negative integer",
            lookup(raw, key).unwrap_or(&Value::Null),
        )),
    }
}

fn duration_field(raw: &Map<String, Value>, key: &str) -> Result<Option<Duration>> {
    match lookup(raw, key) {
        None => Ok(None),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(secs) => Duration::try_from_secs_f64(secs).map(Some).map_err(|_| {
                type_error(key, "a non-negative number of seconds", &Value::Number(n.clone()))
            }),
            None => Err(type_error(key, "a non-negative number of seconds", &Value::Number(n.clone()))),
        },
        Some(Value::String(s)) => parse_duration(s)
            .map(Some)
            .map_err(|e| Error::Config(format!("{}: {}", key, e))),
        Some(other) => Err(type_error(key, "a duration", other)),
    }
}

fn to_usize(v: i64) -> usize {
    usize::try_from(v).unwrap_or(usize::MAX)
}
