//! Connection string building
//!
//! Produces libpq keyword/value strings:
//! * host=<H> port=<P> user=<U> password=<PW> dbname=<D> sslmode=disable
//!
//! Values that are empty or contain whitespace, quotes, or backslashes are
//! single-quoted with backslash escapes. `Display` and `Debug` redact the password.

use super::Config;
use std::fmt;

/// Keyword/value connection string for the configured target
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    host: String,
    port: u16,
    user: String,
    password: String,
    database: String,
}

impl ConnectionString {
    /// Build from a validated configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            user: config.username.clone(),
            password: config.password.clone(),
            database: config.database.clone(),
        }
    }

    /// Full string including the password, for handing to the driver only
    pub fn expose(&self) -> String {
        self.render(&quote_value(&self.password))
    }

    fn render(&self, password: &str) -> String {
        format!(
            "host={} port={} user={} password={} dbname={} sslmode=disable",
            quote_value(&self.host),
            self.port,
            quote_value(&self.user),
            password,
            quote_value(&self.database),
        )
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render("<redacted>"))
    }
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionString({})", self)
    }
}

/// Quote a value for a keyword/value connection string when needed
fn quote_value(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '\'' || c == '\\');
    if !needs_quotes {
        return value.to_string();
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if c == '\'' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}
