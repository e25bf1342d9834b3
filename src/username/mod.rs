//! Username generation from a configurable template
//!
//! Templates are compiled once (at initialize) and rendered per credential. All
//! field, generator, and transform names are resolved at compile time, so a bad
//! template is rejected before any credential material exists.
//!
//! Rendering takes `&self` and keeps no state; one compiled template is shared
//! across concurrent issuances.

mod parser;

use crate::{Error, Result};
use parser::{Field, Segment, Source, Transform};
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Built-in grammar used when no template is configured
pub const DEFAULT_USERNAME_TEMPLATE: &str =
    "v-{{.DisplayName | truncate 8}}-{{.RoleName | truncate 8}}-{{random 20}}-{{unix_time}}";

/// Longest identifier Postgres keeps without truncation (NAMEDATALEN - 1)
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Request metadata available to username templates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsernameMetadata {
    /// Display name of the requesting token or entity
    pub display_name: String,
    /// Name of the role the credential is issued for
    pub role_name: String,
}

impl UsernameMetadata {
    /// Create metadata
    pub fn new(display_name: impl Into<String>, role_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            role_name: role_name.into(),
        }
    }
}

/// Compiled username template
///
/// # Examples
///
/// ```
/// use ysql_creds::username::{UsernameMetadata, UsernameTemplate};
///
/// let template = UsernameTemplate::compile("app_{{.RoleName | lowercase}}_{{random 4}}")?;
/// let name = template.render(&UsernameMetadata::new("token", "Readers"));
/// assert!(name.starts_with("app_readers_"));
/// assert_eq!(name.len(), "app_readers_".len() + 4);
/// # Ok::<(), ysql_creds::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsernameTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl Default for UsernameTemplate {
    fn default() -> Self {
        Self {
            source: DEFAULT_USERNAME_TEMPLATE.to_string(),
            segments: parser::parse(DEFAULT_USERNAME_TEMPLATE).unwrap_or_default(),
        }
    }
}

impl UsernameTemplate {
    /// Compile a template; an empty string selects the default grammar
    pub fn compile(template: &str) -> Result<Self> {
        if template.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self {
            source: template.to_string(),
            segments: parser::parse(template)?,
        })
    }

    /// Template source text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render a username for the given metadata
    pub fn render(&self, metadata: &UsernameMetadata) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Action { source, transforms } => {
                    let value = transforms
                        .iter()
                        .fold(produce(source, metadata), |value, t| apply(t, value));
                    out.push_str(&value);
                }
            }
        }
        out
    }

    /// Render and check the result is usable as a role name
    pub fn render_identifier(&self, metadata: &UsernameMetadata) -> Result<String> {
        let name = self.render(metadata);
        if name.is_empty() {
            return Err(Error::InvalidTemplate("rendered username is empty".into()));
        }
        if name.len() > MAX_IDENTIFIER_LEN {
            return Err(Error::InvalidTemplate(format!(
                "rendered username is {} bytes, limit is {}",
                name.len(),
                MAX_IDENTIFIER_LEN
            )));
        }
        Ok(name)
    }
}

fn produce(source: &Source, metadata: &UsernameMetadata) -> String {
    match source {
        Source::Field(Field::DisplayName) => metadata.display_name.clone(),
        Source::Field(Field::RoleName) => metadata.role_name.clone(),
        Source::Random(len) => rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(*len)
            .map(char::from)
            .collect(),
        Source::UnixTime => chrono::Utc::now().timestamp().to_string(),
        Source::UnixTimeMillis => chrono::Utc::now().timestamp_millis().to_string(),
    }
}

fn apply(transform: &Transform, value: String) -> String {
    match transform {
        Transform::Truncate(n) => value.chars().take(*n).collect(),
        Transform::Uppercase => value.to_uppercase(),
        Transform::Lowercase => value.to_lowercase(),
        Transform::Replace(from, to) => value.replace(from.as_str(), to),
    }
}
