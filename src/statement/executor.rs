//! Credential statement execution
//!
//! Each template is either sent whole (procedural blocks) or split on semicolons
//! outside quoted spans. Placeholders are substituted textually per unit and the
//! units run in source order. Templates come from administrators and are trusted;
//! nothing here is parameter binding.
//!
//! A failed unit stops the remaining units of its template. Earlier units are not
//! rolled back and there is no transaction spanning templates.

use super::classifier::Classifier;
use super::scanner::split_outside_quotes;
use crate::connection::{RequestContext, SqlHandle};
use crate::metrics::{counters, labels};
use crate::{Error, Result};
use std::borrow::Cow;

/// Placeholder values substituted into statement templates
#[derive(Debug, Clone, Default)]
pub struct StatementParams {
    /// Replaces `{{name}}`
    pub name: Option<String>,
    /// Replaces `{{password}}`
    pub password: Option<String>,
    /// Replaces `{{expiration}}`
    pub expiration: Option<String>,
}

impl StatementParams {
    /// Params for the given account name
    pub fn for_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Set the password
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the formatted expiration
    pub fn expiration(mut self, expiration: impl Into<String>) -> Self {
        self.expiration = Some(expiration.into());
        self
    }

    fn pairs(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("{{name}}", self.name.as_deref()),
            ("{{password}}", self.password.as_deref()),
            ("{{expiration}}", self.expiration.as_deref()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
    }
}

/// Replace every placeholder with a value; placeholders without a value stay as-is
///
/// One left-to-right pass: substituted values are copied through and never
/// rescanned, so a name containing `{{password}}` stays literal.
pub fn substitute<'a>(template: &'a str, params: &StatementParams) -> Cow<'a, str> {
    let mut out = String::new();
    let mut copied = 0;
    let mut cursor = 0;

    while let Some(offset) = template[cursor..].find("{{") {
        let at = cursor + offset;
        let hit = params
            .pairs()
            .find(|(key, _)| template[at..].starts_with(*key));
        match hit {
            Some((key, value)) => {
                out.push_str(&template[copied..at]);
                out.push_str(value);
                cursor = at + key.len();
                copied = cursor;
            }
            None => cursor = at + 1,
        }
    }

    if copied == 0 {
        return Cow::Borrowed(template);
    }
    out.push_str(&template[copied..]);
    Cow::Owned(out)
}

/// Split a template into the units that will be executed, before substitution
pub fn prepare_units<'a>(classifier: &Classifier, template: &'a str) -> Result<Vec<&'a str>> {
    if classifier.classify(template) {
        let body = template.trim();
        return Ok(if body.is_empty() { Vec::new() } else { vec![body] });
    }
    split_outside_quotes(template)
}

/// Execute statement templates in order with the default classifier
pub async fn execute_statements<H: SqlHandle + ?Sized>(
    ctx: &RequestContext,
    handle: &H,
    templates: &[String],
    params: &StatementParams,
) -> Result<()> {
    StatementExecutor::default()
        .execute(ctx, handle, templates, params)
        .await
}

/// Runs statement templates against a live handle
#[derive(Debug, Clone, Default)]
pub struct StatementExecutor {
    classifier: Classifier,
}

impl StatementExecutor {
    /// Executor using a custom classifier
    pub fn new(classifier: Classifier) -> Self {
        Self { classifier }
    }

    /// Execute every template, stopping at the first failing unit
    pub async fn execute<H: SqlHandle + ?Sized>(
        &self,
        ctx: &RequestContext,
        handle: &H,
        templates: &[String],
        params: &StatementParams,
    ) -> Result<()> {
        for (template_idx, template) in templates.iter().enumerate() {
            let units = prepare_units(&self.classifier, template)?;
            tracing::debug!(template = template_idx, units = units.len(), "executing template");

            for (unit_idx, unit) in units.iter().enumerate() {
                let query = substitute(unit, params);
                match ctx.run("exec", handle.exec(&query)).await {
                    Ok(()) => counters::statement_executed(labels::OUTCOME_SUCCESS),
                    Err(e) => {
                        counters::statement_executed(labels::OUTCOME_ERROR);
                        if e.is_cancellation() {
                            return Err(e);
                        }
                        return Err(Error::Execution {
                            template: template_idx,
                            unit: unit_idx,
                            message: e.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
