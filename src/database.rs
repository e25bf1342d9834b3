//! Credential engine facade
//!
//! The surface the outer secrets framework talks to: initialize from a raw
//! configuration map, create / update / delete database users, and close.

use crate::config::Config;
use crate::connection::{ConnectionManager, PostgresDriver, RequestContext, SqlDriver};
use crate::metrics::{counters, histograms, labels};
use crate::statement::{StatementExecutor, StatementParams};
use crate::username::{UsernameMetadata, UsernameTemplate};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, RwLock, Semaphore};
use tracing::Instrument;

/// Default statements for a password change
pub const DEFAULT_CHANGE_PASSWORD_STATEMENT: &str =
    r#"ALTER ROLE "{{name}}" WITH PASSWORD '{{password}}';"#;

/// Default statements for an expiration change
pub const DEFAULT_CHANGE_EXPIRATION_STATEMENT: &str =
    r#"ALTER ROLE "{{name}}" VALID UNTIL '{{expiration}}';"#;

/// Default revocation statements
pub const DEFAULT_REVOCATION_STATEMENT: &str = r#"REVOKE ALL PRIVILEGES ON ALL TABLES IN SCHEMA public FROM "{{name}}";
DROP ROLE IF EXISTS "{{name}}";"#;

/// Timestamp layout substituted for `{{expiration}}`
pub const EXPIRATION_FORMAT: &str = "%Y-%m-%d %H:%M:%S%z";

/// Request to create a new database user
#[derive(Debug, Clone)]
pub struct NewUserRequest {
    /// Metadata feeding the username template
    pub metadata: UsernameMetadata,
    /// Creation statement templates (at least one non-blank)
    pub statements: Vec<String>,
    /// Password for the new user
    pub password: String,
    /// When the credential stops being valid
    pub expiration: DateTime<Utc>,
}

/// New password plus the statements applying it
#[derive(Debug, Clone)]
pub struct PasswordChange {
    /// Replacement password
    pub new_password: String,
    /// Statement templates; empty uses the default
    pub statements: Vec<String>,
}

/// New expiration plus the statements applying it
#[derive(Debug, Clone)]
pub struct ExpirationChange {
    /// Replacement expiration
    pub new_expiration: DateTime<Utc>,
    /// Statement templates; empty uses the default
    pub statements: Vec<String>,
}

/// Request to change an existing user's password and/or expiration
#[derive(Debug, Clone)]
pub struct UpdateUserRequest {
    /// Existing username
    pub username: String,
    /// Password change, if any
    pub password: Option<PasswordChange>,
    /// Expiration change, if any
    pub expiration: Option<ExpirationChange>,
}

/// Request to revoke a database user
#[derive(Debug, Clone)]
pub struct DeleteUserRequest {
    /// Username to revoke
    pub username: String,
    /// Revocation statement templates; empty uses the default
    pub statements: Vec<String>,
}

#[derive(Clone)]
struct Settings {
    username_template: Arc<UsernameTemplate>,
    limiter: Arc<Semaphore>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            username_template: Arc::new(UsernameTemplate::default()),
            limiter: Arc::new(Semaphore::new(crate::config::DEFAULT_MAX_OPEN_CONNECTIONS)),
        }
    }
}

/// Dynamic credential engine for one YSQL target
pub struct YsqlDatabase<D: SqlDriver = PostgresDriver> {
    manager: ConnectionManager<D>,
    executor: StatementExecutor,
    settings: RwLock<Settings>,
}

impl Default for YsqlDatabase<PostgresDriver> {
    fn default() -> Self {
        Self::new(PostgresDriver)
    }
}

impl<D: SqlDriver> YsqlDatabase<D> {
    /// Create an uninitialized engine over the given driver
    pub fn new(driver: D) -> Self {
        Self {
            manager: ConnectionManager::new(driver),
            executor: StatementExecutor::default(),
            settings: RwLock::new(Settings::default()),
        }
    }

    /// Connection manager backing this engine
    pub fn manager(&self) -> &ConnectionManager<D> {
        &self.manager
    }

    /// Accept a raw configuration map; returns it unchanged on success
    ///
    /// The username template is compiled before any connection work, so a bad
    /// template fails initialize without touching the database.
    pub async fn initialize(
        &self,
        ctx: &RequestContext,
        raw: Map<String, Value>,
        verify: bool,
    ) -> Result<Map<String, Value>> {
        let config = Config::from_map(&raw)?;
        let settings = Settings {
            username_template: Arc::new(UsernameTemplate::compile(&config.username_template)?),
            limiter: Arc::new(Semaphore::new(config.max_open_connections)),
        };

        self.manager.initialize(ctx, config, verify).await?;

        *self.settings.write().await = settings;
        Ok(raw)
    }

    /// Create a user and return its generated name
    pub async fn new_user(&self, ctx: &RequestContext, req: NewUserRequest) -> Result<String> {
        let span = tracing::info_span!(
            "new_user",
            display_name = %req.metadata.display_name,
            role_name = %req.metadata.role_name
        );
        let start = Instant::now();
        let result = self.create(ctx, req).instrument(span).await;
        record(labels::OPERATION_NEW_USER, start, &result);
        result
    }

    /// Change a user's password and/or expiration
    pub async fn update_user(&self, ctx: &RequestContext, req: UpdateUserRequest) -> Result<()> {
        let span = tracing::info_span!("update_user", username = %req.username);
        let start = Instant::now();
        let result = self.update(ctx, req).instrument(span).await;
        record(labels::OPERATION_UPDATE_USER, start, &result);
        result
    }

    /// Revoke a user
    pub async fn delete_user(&self, ctx: &RequestContext, req: DeleteUserRequest) -> Result<()> {
        let span = tracing::info_span!("delete_user", username = %req.username);
        let start = Instant::now();
        let result = self.delete(ctx, req).instrument(span).await;
        record(labels::OPERATION_DELETE_USER, start, &result);
        result
    }

    /// Release the database handle
    pub async fn close(&self) -> Result<()> {
        self.manager.close().await
    }

    async fn create(&self, ctx: &RequestContext, req: NewUserRequest) -> Result<String> {
        if all_blank(&req.statements) {
            return Err(Error::InvalidRequest(
                "at least one creation statement is required".into(),
            ));
        }

        let settings = self.settings.read().await.clone();
        let _permit = acquire_permit(ctx, &settings).await?;

        let username = settings.username_template.render_identifier(&req.metadata)?;
        let handle = self.manager.get_connection(ctx).await?;

        let params = StatementParams::for_name(&username)
            .password(req.password)
            .expiration(format_expiration(&req.expiration));
        self.executor
            .execute(ctx, &*handle, &req.statements, &params)
            .await?;

        tracing::info!(username = %username, "user created");
        Ok(username)
    }

    async fn update(&self, ctx: &RequestContext, req: UpdateUserRequest) -> Result<()> {
        if req.username.is_empty() {
            return Err(Error::InvalidRequest("missing username".into()));
        }
        if req.password.is_none() && req.expiration.is_none() {
            return Err(Error::InvalidRequest("no changes requested".into()));
        }

        let settings = self.settings.read().await.clone();
        let _permit = acquire_permit(ctx, &settings).await?;
        let handle = self.manager.get_connection(ctx).await?;

        if let Some(change) = req.password {
            let statements = or_default(change.statements, DEFAULT_CHANGE_PASSWORD_STATEMENT);
            let params = StatementParams::for_name(&req.username).password(change.new_password);
            self.executor
                .execute(ctx, &*handle, &statements, &params)
                .await?;
            tracing::info!("password changed");
        }

        if let Some(change) = req.expiration {
            let statements = or_default(change.statements, DEFAULT_CHANGE_EXPIRATION_STATEMENT);
            let params = StatementParams::for_name(&req.username)
                .expiration(format_expiration(&change.new_expiration));
            self.executor
                .execute(ctx, &*handle, &statements, &params)
                .await?;
            tracing::info!("expiration changed");
        }

        Ok(())
    }

    async fn delete(&self, ctx: &RequestContext, req: DeleteUserRequest) -> Result<()> {
        if req.username.is_empty() {
            return Err(Error::InvalidRequest("missing username".into()));
        }

        let settings = self.settings.read().await.clone();
        let _permit = acquire_permit(ctx, &settings).await?;
        let handle = self.manager.get_connection(ctx).await?;

        let statements = or_default(req.statements, DEFAULT_REVOCATION_STATEMENT);
        let params = StatementParams::for_name(&req.username);
        self.executor
            .execute(ctx, &*handle, &statements, &params)
            .await?;

        tracing::info!("user revoked");
        Ok(())
    }
}

/// Format an expiration the way `VALID UNTIL` expects it
pub fn format_expiration(expiration: &DateTime<Utc>) -> String {
    expiration.format(EXPIRATION_FORMAT).to_string()
}

async fn acquire_permit(ctx: &RequestContext, settings: &Settings) -> Result<OwnedSemaphorePermit> {
    let limiter = Arc::clone(&settings.limiter);
    ctx.run("acquire permit", async move {
        limiter
            .acquire_owned()
            .await
            .map_err(|_| Error::Connection("operation limiter closed".into()))
    })
    .await
}

fn all_blank(statements: &[String]) -> bool {
    statements.iter().all(|s| s.trim().is_empty())
}

fn or_default(statements: Vec<String>, default: &str) -> Vec<String> {
    if all_blank(&statements) {
        vec![default.to_string()]
    } else {
        statements
    }
}

fn record<T>(operation: &'static str, start: Instant, result: &Result<T>) {
    histograms::credential_operation_duration(operation, start.elapsed().as_millis() as u64);
    match result {
        Ok(_) => counters::credential_operation(operation, labels::OUTCOME_SUCCESS),
        Err(e) => {
            counters::credential_operation(operation, labels::OUTCOME_ERROR);
            tracing::warn!(operation, error = %e, category = e.category(), "credential operation failed");
        }
    }
}
