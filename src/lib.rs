//! ysql-creds: dynamic database credentials for YugabyteDB YSQL
//!
//! Provisions short-lived database users against a single YSQL (Postgres
//! wire-compatible) target:
//!
//! * One shared connection handle, opened lazily, health-checked on every
//!   acquisition, and replaced transparently when it goes bad
//! * Administrator-supplied statement templates with `{{name}}`,
//!   `{{password}}`, and `{{expiration}}` placeholders, split safely around
//!   quoted literals and procedural blocks
//! * Usernames rendered from a configurable template grammar
//!
//! # Example
//!
//! ```no_run
//! # async fn example() -> ysql_creds::Result<()> {
//! use ysql_creds::{NewUserRequest, RequestContext, UsernameMetadata, YsqlDatabase};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! let db = YsqlDatabase::default();
//! let ctx = RequestContext::with_timeout(Duration::from_secs(5));
//!
//! let config = json!({
//!     "host": "localhost",
//!     "port": 5433,
//!     "username": "yugabyte",
//!     "password": "yugabyte",
//! });
//! db.initialize(&ctx, config.as_object().cloned().unwrap_or_default(), true)
//!     .await?;
//!
//! let username = db
//!     .new_user(
//!         &ctx,
//!         NewUserRequest {
//!             metadata: UsernameMetadata::new("token", "readonly"),
//!             statements: vec![r#"CREATE ROLE "{{name}}" WITH LOGIN PASSWORD '{{password}}' VALID UNTIL '{{expiration}}';"#.into()],
//!             password: "s3cret".into(),
//!             expiration: chrono::Utc::now() + chrono::Duration::hours(1),
//!         },
//!     )
//!     .await?;
//! println!("created {}", username);
//!
//! db.close().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod connection;
pub mod database;
pub mod error;
pub mod metrics;
pub mod statement;
pub mod username;

pub use config::Config;
pub use connection::{ConnectionManager, PostgresDriver, RequestContext, SqlDriver, SqlHandle};
pub use database::{
    DeleteUserRequest, ExpirationChange, NewUserRequest, PasswordChange, UpdateUserRequest,
    YsqlDatabase,
};
pub use error::{Error, Result};
pub use username::{UsernameMetadata, UsernameTemplate};
