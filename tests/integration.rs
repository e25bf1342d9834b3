//! Integration tests for ysql-creds
//!
//! These tests require a running YugabyteDB (or Postgres) instance with a
//! superuser able to create roles.
//!
//! Run with: cargo test --test integration -- --ignored --nocapture

use chrono::Utc;
use serde_json::{json, Map, Value};
use std::time::Duration;
use ysql_creds::{
    DeleteUserRequest, NewUserRequest, PasswordChange, RequestContext, SqlHandle,
    UpdateUserRequest, UsernameMetadata, YsqlDatabase,
};

fn test_config() -> Map<String, Value> {
    let host = std::env::var("YSQL_HOST").unwrap_or_else(|_| "localhost".to_string());
    let port = std::env::var("YSQL_PORT").unwrap_or_else(|_| "5433".to_string());
    let user = std::env::var("YSQL_USER").unwrap_or_else(|_| "yugabyte".to_string());
    let password = std::env::var("YSQL_PASSWORD").unwrap_or_else(|_| "yugabyte".to_string());
    let db = std::env::var("YSQL_DB").unwrap_or_else(|_| "yugabyte".to_string());

    match json!({
        "host": host,
        "port": port,
        "username": user,
        "password": password,
        "db": db,
        "max_connection_lifetime": "5m",
    }) {
        Value::Object(m) => m,
        _ => unreachable!(),
    }
}

fn ctx() -> RequestContext {
    RequestContext::with_timeout(Duration::from_secs(10))
}

#[tokio::test]
#[ignore] // Requires YSQL running
async fn test_initialize_with_verify() {
    let db = YsqlDatabase::default();
    db.initialize(&ctx(), test_config(), true)
        .await
        .expect("initialize");

    assert!(db.manager().has_connection().await);
    db.close().await.expect("close");
}

#[tokio::test]
#[ignore] // Requires YSQL running
async fn test_verify_fails_against_wrong_port() {
    let db = YsqlDatabase::default();
    let mut config = test_config();
    config.insert("port".into(), Value::from(1));

    let err = db
        .initialize(&ctx(), config, true)
        .await
        .expect_err("nothing listens on port 1");
    println!("verify error: {}", err);
    assert!(!db.manager().is_initialized().await);
}

#[tokio::test]
#[ignore] // Requires YSQL running
async fn test_user_lifecycle() {
    let db = YsqlDatabase::default();
    db.initialize(&ctx(), test_config(), true)
        .await
        .expect("initialize");

    let username = db
        .new_user(
            &ctx(),
            NewUserRequest {
                metadata: UsernameMetadata::new("integration", "lifecycle"),
                statements: vec![
                    r#"CREATE ROLE "{{name}}" WITH LOGIN PASSWORD '{{password}}' VALID UNTIL '{{expiration}}';
                       GRANT CONNECT ON DATABASE yugabyte TO "{{name}}";"#
                        .into(),
                ],
                password: "It's;a-secret".into(),
                expiration: Utc::now() + chrono::Duration::hours(1),
            },
        )
        .await
        .expect("new_user");
    println!("created {}", username);

    let handle = db.manager().get_connection(&ctx()).await.expect("handle");
    handle
        .exec(&format!(
            "DO $$ BEGIN IF NOT EXISTS (SELECT 1 FROM pg_roles WHERE rolname = '{}') THEN RAISE EXCEPTION 'missing role'; END IF; END $$",
            username
        ))
        .await
        .expect("role exists");

    db.update_user(
        &ctx(),
        UpdateUserRequest {
            username: username.clone(),
            password: Some(PasswordChange {
                new_password: "rotated".into(),
                statements: vec![],
            }),
            expiration: None,
        },
    )
    .await
    .expect("update_user");

    db.delete_user(
        &ctx(),
        DeleteUserRequest {
            username: username.clone(),
            statements: vec![],
        },
    )
    .await
    .expect("delete_user");

    db.close().await.expect("close");
}

#[tokio::test]
#[ignore] // Requires YSQL running
async fn test_procedural_block_statement() {
    let db = YsqlDatabase::default();
    db.initialize(&ctx(), test_config(), false)
        .await
        .expect("initialize");

    let username = db
        .new_user(
            &ctx(),
            NewUserRequest {
                metadata: UsernameMetadata::new("integration", "block"),
                statements: vec![r#"DO $$
BEGIN
  CREATE ROLE "{{name}}" WITH LOGIN PASSWORD '{{password}}';
  EXECUTE 'COMMENT ON ROLE "{{name}}" IS ''issued; temporary''';
END
$$;"#
                    .into()],
                password: "pw".into(),
                expiration: Utc::now() + chrono::Duration::minutes(5),
            },
        )
        .await
        .expect("new_user");

    db.delete_user(
        &ctx(),
        DeleteUserRequest {
            username,
            statements: vec![],
        },
    )
    .await
    .expect("delete_user");
}
