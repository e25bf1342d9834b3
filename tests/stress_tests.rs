//! Stress testing suite for ysql-creds
//!
//! Hammers the shared handle from many tasks while the target flaps, and checks
//! the manager never leaks or duplicates handles.
//!
//! Run with: cargo test --test stress_tests -- --nocapture

mod common;

use chrono::Utc;
use common::{init_tracing, raw_config, MockDriver};
use serde_json::Value;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use ysql_creds::{DeleteUserRequest, NewUserRequest, RequestContext, UsernameMetadata, YsqlDatabase};

async fn engine(max_open: usize) -> (Arc<YsqlDatabase<MockDriver>>, MockDriver) {
    init_tracing();
    let driver = MockDriver::new();
    let db = YsqlDatabase::new(driver.clone());
    let mut raw = raw_config();
    raw.insert("max_open_connections".into(), Value::from(max_open));
    db.initialize(&RequestContext::new(), raw, false)
        .await
        .expect("initialize");
    (Arc::new(db), driver)
}

fn request(i: usize) -> NewUserRequest {
    NewUserRequest {
        metadata: UsernameMetadata::new(format!("tok{}", i), "stress"),
        statements: vec![r#"CREATE ROLE "{{name}}" PASSWORD '{{password}}';"#.into()],
        password: format!("pw{}", i),
        expiration: Utc::now() + chrono::Duration::hours(1),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_stress_concurrent_issuance() {
    println!("Test: 200 concurrent new_user calls on one handle");

    let (db, driver) = engine(4).await;

    let tasks: Vec<_> = (0..200)
        .map(|i| {
            let db = Arc::clone(&db);
            tokio::spawn(async move { db.new_user(&RequestContext::new(), request(i)).await })
        })
        .collect();

    let mut names = Vec::new();
    for task in futures::future::join_all(tasks).await {
        names.push(task.expect("task panicked").expect("new_user"));
    }

    names.sort();
    names.dedup();
    assert_eq!(names.len(), 200, "usernames collided");
    assert_eq!(driver.state.opens(), 1);
    assert_eq!(driver.state.executed().len(), 200);
    println!("✓ {} users issued over {} handle(s)", names.len(), driver.state.opens());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_stress_flapping_target() {
    println!("Test: operations while health checks fail intermittently");

    let (db, driver) = engine(2).await;
    let flapper = {
        let state = Arc::clone(&driver.state);
        tokio::spawn(async move {
            for i in 0..50 {
                state.fail_ping.store(i % 2 == 0, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            state.fail_ping.store(false, Ordering::SeqCst);
        })
    };

    let tasks: Vec<_> = (0..100)
        .map(|i| {
            let db = Arc::clone(&db);
            tokio::spawn(async move {
                db.delete_user(
                    &RequestContext::new(),
                    DeleteUserRequest {
                        username: format!("user{}", i),
                        statements: vec![],
                    },
                )
                .await
            })
        })
        .collect();

    for task in futures::future::join_all(tasks).await {
        task.expect("task panicked").expect("delete_user");
    }
    flapper.await.expect("flapper");

    // Only one handle is ever live; all replaced ones were closed
    let live = usize::from(db.manager().has_connection().await);
    assert_eq!(driver.state.opens(), driver.state.closes() + live);
    assert_eq!(driver.state.executed().len(), 200);
    println!("✓ {} handles opened while flapping", driver.state.opens());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stress_deadlines_under_contention() {
    println!("Test: short deadlines while a slow open holds the lock");

    let (db, driver) = engine(8).await;
    driver.state.open_delay_ms.store(200, Ordering::SeqCst);

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let db = Arc::clone(&db);
            tokio::spawn(async move {
                let ctx = RequestContext::with_timeout(Duration::from_millis(20));
                db.new_user(&ctx, request(i)).await
            })
        })
        .collect();

    for task in futures::future::join_all(tasks).await {
        let err = task.expect("task panicked").expect_err("deadline should expire");
        assert!(err.is_cancellation(), "{}", err);
    }

    // Nothing was committed to the manager by the abandoned opens
    assert!(!db.manager().has_connection().await);
    assert!(driver.state.executed().is_empty());
}
