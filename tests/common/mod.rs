//! Shared test helpers: an in-memory SQL driver with failure injection

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use ysql_creds::{Error, Result, SqlDriver, SqlHandle};

/// Knobs and observations shared between a driver and every handle it opens
#[derive(Debug, Default)]
pub struct MockState {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub pings: AtomicUsize,
    pub fail_open: AtomicBool,
    pub fail_ping: AtomicBool,
    pub fail_close: AtomicBool,
    pub open_delay_ms: AtomicUsize,
    pub fail_exec_containing: Mutex<Option<String>>,
    pub executed: Mutex<Vec<String>>,
    pub last_dsn: Mutex<Option<String>>,
}

impl MockState {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn fail_exec_containing(&self, needle: &str) {
        *self.fail_exec_containing.lock().unwrap() = Some(needle.to_string());
    }
}

#[derive(Clone, Default)]
pub struct MockDriver {
    pub state: Arc<MockState>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug)]
pub struct MockHandle {
    pub id: usize,
    state: Arc<MockState>,
    closed: AtomicBool,
}

#[async_trait]
impl SqlDriver for MockDriver {
    type Handle = MockHandle;

    async fn open(&self, dsn: &str) -> Result<MockHandle> {
        let delay = self.state.open_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }
        if self.state.fail_open.load(Ordering::SeqCst) {
            return Err(Error::Connection("connection refused".into()));
        }
        *self.state.last_dsn.lock().unwrap() = Some(dsn.to_string());
        let id = self.state.opens.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(MockHandle {
            id,
            state: Arc::clone(&self.state),
            closed: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl SqlHandle for MockHandle {
    async fn ping(&self) -> Result<()> {
        self.state.pings.fetch_add(1, Ordering::SeqCst);
        if self.closed.load(Ordering::SeqCst) || self.state.fail_ping.load(Ordering::SeqCst) {
            return Err(Error::Connection("server closed the connection".into()));
        }
        Ok(())
    }

    async fn exec(&self, statement: &str) -> Result<()> {
        if let Some(needle) = self.state.fail_exec_containing.lock().unwrap().as_deref() {
            if statement.contains(needle) {
                return Err(Error::Connection(format!("failed at {}", needle)));
            }
        }
        self.state.executed.lock().unwrap().push(statement.to_string());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_close.load(Ordering::SeqCst) {
            return Err(Error::Connection("close failed".into()));
        }
        Ok(())
    }
}

/// Minimal valid raw configuration
pub fn raw_config() -> Map<String, Value> {
    let mut raw = Map::new();
    raw.insert("host".into(), "db1".into());
    raw.insert("username".into(), "u".into());
    raw.insert("password".into(), "p".into());
    raw
}

/// Install a test subscriber once; honors RUST_LOG
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
