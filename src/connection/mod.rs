//! Connection management
//!
//! This module handles:
//! * The SQL capability boundary (open / ping / exec / close)
//! * Lifecycle of the single shared handle (lazy open, health check, replace)
//! * State machine enforcement
//! * Per-request deadlines and cancellation

mod context;
mod driver;
mod manager;
mod state;

pub use context::RequestContext;
pub use driver::{PostgresDriver, PostgresHandle, SqlDriver, SqlHandle};
pub use manager::ConnectionManager;
pub use state::ManagerState;
