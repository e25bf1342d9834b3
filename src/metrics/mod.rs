//! Metrics for connection lifecycle and credential operations
//!
//! Emitted through the `metrics` facade; nothing is recorded unless the host
//! process installs a recorder.

pub mod counters;
pub mod histograms;
pub mod labels;
