//! Histogram metrics

use super::labels;

/// Time spent obtaining a live handle (probe and possible reopen), in milliseconds
pub fn connection_acquire_duration(duration_ms: u64) {
    ::metrics::histogram!("ysql_creds_connection_acquire_duration_ms").record(duration_ms as f64);
}

/// Time spent on a credential operation, in milliseconds
pub fn credential_operation_duration(operation: &'static str, duration_ms: u64) {
    ::metrics::histogram!(
        "ysql_creds_credential_operation_duration_ms",
        labels::OPERATION => operation
    )
    .record(duration_ms as f64);
}
