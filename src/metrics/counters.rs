//! Counter metrics

use super::labels;

/// A new database handle was opened
pub fn connection_opened() {
    ::metrics::counter!("ysql_creds_connections_opened_total").increment(1);
}

/// Opening a database handle failed
pub fn connection_open_failed(error_category: &'static str) {
    ::metrics::counter!(
        "ysql_creds_connection_open_failures_total",
        labels::ERROR_CATEGORY => error_category
    )
    .increment(1);
}

/// The live handle was discarded
pub fn connection_replaced(reason: &'static str) {
    ::metrics::counter!(
        "ysql_creds_connections_replaced_total",
        labels::REASON => reason
    )
    .increment(1);
}

/// A statement unit finished executing
pub fn statement_executed(outcome: &'static str) {
    ::metrics::counter!(
        "ysql_creds_statements_executed_total",
        labels::OUTCOME => outcome
    )
    .increment(1);
}

/// A credential operation finished
pub fn credential_operation(operation: &'static str, outcome: &'static str) {
    ::metrics::counter!(
        "ysql_creds_credential_operations_total",
        labels::OPERATION => operation,
        labels::OUTCOME => outcome
    )
    .increment(1);
}
