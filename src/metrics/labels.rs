//! Metric label keys and values

/// Credential operation label key
pub const OPERATION: &str = "operation";

/// Outcome label key
pub const OUTCOME: &str = "outcome";

/// Error category label key
pub const ERROR_CATEGORY: &str = "error_category";

/// Reason label key for handle replacement
pub const REASON: &str = "reason";

/// Credential creation
pub const OPERATION_NEW_USER: &str = "new_user";

/// Credential password/expiration update
pub const OPERATION_UPDATE_USER: &str = "update_user";

/// Credential revocation
pub const OPERATION_DELETE_USER: &str = "delete_user";

/// Successful outcome
pub const OUTCOME_SUCCESS: &str = "success";

/// Failed outcome
pub const OUTCOME_ERROR: &str = "error";

/// Handle replaced after a failed probe
pub const REASON_PROBE_FAILED: &str = "probe_failed";

/// Handle replaced after exceeding its lifetime
pub const REASON_EXPIRED: &str = "expired";
