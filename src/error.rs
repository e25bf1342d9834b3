//! Error types for ysql-creds

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration missing a required field or carrying an unusable value
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Operation attempted before a successful initialize
    #[error("connection manager not initialized")]
    NotInitialized,

    /// Opening or probing the database handle failed
    #[error("connection error: {0}")]
    Connection(String),

    /// Statement template with an unterminated quote
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Username template with an unknown field, transform, or generator
    #[error("invalid username template: {0}")]
    InvalidTemplate(String),

    /// A statement unit failed; remaining units of the template were skipped
    #[error("statement {unit} of template {template} failed: {message}")]
    Execution {
        /// Zero-based index of the statement template
        template: usize,
        /// Zero-based index of the unit within the template
        unit: usize,
        /// Driver error message
        message: String,
    },

    /// Request rejected before any work was done
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid manager state transition
    #[error("invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// Expected state
        expected: String,
        /// Actual state
        actual: String,
    },

    /// Caller cancelled the operation
    #[error("{operation} cancelled")]
    Cancelled {
        /// Operation that was running
        operation: &'static str,
    },

    /// Caller deadline expired
    #[error("{operation} timed out")]
    Timeout {
        /// Operation that was running
        operation: &'static str,
    },

    /// Error with operation context
    #[error("{context}: {source}")]
    Context {
        /// What was being attempted
        context: String,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap this error with operation context
    pub fn context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping any context wrappers
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if this is a cancellation-kind failure (cancel or deadline)
    pub fn is_cancellation(&self) -> bool {
        matches!(self.root(), Error::Cancelled { .. } | Error::Timeout { .. })
    }

    /// Get error category for metrics and log labels
    pub fn category(&self) -> &'static str {
        match self.root() {
            Error::Config(_) => "config",
            Error::NotInitialized => "not_initialized",
            Error::Connection(_) => "connection",
            Error::MalformedInput(_) => "malformed_input",
            Error::InvalidTemplate(_) => "invalid_template",
            Error::Execution { .. } => "execution",
            Error::InvalidRequest(_) => "invalid_request",
            Error::InvalidState { .. } => "invalid_state",
            Error::Cancelled { .. } => "cancelled",
            Error::Timeout { .. } => "timeout",
            Error::Context { .. } => "context",
        }
    }
}

impl From<tokio_postgres::Error> for Error {
    fn from(e: tokio_postgres::Error) -> Self {
        Error::Connection(e.to_string())
    }
}
