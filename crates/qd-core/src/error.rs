use qd_model::OptionKind;
use thiserror::Error;

/// Option-level failures raised by a backend's option registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("unknown option: {0}")]
    UnknownKey(String),
    #[error("option {key} expects a {expected} value, got {found}")]
    TypeMismatch {
        key: String,
        expected: OptionKind,
        found: OptionKind,
    },
    #[error("invalid value for option {key}: {reason}")]
    InvalidValue { key: String, reason: String },
    #[error("option {0} has not been set")]
    Unset(String),
}

/// Failures a backend reports from `submit`.
///
/// Launch failures of the job itself are not errors: they surface as a job that reports `Failed`.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend not configured: {0}")]
    NotConfigured(String),
    #[error(transparent)]
    Option(#[from] OptionError),
}

/// Errors returned across the driver boundary.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("driver {driver} does not support {operation}")]
    UnsupportedOperation {
        driver: String,
        operation: &'static str,
    },
    #[error("driver {driver}: {source}")]
    Option {
        driver: String,
        #[source]
        source: OptionError,
    },
    #[error("driver {driver}: {source}")]
    Backend {
        driver: String,
        #[source]
        source: BackendError,
    },
    #[error("driver {driver}: job handle was issued by another driver")]
    ForeignHandle { driver: String },
    #[error("driver {driver}: {count} job handle(s) still outstanding at teardown")]
    OutstandingJobs { driver: String, count: usize },
}

impl DriverError {
    /// Name of the driver that raised the error.
    pub fn driver(&self) -> &str {
        match self {
            DriverError::UnsupportedOperation { driver, .. }
            | DriverError::Option { driver, .. }
            | DriverError::Backend { driver, .. }
            | DriverError::ForeignHandle { driver }
            | DriverError::OutstandingJobs { driver, .. } => driver,
        }
    }
}
