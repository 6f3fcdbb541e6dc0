use async_trait::async_trait;
use qd_model::{DriverKind, JobRequest, JobStatus, OptionValue};

use crate::error::{BackendError, OptionError};

/// Capability contract every execution backend implements.
///
/// A backend owns all of its execution state and defines its own per-job type.
/// The [`Driver`](crate::Driver) type-erases `Job` into a [`JobHandle`](crate::JobHandle),
/// so a consumer can drive any backend through the same handle type.
///
/// Obligations:
/// - `submit` may be called concurrently for distinct jobs.
/// - `status` must not block indefinitely; when the state cannot be determined promptly
///   it returns [`JobStatus::Unknown`]. Repeated and concurrent calls on the same job are allowed.
/// - `kill` on a job that already reached a terminal state is a no-op.
/// - `free_job` is called exactly once per job; `shutdown` once, after every job was freed.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Backend-owned state of one submitted job.
    type Job: Send + Sync + 'static;

    /// Backend family.
    fn kind(&self) -> DriverKind;

    /// Driver name reported in logs and errors.
    fn name(&self) -> &'static str {
        self.kind().label()
    }

    /// Start one job.
    ///
    /// A job that cannot be launched is still returned and reports `Failed`.
    /// `Err` is reserved for backend misconfiguration detected at submit time.
    async fn submit(&self, request: &JobRequest) -> Result<Self::Job, BackendError>;

    /// Current status of the job.
    async fn status(&self, job: &Self::Job) -> JobStatus;

    /// Request cancellation of the job.
    async fn kill(&self, job: &Self::Job);

    /// Release everything the backend holds for the job.
    async fn free_job(&self, job: Self::Job);

    /// Release backend-wide state.
    async fn shutdown(&self) {}

    /// Runtime option channel, or `None` when the backend has no runtime configuration.
    fn options(&self) -> Option<&dyn Configurable> {
        None
    }
}

/// Runtime configuration surface of a backend.
///
/// Keys are backend-specific; a backend advertises the keys it accepts through [`Configurable::has_option`].
/// Setting an option may also trigger an action (e.g. clearing a host list).
pub trait Configurable: Send + Sync {
    fn set_option(&self, key: &str, value: OptionValue) -> Result<(), OptionError>;

    fn get_option(&self, key: &str) -> Result<OptionValue, OptionError>;

    fn has_option(&self, key: &str) -> bool;
}
