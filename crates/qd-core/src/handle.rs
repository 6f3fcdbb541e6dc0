use std::any::Any;

use qd_model::JobId;
use uuid::Uuid;

pub(crate) type ErasedJob = Box<dyn Any + Send + Sync>;

/// Owned token for one submitted job.
///
/// Issued by [`Driver::submit`](crate::Driver::submit) and consumed by
/// [`Driver::free_job`](crate::Driver::free_job). The handle is not `Clone`, so each
/// job has exactly one owner and can be released only once.
pub struct JobHandle {
    pub(crate) id: JobId,
    pub(crate) driver_id: Uuid,
    pub(crate) job_name: String,
    pub(crate) job: ErasedJob,
}

impl JobHandle {
    /// Sequential id of the job within its driver.
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Instance id of the driver that issued the handle.
    pub fn driver_id(&self) -> Uuid {
        self.driver_id
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }
}

impl std::fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandle")
            .field("id", &self.id)
            .field("driver_id", &self.driver_id)
            .field("job_name", &self.job_name)
            .finish_non_exhaustive()
    }
}
