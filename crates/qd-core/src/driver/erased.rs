use std::any::Any;

use async_trait::async_trait;
use qd_model::{DriverKind, JobRequest, JobStatus};

use crate::{
    backend::{Backend, Configurable},
    error::BackendError,
    handle::ErasedJob,
};

/// Object-safe view of a [`Backend`], with the job type boxed as `dyn Any`.
///
/// Methods taking a job return `None`/`Err` when the boxed job is not the backend's own type.
#[async_trait]
pub(crate) trait DynBackend: Send + Sync {
    fn kind(&self) -> DriverKind;
    fn name(&self) -> &'static str;
    fn options(&self) -> Option<&dyn Configurable>;
    fn as_any(&self) -> &dyn Any;

    async fn submit(&self, request: &JobRequest) -> Result<ErasedJob, BackendError>;
    async fn status(&self, job: &ErasedJob) -> Option<JobStatus>;
    async fn kill(&self, job: &ErasedJob) -> bool;
    async fn free_job(&self, job: ErasedJob) -> Result<(), ErasedJob>;
    async fn shutdown(&self);
}

#[async_trait]
impl<B: Backend> DynBackend for B {
    fn kind(&self) -> DriverKind {
        Backend::kind(self)
    }

    fn name(&self) -> &'static str {
        Backend::name(self)
    }

    fn options(&self) -> Option<&dyn Configurable> {
        Backend::options(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn submit(&self, request: &JobRequest) -> Result<ErasedJob, BackendError> {
        let job = Backend::submit(self, request).await?;
        Ok(Box::new(job))
    }

    async fn status(&self, job: &ErasedJob) -> Option<JobStatus> {
        let job = job.downcast_ref::<B::Job>()?;
        Some(Backend::status(self, job).await)
    }

    async fn kill(&self, job: &ErasedJob) -> bool {
        match job.downcast_ref::<B::Job>() {
            Some(job) => {
                Backend::kill(self, job).await;
                true
            }
            None => false,
        }
    }

    async fn free_job(&self, job: ErasedJob) -> Result<(), ErasedJob> {
        let job = job.downcast::<B::Job>()?;
        Backend::free_job(self, *job).await;
        Ok(())
    }

    async fn shutdown(&self) {
        Backend::shutdown(self).await
    }
}
