mod erased;

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use qd_model::{DriverKind, JobRequest, JobStatus, OptionValue};
use tracing::{debug, instrument, trace, warn};
use uuid::Uuid;

use crate::{
    backend::{Backend, Configurable},
    driver::erased::DynBackend,
    error::DriverError,
    handle::JobHandle,
};

/// A job-execution driver bound to exactly one backend.
///
/// The driver owns the backend and the fields common to every backend: name, kind
/// and the `max_running` hint. It never implements backend logic itself; every job
/// operation is forwarded to the backend after the handle has been checked to belong
/// to this driver.
///
/// All methods take `&self`, so a driver can be shared between worker threads via `Arc`.
/// Name, kind and the bound backend never change after construction.
pub struct Driver {
    id: Uuid,
    name: String,
    kind: DriverKind,
    max_running: AtomicUsize,
    next_job: AtomicU64,
    live_jobs: AtomicUsize,
    backend: Box<dyn DynBackend>,
}

impl Driver {
    /// Bind a driver to `backend`.
    pub fn new<B: Backend>(backend: B) -> Self {
        let driver = Self {
            id: Uuid::new_v4(),
            name: Backend::name(&backend).to_string(),
            kind: Backend::kind(&backend),
            max_running: AtomicUsize::new(0),
            next_job: AtomicU64::new(1),
            live_jobs: AtomicUsize::new(0),
            backend: Box::new(backend),
        };
        debug!(target: "qd.core.driver", driver = %driver.name, id = %driver.id, "driver created");
        driver
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> DriverKind {
        self.kind
    }

    /// Instance id; handles carry it so they cannot be used with another driver.
    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Concurrency hint for the consumer. The driver does not enforce it.
    #[inline]
    pub fn max_running(&self) -> usize {
        self.max_running.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_max_running(&self, max_running: usize) {
        self.max_running.store(max_running, Ordering::Relaxed);
    }

    /// Number of handles issued and not yet freed.
    #[inline]
    pub fn live_jobs(&self) -> usize {
        self.live_jobs.load(Ordering::Acquire)
    }

    /// Borrow the concrete backend, if it is a `B`.
    pub fn backend<B: Backend>(&self) -> Option<&B> {
        self.backend.as_any().downcast_ref::<B>()
    }

    /// Set a backend option. Some keys trigger an action rather than store a value.
    pub fn set_option(&self, key: &str, value: impl Into<OptionValue>) -> Result<(), DriverError> {
        let options = self.configurable("set_option")?;
        options.set_option(key, value.into()).map_err(|source| {
            warn!(target: "qd.core.driver", driver = %self.name, key, error = %source, "set_option rejected");
            DriverError::Option {
                driver: self.name.clone(),
                source,
            }
        })
    }

    pub fn set_int_option(&self, key: &str, value: i64) -> Result<(), DriverError> {
        self.set_option(key, OptionValue::Int(value))
    }

    pub fn set_string_option(&self, key: &str, value: &str) -> Result<(), DriverError> {
        self.set_option(key, OptionValue::Str(value.to_string()))
    }

    pub fn get_option(&self, key: &str) -> Result<OptionValue, DriverError> {
        let options = self.configurable("get_option")?;
        options.get_option(key).map_err(|source| DriverError::Option {
            driver: self.name.clone(),
            source,
        })
    }

    /// `false` for any key the backend does not accept, and for backends without options.
    pub fn has_option(&self, key: &str) -> bool {
        self.backend
            .options()
            .is_some_and(|options| options.has_option(key))
    }

    fn configurable(&self, operation: &'static str) -> Result<&dyn Configurable, DriverError> {
        self.backend.options().ok_or_else(|| {
            warn!(target: "qd.core.driver", driver = %self.name, operation, "runtime options not supported");
            DriverError::UnsupportedOperation {
                driver: self.name.clone(),
                operation,
            }
        })
    }

    #[instrument(level = "debug", skip(self, request), fields(driver = %self.name, job = %request.job_name))]
    pub async fn submit(&self, request: &JobRequest) -> Result<JobHandle, DriverError> {
        let job = self.backend.submit(request).await.map_err(|source| {
            warn!(target: "qd.core.driver", error = %source, "submit rejected");
            DriverError::Backend {
                driver: self.name.clone(),
                source,
            }
        })?;

        let id = self.next_job.fetch_add(1, Ordering::Relaxed);
        self.live_jobs.fetch_add(1, Ordering::AcqRel);
        trace!(target: "qd.core.driver", id, "job submitted");

        Ok(JobHandle {
            id,
            driver_id: self.id,
            job_name: request.job_name.clone(),
            job,
        })
    }

    pub async fn get_status(&self, handle: &JobHandle) -> Result<JobStatus, DriverError> {
        self.check_owner(handle)?;
        let status = self
            .backend
            .status(&handle.job)
            .await
            .ok_or_else(|| self.foreign(handle))?;
        trace!(target: "qd.core.driver", driver = %self.name, id = handle.id, %status, "status");
        Ok(status)
    }

    /// Request cancellation. Killing a job that already finished is a no-op.
    pub async fn kill(&self, handle: &JobHandle) -> Result<(), DriverError> {
        self.check_owner(handle)?;
        debug!(target: "qd.core.driver", driver = %self.name, id = handle.id, "kill requested");
        if self.backend.kill(&handle.job).await {
            Ok(())
        } else {
            Err(self.foreign(handle))
        }
    }

    /// Release the job. Consumes the handle, so it cannot be used or released again.
    pub async fn free_job(&self, handle: JobHandle) -> Result<(), DriverError> {
        self.check_owner(&handle)?;
        let JobHandle { id, job, .. } = handle;

        if self.backend.free_job(job).await.is_err() {
            return Err(DriverError::ForeignHandle {
                driver: self.name.clone(),
            });
        }
        self.live_jobs.fetch_sub(1, Ordering::AcqRel);
        trace!(target: "qd.core.driver", driver = %self.name, id, "job freed");
        Ok(())
    }

    /// Tear down the backend.
    ///
    /// The backend is released even when handles are still outstanding; in that case
    /// [`DriverError::OutstandingJobs`] reports the contract violation.
    pub async fn free_driver(self) -> Result<(), DriverError> {
        let outstanding = self.live_jobs();
        self.backend.shutdown().await;
        debug!(target: "qd.core.driver", driver = %self.name, id = %self.id, "driver released");

        if outstanding > 0 {
            warn!(target: "qd.core.driver", driver = %self.name, outstanding, "driver released with live job handles");
            return Err(DriverError::OutstandingJobs {
                driver: self.name,
                count: outstanding,
            });
        }
        Ok(())
    }

    fn check_owner(&self, handle: &JobHandle) -> Result<(), DriverError> {
        if handle.driver_id == self.id {
            Ok(())
        } else {
            Err(self.foreign(handle))
        }
    }

    fn foreign(&self, handle: &JobHandle) -> DriverError {
        warn!(
            target: "qd.core.driver",
            driver = %self.name,
            issued_by = %handle.driver_id,
            "job handle used with a driver that did not issue it"
        );
        DriverError::ForeignHandle {
            driver: self.name.clone(),
        }
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("max_running", &self.max_running())
            .field("live_jobs", &self.live_jobs())
            .finish_non_exhaustive()
    }
}
