//! Remote-shell backend.
//!
//! Each job runs as `<RSH_CMD> <host> <run_cmd> <args…>`, started as a local child
//! process, on a host picked from the configured pool. A host accepts at most its
//! configured number of concurrent jobs. When every host is full the job is accepted
//! as `Pending` and is started by a later status poll once a slot frees up.
mod pool;

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use qd_core::{Backend, BackendError, Configurable, OptionError, OptionRegistry};
use qd_model::{DriverKind, Host, JobRequest, JobStatus, OptionKind, OptionValue};
use tokio::process::{Child, Command};
use tracing::{debug, trace, warn};

use crate::{
    proc::{child_status, spawn},
    rsh::pool::Slots,
    util::kill_graceful,
};

/// Remote-shell program, e.g. `ssh`.
pub const RSH_CMD: &str = "RSH_CMD";
/// Replace the host pool.
pub const RSH_HOSTLIST: &str = "RSH_HOSTLIST";
/// Add one `host[:capacity]` entry to the pool.
pub const RSH_HOST: &str = "RSH_HOST";
/// Action: empty the host pool. The value is ignored.
pub const RSH_CLEAR_HOSTLIST: &str = "RSH_CLEAR_HOSTLIST";

pub struct RemoteShellBackend {
    registry: OptionRegistry,
    slots: Mutex<Slots>,
}

enum RshState {
    Queued,
    Running { child: Child, host: String },
    Finished(JobStatus),
}

/// A remote-shell job; queued until a host slot is available.
pub struct RshJob {
    request: JobRequest,
    state: tokio::sync::Mutex<RshState>,
}

impl RemoteShellBackend {
    pub fn new() -> Self {
        let registry = OptionRegistry::new().declare_checked(RSH_CMD, OptionKind::Str, |v| {
            match v.as_str() {
                Some(cmd) if !cmd.trim().is_empty() => Ok(()),
                _ => Err("remote shell command is empty".into()),
            }
        });
        Self {
            registry,
            slots: Mutex::new(Slots::default()),
        }
    }

    /// Slots currently occupied across all hosts.
    pub fn running(&self) -> usize {
        self.slots().running()
    }

    /// Slots currently occupied on `host`.
    pub fn running_on(&self, host: &str) -> usize {
        self.slots().running_on(host)
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, host: &str) {
        self.slots().release(host);
        trace!(target: "qd.exec.rsh", host, "slot released");
    }

    fn remote_command(&self, rsh_cmd: &str, host: &str, request: &JobRequest) -> Command {
        let mut cmd = Command::new(rsh_cmd);
        cmd.arg(host).arg(&request.run_cmd).args(&request.args);
        cmd
    }

    /// Start a queued job if a slot is free. Returns the resulting state's status.
    ///
    /// A pool left without capacity can never start the job, so it fails instead of waiting.
    fn try_dispatch(&self, job: &RshJob, state: &mut RshState) -> JobStatus {
        let acquired = {
            let mut slots = self.slots();
            slots.acquire().ok_or_else(|| slots.capacity())
        };
        let host = match acquired {
            Ok(host) => host,
            Err(0) => {
                warn!(target: "qd.exec.rsh", job = %job.request.job_name, "host pool has no capacity; queued job failed");
                *state = RshState::Finished(JobStatus::Failed);
                return JobStatus::Failed;
            }
            Err(_) => return JobStatus::Pending,
        };
        let Some(rsh_cmd) = self.registry.string(RSH_CMD) else {
            // Cleared after submit; nothing can be started.
            self.release(&host);
            *state = RshState::Finished(JobStatus::Failed);
            return JobStatus::Failed;
        };

        debug!(target: "qd.exec.rsh", job = %job.request.job_name, %host, "dispatch");
        match spawn(self.remote_command(&rsh_cmd, &host, &job.request), &job.request) {
            Some(child) => {
                *state = RshState::Running { child, host };
                JobStatus::Running
            }
            None => {
                self.release(&host);
                *state = RshState::Finished(JobStatus::Failed);
                JobStatus::Failed
            }
        }
    }

    async fn stop(&self, state: &mut RshState) {
        match state {
            RshState::Queued => *state = RshState::Finished(JobStatus::Failed),
            RshState::Running { child, host } => {
                let status = child_status(child);
                if !status.is_terminal() {
                    if let Err(e) = kill_graceful(child).await {
                        warn!(target: "qd.exec.rsh", %host, error = %e, "kill failed");
                    }
                }
                let host = std::mem::take(host);
                self.release(&host);
                *state = RshState::Finished(if status.is_terminal() {
                    status
                } else {
                    JobStatus::Failed
                });
            }
            RshState::Finished(_) => {}
        }
    }
}

impl Default for RemoteShellBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for RemoteShellBackend {
    type Job = RshJob;

    fn kind(&self) -> DriverKind {
        DriverKind::RemoteShell
    }

    async fn submit(&self, request: &JobRequest) -> Result<RshJob, BackendError> {
        if self.registry.string(RSH_CMD).is_none() {
            return Err(BackendError::NotConfigured(format!("{RSH_CMD} is not set")));
        }
        if self.slots().capacity() == 0 {
            return Err(BackendError::NotConfigured("host pool has no capacity".into()));
        }

        let job = RshJob {
            request: request.clone(),
            state: tokio::sync::Mutex::new(RshState::Queued),
        };
        {
            let mut state = job.state.lock().await;
            if self.try_dispatch(&job, &mut state) == JobStatus::Pending {
                debug!(target: "qd.exec.rsh", job = %request.job_name, "all hosts busy; queued");
            }
        }
        Ok(job)
    }

    async fn status(&self, job: &RshJob) -> JobStatus {
        let mut state = job.state.lock().await;
        match &mut *state {
            RshState::Queued => self.try_dispatch(job, &mut *state),
            RshState::Running { child, host } => {
                let status = child_status(child);
                if status.is_terminal() {
                    let host = std::mem::take(host);
                    self.release(&host);
                    *state = RshState::Finished(status);
                }
                status
            }
            RshState::Finished(status) => *status,
        }
    }

    async fn kill(&self, job: &RshJob) {
        let mut state = job.state.lock().await;
        self.stop(&mut state).await;
    }

    async fn free_job(&self, job: RshJob) {
        let mut state = job.state.into_inner();
        self.stop(&mut state).await;
    }

    async fn shutdown(&self) {
        let running = self.running();
        if running > 0 {
            warn!(target: "qd.exec.rsh", running, "shutdown with occupied host slots");
        }
        self.slots().clear();
    }

    fn options(&self) -> Option<&dyn Configurable> {
        Some(self)
    }
}

impl Configurable for RemoteShellBackend {
    fn set_option(&self, key: &str, value: OptionValue) -> Result<(), OptionError> {
        match key {
            RSH_HOSTLIST => {
                let pool = value.as_host_pool().ok_or(OptionError::TypeMismatch {
                    key: key.to_string(),
                    expected: OptionKind::HostPool,
                    found: value.kind(),
                })?;
                if pool.total_capacity() == 0 {
                    return Err(OptionError::InvalidValue {
                        key: key.to_string(),
                        reason: format!("host pool has no capacity; use {RSH_CLEAR_HOSTLIST} to clear it"),
                    });
                }
                self.slots().replace(pool);
                debug!(target: "qd.exec.rsh", hosts = pool.len(), capacity = pool.total_capacity(), "host pool set");
                Ok(())
            }
            RSH_HOST => {
                let entry = value.as_str().ok_or(OptionError::TypeMismatch {
                    key: key.to_string(),
                    expected: OptionKind::Str,
                    found: value.kind(),
                })?;
                let host: Host = entry.parse().map_err(|e: qd_model::HostParseError| {
                    OptionError::InvalidValue {
                        key: key.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                if host.max_running == 0 {
                    return Err(OptionError::InvalidValue {
                        key: key.to_string(),
                        reason: format!("host {} has no capacity", host.name),
                    });
                }
                debug!(target: "qd.exec.rsh", host = %host.name, capacity = host.max_running, "host added");
                self.slots().add(host);
                Ok(())
            }
            RSH_CLEAR_HOSTLIST => {
                self.slots().clear();
                debug!(target: "qd.exec.rsh", "host pool cleared");
                Ok(())
            }
            _ => self.registry.set(key, value),
        }
    }

    fn get_option(&self, key: &str) -> Result<OptionValue, OptionError> {
        match key {
            RSH_HOSTLIST => Ok(OptionValue::HostPool(self.slots().pool())),
            RSH_HOST | RSH_CLEAR_HOSTLIST => Err(OptionError::InvalidValue {
                key: key.to_string(),
                reason: "write-only option".into(),
            }),
            _ => self.registry.get(key),
        }
    }

    fn has_option(&self, key: &str) -> bool {
        matches!(key, RSH_HOSTLIST | RSH_HOST | RSH_CLEAR_HOSTLIST) || self.registry.has(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qd_model::HostPool;

    #[test]
    fn host_options_update_the_pool() {
        let backend = RemoteShellBackend::new();

        backend
            .set_option(RSH_HOSTLIST, HostPool::new().with_host("a", 1).into())
            .unwrap();
        backend.set_option(RSH_HOST, "b:2".into()).unwrap();
        backend.set_option(RSH_HOST, "a".into()).unwrap();

        let pool = backend.get_option(RSH_HOSTLIST).unwrap();
        let pool = pool.as_host_pool().unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.total_capacity(), 4);

        backend.set_option(RSH_CLEAR_HOSTLIST, 0_i64.into()).unwrap();
        let cleared = backend.get_option(RSH_HOSTLIST).unwrap();
        assert!(cleared.as_host_pool().unwrap().is_empty());
    }

    #[test]
    fn invalid_host_options_are_rejected() {
        let backend = RemoteShellBackend::new();

        assert!(matches!(
            backend.set_option(RSH_HOSTLIST, HostPool::new().into()),
            Err(OptionError::InvalidValue { .. })
        ));
        assert!(matches!(
            backend.set_option(RSH_HOSTLIST, HostPool::new().with_host("idle", 0).into()),
            Err(OptionError::InvalidValue { .. })
        ));
        assert!(matches!(
            backend.set_option(RSH_HOST, "idle:0".into()),
            Err(OptionError::InvalidValue { .. })
        ));
        assert!(matches!(
            backend.set_option(RSH_HOST, "node:lots".into()),
            Err(OptionError::InvalidValue { .. })
        ));
        assert!(matches!(
            backend.set_option(RSH_HOSTLIST, "node1".into()),
            Err(OptionError::TypeMismatch { .. })
        ));
        assert!(matches!(
            backend.set_option(RSH_CMD, "  ".into()),
            Err(OptionError::InvalidValue { .. })
        ));
    }

    #[test]
    fn advertises_its_keys_only() {
        let backend = RemoteShellBackend::new();
        for key in [RSH_CMD, RSH_HOSTLIST, RSH_HOST, RSH_CLEAR_HOSTLIST] {
            assert!(backend.has_option(key), "{key}");
        }
        assert!(!backend.has_option("LSF_QUEUE"));
        assert!(matches!(
            backend.get_option("LSF_QUEUE"),
            Err(OptionError::UnknownKey(_))
        ));
    }

    #[tokio::test]
    async fn submit_requires_command_and_hosts() {
        let backend = RemoteShellBackend::new();
        let req = JobRequest::new("true", "/tmp", "rsh");

        assert!(matches!(
            backend.submit(&req).await,
            Err(BackendError::NotConfigured(_))
        ));

        backend.set_option(RSH_CMD, "ssh".into()).unwrap();
        assert!(matches!(
            backend.submit(&req).await,
            Err(BackendError::NotConfigured(_))
        ));
    }

    #[test]
    fn remote_command_line() {
        let backend = RemoteShellBackend::new();
        let req = JobRequest::new("/opt/sim/run", "/scratch/run-0", "sim-0").with_args(["/scratch/run-0"]);

        let cmd = backend.remote_command("ssh", "node7", &req);
        let inner = cmd.as_std();
        assert_eq!(inner.get_program(), "ssh");
        let args: Vec<_> = inner.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, ["node7", "/opt/sim/run", "/scratch/run-0"]);
    }
}
