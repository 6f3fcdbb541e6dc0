use std::process::Stdio;

use qd_model::{JobRequest, JobStatus};
use tokio::{
    process::{Child, Command},
    sync::Mutex,
};
use tracing::{debug, trace, warn};

use crate::util::kill_graceful;

/// Non-blocking status probe of a child process.
pub(crate) fn child_status(child: &mut Child) -> JobStatus {
    match child.try_wait() {
        Ok(None) => JobStatus::Running,
        Ok(Some(status)) if status.success() => JobStatus::Success,
        Ok(Some(status)) => {
            debug!(target: "qd.exec.proc", code = ?status.code(), "exit non-zero");
            JobStatus::Failed
        }
        Err(e) => {
            warn!(target: "qd.exec.proc", error = %e, "wait failed");
            JobStatus::Unknown
        }
    }
}

/// Prepare `cmd` for a detached job: no stdin, killed if the job state is dropped.
pub(crate) fn prepare(cmd: &mut Command) {
    cmd.stdin(Stdio::null()).kill_on_drop(true);
}

/// Spawn `cmd`, logging instead of failing: `None` means the job could not be started.
pub(crate) fn spawn(mut cmd: Command, request: &JobRequest) -> Option<Child> {
    prepare(&mut cmd);
    trace!(target: "qd.exec.proc", job = %request.job_name, command = ?cmd.as_std(), "spawn");
    match cmd.spawn() {
        Ok(child) => Some(child),
        Err(e) => {
            warn!(target: "qd.exec.proc", job = %request.job_name, error = %e, "spawn failed");
            None
        }
    }
}

enum ProcState {
    Running(Child),
    Finished(JobStatus),
}

/// A job backed by one local child process.
pub struct ProcJob {
    state: Mutex<ProcState>,
}

impl ProcJob {
    pub(crate) fn start(cmd: Command, request: &JobRequest) -> Self {
        let state = match spawn(cmd, request) {
            Some(child) => ProcState::Running(child),
            None => ProcState::Finished(JobStatus::Failed),
        };
        Self {
            state: Mutex::new(state),
        }
    }

    pub(crate) async fn status(&self) -> JobStatus {
        let mut state = self.state.lock().await;
        match &mut *state {
            ProcState::Running(child) => {
                let status = child_status(child);
                if status.is_terminal() {
                    *state = ProcState::Finished(status);
                }
                status
            }
            ProcState::Finished(status) => *status,
        }
    }

    pub(crate) async fn kill(&self) {
        let mut state = self.state.lock().await;
        if let ProcState::Running(child) = &mut *state {
            // Finished on its own before the kill landed.
            let status = child_status(child);
            if status.is_terminal() {
                *state = ProcState::Finished(status);
                return;
            }
            if let Err(e) = kill_graceful(child).await {
                warn!(target: "qd.exec.proc", error = %e, "kill failed");
            }
            *state = ProcState::Finished(JobStatus::Failed);
        }
    }
}
