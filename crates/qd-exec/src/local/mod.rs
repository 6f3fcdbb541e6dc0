use async_trait::async_trait;
use qd_core::{Backend, BackendError};
use qd_model::{DriverKind, JobRequest, JobStatus};
use tracing::{debug, trace};

use crate::{proc::ProcJob, util::cmd_program};

/// Runs each job as a child process on the current host.
///
/// The job runs `run_cmd args…` with `run_path` as working directory.
/// There are no runtime options.
#[derive(Debug, Default)]
pub struct LocalBackend;

impl LocalBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Backend for LocalBackend {
    type Job = ProcJob;

    fn kind(&self) -> DriverKind {
        DriverKind::Local
    }

    async fn submit(&self, request: &JobRequest) -> Result<ProcJob, BackendError> {
        let mut cmd = cmd_program(&request.run_cmd, &request.args);
        cmd.current_dir(&request.run_path);

        debug!(target: "qd.exec.local", job = %request.job_name, program = %request.run_cmd, "submit");
        Ok(ProcJob::start(cmd, request))
    }

    async fn status(&self, job: &ProcJob) -> JobStatus {
        job.status().await
    }

    async fn kill(&self, job: &ProcJob) {
        job.kill().await;
    }

    async fn free_job(&self, job: ProcJob) {
        if job.status().await.is_active() {
            debug!(target: "qd.exec.local", "freeing a running job; killing child");
            job.kill().await;
        }
        trace!(target: "qd.exec.local", "job freed");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn request(cmd: &str, args: &[&str]) -> JobRequest {
        JobRequest::new(cmd, std::env::temp_dir(), "local-test").with_args(args.iter().copied())
    }

    async fn wait_terminal(backend: &LocalBackend, job: &ProcJob) -> JobStatus {
        for _ in 0..200 {
            let status = backend.status(job).await;
            if status.is_terminal() {
                return status;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("local job did not finish");
    }

    #[tokio::test]
    async fn exit_codes_map_to_status() {
        let backend = LocalBackend::new();

        let ok = backend.submit(&request("true", &[])).await.unwrap();
        let bad = backend.submit(&request("false", &[])).await.unwrap();

        assert_eq!(wait_terminal(&backend, &ok).await, JobStatus::Success);
        assert_eq!(wait_terminal(&backend, &bad).await, JobStatus::Failed);
    }

    #[tokio::test]
    async fn missing_program_reports_failed() {
        let backend = LocalBackend::new();
        let job = backend
            .submit(&request("/no/such/simulator", &[]))
            .await
            .unwrap();
        assert_eq!(backend.status(&job).await, JobStatus::Failed);
    }

    #[tokio::test]
    async fn missing_run_path_reports_failed() {
        let backend = LocalBackend::new();
        let req = JobRequest::new("true", "/no/such/run/path", "bad-cwd");
        let job = backend.submit(&req).await.unwrap();
        assert_eq!(backend.status(&job).await, JobStatus::Failed);
    }

    #[tokio::test]
    async fn kill_stops_a_running_job() {
        let backend = LocalBackend::new();
        let job = backend.submit(&request("sleep", &["30"])).await.unwrap();

        assert_eq!(backend.status(&job).await, JobStatus::Running);
        backend.kill(&job).await;
        assert_eq!(backend.status(&job).await, JobStatus::Failed);

        // Second kill is a no-op.
        backend.kill(&job).await;
        assert_eq!(backend.status(&job).await, JobStatus::Failed);
    }
}
