//! LSF batch-cluster backend.
//!
//! Jobs are submitted with `bsub`, polled with `bjobs` and cancelled with `bkill`.
//! When `LSF_SERVER` names a remote host, every command is run through
//! `<LSF_RSH_CMD> <server> '<command line>'`.
mod parse;
pub use parse::{LsfJobId, job_stat, map_stat, submitted_job_id};

use std::{sync::OnceLock, time::Duration};

use async_trait::async_trait;
use qd_core::{Backend, BackendError, Configurable, OptionRegistry};
use qd_model::{DriverKind, JobRequest, JobStatus, OptionKind, OptionValue};
use tokio::process::Command;
use tracing::{debug, trace, warn};

use crate::util::{run_capture, shell_quote};

pub const LSF_QUEUE: &str = "LSF_QUEUE";
/// Resource request passed to `bsub -R`.
pub const LSF_RESOURCE: &str = "LSF_RESOURCE";
/// Host to submit from; empty, `local` or `localhost` means this host.
pub const LSF_SERVER: &str = "LSF_SERVER";
/// CPUs per job, passed to `bsub -n`.
pub const LSF_NUM_CPU: &str = "LSF_NUM_CPU";
pub const LSF_RSH_CMD: &str = "LSF_RSH_CMD";
pub const LSF_BSUB_CMD: &str = "LSF_BSUB_CMD";
pub const LSF_BJOBS_CMD: &str = "LSF_BJOBS_CMD";
pub const LSF_BKILL_CMD: &str = "LSF_BKILL_CMD";
/// Upper bound for one `bjobs`/`bkill` call; a slower answer reads as `Unknown`.
pub const LSF_STATUS_TIMEOUT_MS: &str = "LSF_STATUS_TIMEOUT_MS";
/// Upper bound for one `bsub` call.
pub const LSF_SUBMIT_TIMEOUT_MS: &str = "LSF_SUBMIT_TIMEOUT_MS";

const DEFAULT_RSH_CMD: &str = "ssh";
const DEFAULT_BSUB_CMD: &str = "bsub";
const DEFAULT_BJOBS_CMD: &str = "bjobs";
const DEFAULT_BKILL_CMD: &str = "bkill";
const DEFAULT_STATUS_TIMEOUT_MS: i64 = 10_000;
const DEFAULT_SUBMIT_TIMEOUT_MS: i64 = 60_000;

/// Submits jobs to an LSF cluster.
pub struct LsfBackend {
    registry: OptionRegistry,
}

/// A submitted LSF job.
pub struct LsfJob {
    id: Option<LsfJobId>,
    name: String,
    terminal: OnceLock<JobStatus>,
}

impl LsfJob {
    /// LSF job id; `None` if `bsub` did not accept the job.
    pub fn lsf_id(&self) -> Option<LsfJobId> {
        self.id
    }

    fn rejected(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            terminal: OnceLock::from(JobStatus::Failed),
        }
    }
}

fn non_empty(v: &OptionValue) -> Result<(), String> {
    match v.as_str() {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err("must not be empty".into()),
    }
}

fn at_least_one(v: &OptionValue) -> Result<(), String> {
    match v.as_int() {
        Some(n) if n >= 1 => Ok(()),
        _ => Err("must be at least 1".into()),
    }
}

impl LsfBackend {
    pub fn new() -> Self {
        let registry = OptionRegistry::new()
            .declare(LSF_QUEUE, OptionKind::Str)
            .declare(LSF_RESOURCE, OptionKind::Str)
            .declare(LSF_SERVER, OptionKind::Str)
            .declare_checked(LSF_NUM_CPU, OptionKind::Int, at_least_one)
            .declare_checked(LSF_RSH_CMD, OptionKind::Str, non_empty)
            .declare_checked(LSF_BSUB_CMD, OptionKind::Str, non_empty)
            .declare_checked(LSF_BJOBS_CMD, OptionKind::Str, non_empty)
            .declare_checked(LSF_BKILL_CMD, OptionKind::Str, non_empty)
            .declare_checked(LSF_STATUS_TIMEOUT_MS, OptionKind::Int, at_least_one)
            .declare_checked(LSF_SUBMIT_TIMEOUT_MS, OptionKind::Int, at_least_one)
            .with_default(LSF_NUM_CPU, 1_i64)
            .with_default(LSF_RSH_CMD, DEFAULT_RSH_CMD)
            .with_default(LSF_BSUB_CMD, DEFAULT_BSUB_CMD)
            .with_default(LSF_BJOBS_CMD, DEFAULT_BJOBS_CMD)
            .with_default(LSF_BKILL_CMD, DEFAULT_BKILL_CMD)
            .with_default(LSF_STATUS_TIMEOUT_MS, DEFAULT_STATUS_TIMEOUT_MS)
            .with_default(LSF_SUBMIT_TIMEOUT_MS, DEFAULT_SUBMIT_TIMEOUT_MS);
        Self { registry }
    }

    fn setting(&self, key: &str, fallback: &str) -> String {
        self.registry
            .string(key)
            .unwrap_or_else(|| fallback.to_string())
    }

    fn timeout(&self, key: &str, fallback: i64) -> Duration {
        let ms = self.registry.int(key).unwrap_or(fallback).max(1);
        Duration::from_millis(ms as u64)
    }

    fn remote_server(&self) -> Option<String> {
        let server = self.registry.string(LSF_SERVER)?;
        let server = server.trim();
        if server.is_empty()
            || server.eq_ignore_ascii_case("local")
            || server.eq_ignore_ascii_case("localhost")
        {
            None
        } else {
            Some(server.to_string())
        }
    }

    /// Build an LSF command, routed through the remote shell when a server is configured.
    fn command(&self, program: String, args: Vec<String>) -> Command {
        match self.remote_server() {
            None => {
                let mut cmd = Command::new(program);
                cmd.args(args);
                cmd
            }
            Some(server) => {
                let line = std::iter::once(program)
                    .chain(args)
                    .map(|a| shell_quote(&a))
                    .collect::<Vec<_>>()
                    .join(" ");
                let mut cmd = Command::new(self.setting(LSF_RSH_CMD, DEFAULT_RSH_CMD));
                cmd.arg(server).arg(line);
                cmd
            }
        }
    }

    fn bsub_args(&self, request: &JobRequest) -> Vec<String> {
        let stdout = request
            .run_path
            .join(format!("{}.LSF-stdout", request.job_name));
        let stderr = request
            .run_path
            .join(format!("{}.LSF-stderr", request.job_name));
        let num_cpu = self.registry.int(LSF_NUM_CPU).unwrap_or(1);

        let mut args = vec![
            "-o".to_string(),
            stdout.to_string_lossy().into_owned(),
            "-e".to_string(),
            stderr.to_string_lossy().into_owned(),
        ];
        if let Some(queue) = self.registry.string(LSF_QUEUE).filter(|q| !q.is_empty()) {
            args.extend(["-q".to_string(), queue]);
        }
        args.extend([
            "-J".to_string(),
            request.job_name.clone(),
            "-n".to_string(),
            num_cpu.to_string(),
        ]);
        if let Some(resource) = self.registry.string(LSF_RESOURCE).filter(|r| !r.is_empty()) {
            args.extend(["-R".to_string(), resource]);
        }
        args.push(request.run_cmd.clone());
        args.extend(request.args.iter().cloned());
        args
    }

    async fn query_status(&self, id: LsfJobId) -> JobStatus {
        let cmd = self.command(
            self.setting(LSF_BJOBS_CMD, DEFAULT_BJOBS_CMD),
            vec!["-a".to_string(), id.to_string()],
        );
        let timeout = self.timeout(LSF_STATUS_TIMEOUT_MS, DEFAULT_STATUS_TIMEOUT_MS);

        match run_capture(cmd, timeout).await {
            Ok(out) => match job_stat(&out, id) {
                Some(stat) => {
                    trace!(target: "qd.exec.lsf", id, stat, "bjobs");
                    map_stat(stat)
                }
                None => {
                    debug!(target: "qd.exec.lsf", id, "job missing from bjobs output");
                    JobStatus::Unknown
                }
            },
            Err(e) => {
                warn!(target: "qd.exec.lsf", id, error = %e, "bjobs failed");
                JobStatus::Unknown
            }
        }
    }
}

impl Default for LsfBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for LsfBackend {
    type Job = LsfJob;

    fn kind(&self) -> DriverKind {
        DriverKind::BatchCluster
    }

    async fn submit(&self, request: &JobRequest) -> Result<LsfJob, BackendError> {
        let cmd = self.command(
            self.setting(LSF_BSUB_CMD, DEFAULT_BSUB_CMD),
            self.bsub_args(request),
        );
        let timeout = self.timeout(LSF_SUBMIT_TIMEOUT_MS, DEFAULT_SUBMIT_TIMEOUT_MS);

        let out = match run_capture(cmd, timeout).await {
            Ok(out) => out,
            Err(e) => {
                warn!(target: "qd.exec.lsf", job = %request.job_name, error = %e, "bsub failed");
                return Ok(LsfJob::rejected(&request.job_name));
            }
        };
        match submitted_job_id(&out) {
            Some(id) => {
                debug!(target: "qd.exec.lsf", job = %request.job_name, id, "submitted");
                Ok(LsfJob {
                    id: Some(id),
                    name: request.job_name.clone(),
                    terminal: OnceLock::new(),
                })
            }
            None => {
                warn!(target: "qd.exec.lsf", job = %request.job_name, output = %out.trim(), "could not parse bsub output");
                Ok(LsfJob::rejected(&request.job_name))
            }
        }
    }

    async fn status(&self, job: &LsfJob) -> JobStatus {
        if let Some(status) = job.terminal.get() {
            return *status;
        }
        let Some(id) = job.id else {
            return JobStatus::Failed;
        };

        let status = self.query_status(id).await;
        if status.is_terminal() {
            // A concurrent poll may have set it first; both read the same bjobs state.
            let _ = job.terminal.set(status);
        }
        status
    }

    async fn kill(&self, job: &LsfJob) {
        let (Some(id), None) = (job.id, job.terminal.get()) else {
            trace!(target: "qd.exec.lsf", job = %job.name, "kill on finished job ignored");
            return;
        };
        let cmd = self.command(
            self.setting(LSF_BKILL_CMD, DEFAULT_BKILL_CMD),
            vec![id.to_string()],
        );
        let timeout = self.timeout(LSF_STATUS_TIMEOUT_MS, DEFAULT_STATUS_TIMEOUT_MS);

        match run_capture(cmd, timeout).await {
            Ok(_) => debug!(target: "qd.exec.lsf", job = %job.name, id, "bkill sent"),
            // Typically "Job has already finished"; a race with completion is harmless.
            Err(e) => warn!(target: "qd.exec.lsf", job = %job.name, id, error = %e, "bkill failed"),
        }
    }

    async fn free_job(&self, job: LsfJob) {
        trace!(target: "qd.exec.lsf", job = %job.name, id = ?job.id, "job freed");
    }

    fn options(&self) -> Option<&dyn Configurable> {
        Some(&self.registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn defaults_are_readable() {
        let backend = LsfBackend::new();
        let opts = backend.options().unwrap();

        assert_eq!(opts.get_option(LSF_NUM_CPU).unwrap().as_int(), Some(1));
        assert_eq!(
            opts.get_option(LSF_BSUB_CMD).unwrap().as_str(),
            Some("bsub")
        );
        assert!(opts.get_option(LSF_QUEUE).is_err());
    }

    #[test]
    fn bsub_arguments_follow_options() {
        let backend = LsfBackend::new();
        let opts = backend.options().unwrap();
        opts.set_option(LSF_QUEUE, "normal".into()).unwrap();
        opts.set_option(LSF_RESOURCE, "select[type==X]".into())
            .unwrap();
        opts.set_option(LSF_NUM_CPU, 4_i64.into()).unwrap();

        let req = JobRequest::new("/opt/sim/run", "/scratch/run-3", "sim-3").with_args(["/scratch/run-3"]);
        assert_eq!(
            backend.bsub_args(&req),
            [
                "-o",
                "/scratch/run-3/sim-3.LSF-stdout",
                "-e",
                "/scratch/run-3/sim-3.LSF-stderr",
                "-q",
                "normal",
                "-J",
                "sim-3",
                "-n",
                "4",
                "-R",
                "select[type==X]",
                "/opt/sim/run",
                "/scratch/run-3",
            ]
        );
    }

    #[test]
    fn empty_queue_and_resource_are_omitted() {
        let backend = LsfBackend::new();
        let req = JobRequest::new("run", "/tmp", "j");
        let args = backend.bsub_args(&req);
        assert!(!args.contains(&"-q".to_string()));
        assert!(!args.contains(&"-R".to_string()));
    }

    #[test]
    fn local_server_runs_commands_directly() {
        let backend = LsfBackend::new();
        for server in ["", "local", "LOCALHOST"] {
            backend
                .registry
                .set(LSF_SERVER, server.into())
                .unwrap();
            let cmd = backend.command("bjobs".into(), vec!["-a".into(), "12".into()]);
            assert_eq!(cmd.as_std().get_program(), "bjobs");
            assert_eq!(args_of(&cmd), ["-a", "12"]);
        }
    }

    #[test]
    fn remote_server_goes_through_remote_shell() {
        let backend = LsfBackend::new();
        backend.registry.set(LSF_SERVER, "host1".into()).unwrap();

        let cmd = backend.command(
            "bsub".into(),
            vec!["-R".into(), "select[type==X]".into()],
        );
        assert_eq!(cmd.as_std().get_program(), "ssh");
        assert_eq!(args_of(&cmd), ["host1", "bsub -R 'select[type==X]'"]);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let backend = LsfBackend::new();
        let opts = backend.options().unwrap();
        assert!(opts.set_option(LSF_NUM_CPU, 0_i64.into()).is_err());
        assert!(opts.set_option(LSF_BSUB_CMD, "".into()).is_err());
        assert!(opts.set_option(LSF_QUEUE, 3_i64.into()).is_err());
        assert!(!opts.has_option("RSH_CMD"));
    }
}
