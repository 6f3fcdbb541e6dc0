use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Everything a backend needs to start one external job.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    /// Program to execute (e.g. `"/usr/bin/python"`).
    pub run_cmd: String,
    /// Working directory of the job.
    pub run_path: PathBuf,
    /// Human-readable job name, forwarded to batch systems.
    pub job_name: String,
    /// Command-line arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl JobRequest {
    pub fn new(
        run_cmd: impl Into<String>,
        run_path: impl Into<PathBuf>,
        job_name: impl Into<String>,
    ) -> Self {
        Self {
            run_cmd: run_cmd.into(),
            run_path: run_path.into(),
            job_name: job_name.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}
