use serde::{Deserialize, Serialize};

use crate::{DriverKind, HostPool};

/// User-facing description of a driver, as produced by a configuration layer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverConfig {
    /// Concurrency hint for the consumer; `0` means no limit.
    #[serde(default)]
    pub max_running: usize,
    /// Backend selection together with its construction options.
    pub backend: BackendConfig,
}

/// Backend selection.
///
/// Each variant carries the values that must be pushed through the option channel before the driver is usable.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BackendConfig {
    /// Run jobs as child processes on this host.
    Local,
    /// Run jobs on pool hosts through a remote shell.
    RemoteShell {
        /// Remote-shell program (e.g. `"ssh"`).
        command: String,
        /// Hosts and their per-host capacity.
        hosts: HostPool,
    },
    /// Submit jobs to an LSF queue.
    BatchCluster {
        queue: String,
        /// LSF resource request string passed to `bsub -R`.
        #[serde(default)]
        resource: String,
        /// LSF server; empty or `"local"` submits from this host.
        #[serde(default)]
        server: String,
        #[serde(default = "default_num_cpu")]
        num_cpu: i64,
    },
}

fn default_num_cpu() -> i64 {
    1
}

impl BackendConfig {
    pub fn kind(&self) -> DriverKind {
        match self {
            BackendConfig::Local => DriverKind::Local,
            BackendConfig::RemoteShell { .. } => DriverKind::RemoteShell,
            BackendConfig::BatchCluster { .. } => DriverKind::BatchCluster,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Local
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_running: 0,
            backend: BackendConfig::default(),
        }
    }
}
