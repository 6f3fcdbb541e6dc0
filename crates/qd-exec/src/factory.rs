//! Driver constructors, one per backend kind.
use qd_core::{Driver, DriverError};
use qd_model::{BackendConfig, DriverConfig, HostPool};
use tracing::info;

use crate::{
    local::LocalBackend,
    lsf::{LSF_NUM_CPU, LSF_QUEUE, LSF_RESOURCE, LSF_SERVER, LsfBackend},
    rsh::{RSH_CMD, RSH_HOSTLIST, RemoteShellBackend},
};

/// Driver that runs jobs as child processes of this process.
pub fn new_local() -> Driver {
    let driver = Driver::new(LocalBackend::new());
    info!(target: "qd.exec.factory", driver = %driver.name(), id = %driver.id(), "driver created");
    driver
}

/// Driver that runs jobs on `hosts` through the remote shell `command`.
pub fn new_remote_shell(command: &str, hosts: HostPool) -> Result<Driver, DriverError> {
    let driver = Driver::new(RemoteShellBackend::new());
    driver.set_option(RSH_HOSTLIST, hosts)?;
    driver.set_string_option(RSH_CMD, command)?;

    info!(target: "qd.exec.factory", driver = %driver.name(), id = %driver.id(), command, "driver created");
    Ok(driver)
}

/// Driver that submits jobs to the LSF queue `queue`.
///
/// `server` empty, `local` or `localhost` submits from this host.
pub fn new_batch_cluster(
    queue: &str,
    resource: &str,
    server: &str,
    num_cpu: i64,
) -> Result<Driver, DriverError> {
    let driver = Driver::new(LsfBackend::new());
    driver.set_string_option(LSF_QUEUE, queue)?;
    driver.set_string_option(LSF_RESOURCE, resource)?;
    driver.set_string_option(LSF_SERVER, server)?;
    driver.set_int_option(LSF_NUM_CPU, num_cpu)?;

    info!(target: "qd.exec.factory", driver = %driver.name(), id = %driver.id(), queue, server, "driver created");
    Ok(driver)
}

/// Build a driver from a deserialized [`DriverConfig`].
pub fn from_config(cfg: &DriverConfig) -> Result<Driver, DriverError> {
    let driver = match &cfg.backend {
        BackendConfig::Local => new_local(),
        BackendConfig::RemoteShell { command, hosts } => new_remote_shell(command, hosts.clone())?,
        BackendConfig::BatchCluster {
            queue,
            resource,
            server,
            num_cpu,
        } => new_batch_cluster(queue, resource, server, *num_cpu)?,
    };
    driver.set_max_running(cfg.max_running);
    Ok(driver)
}
