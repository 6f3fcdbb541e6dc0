//! Submit one command through a driver and follow it to completion.
//!
//! ```text
//! run-local [--config driver.json] <cmd> [args...]
//! ```
//! Without `--config` the job runs on the local backend in the current directory.
use std::{path::PathBuf, time::Duration};

use anyhow::{Context, bail};
use clap::Parser;
use tracing::{info, warn};

use qd_core::prelude::*;
use qd_model::DriverConfig;
use qd_observe::{LoggerConfig, logger_init};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "run-local")]
#[command(about = "Run one command through a job driver", long_about = None)]
struct Args {
    /// Driver configuration (JSON `DriverConfig`); defaults to the local backend.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Program to run.
    cmd: String,

    /// Arguments passed to the program verbatim.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1) Logger
    let cfg = LoggerConfig::default().with_env()?;
    logger_init(&cfg)?;

    // 2) Arguments
    let args = Args::parse();

    // 3) Driver
    let driver_cfg = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("read {}", path.display()))?;
            serde_json::from_str::<DriverConfig>(&raw)
                .with_context(|| format!("parse {}", path.display()))?
        }
        None => DriverConfig::default(),
    };
    let driver = qd_exec::from_config(&driver_cfg)?;
    info!(driver = %driver.name(), id = %driver.id(), "driver ready");

    // 4) Submit
    let run_path = std::env::current_dir()?;
    let request = JobRequest::new(args.cmd, run_path, "run-local").with_args(args.args);
    let handle = driver.submit(&request).await?;
    info!(job = %handle.job_name(), "submitted");

    // 5) Follow
    let mut last = None;
    let status = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupted; killing job");
                driver.kill(&handle).await?;
            }
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
        }
        let status = driver.get_status(&handle).await?;
        if last != Some(status) {
            info!(%status, "status");
            last = Some(status);
        }
        if status.is_terminal() {
            break status;
        }
    };

    // 6) Release
    driver.free_job(handle).await?;
    driver.free_driver().await?;

    if status == JobStatus::Failed {
        bail!("job failed");
    }
    Ok(())
}
