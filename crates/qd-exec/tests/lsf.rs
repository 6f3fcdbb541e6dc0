#![cfg(unix)]

use std::{fs, os::unix::fs::PermissionsExt, path::Path};

use qd_core::prelude::*;
use qd_exec::{
    lsf::{LSF_BJOBS_CMD, LSF_BKILL_CMD, LSF_BSUB_CMD, LSF_STATUS_TIMEOUT_MS},
    new_batch_cluster,
};
use tempfile::TempDir;

fn script(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

/// Fake LSF install: `bsub` records its argv, `bjobs` prints the row in `stat`,
/// `bkill` records the id it was given.
struct FakeLsf {
    dir: TempDir,
}

impl FakeLsf {
    fn new(bsub_reply: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let d = dir.path().display();
        script(
            dir.path(),
            "bsub",
            &format!("echo \"$@\" > {d}/bsub.args\necho '{bsub_reply}'"),
        );
        script(
            dir.path(),
            "bjobs",
            &format!("echo 'JOBID USER STAT QUEUE FROM_HOST EXEC_HOST JOB_NAME SUBMIT_TIME'\ncat {d}/stat"),
        );
        script(dir.path(), "bkill", &format!("echo \"$1\" >> {d}/killed"));
        Self { dir }
    }

    fn path(&self, name: &str) -> String {
        self.dir.path().join(name).to_string_lossy().into_owned()
    }

    fn set_stat(&self, stat: &str) {
        fs::write(
            self.dir.path().join("stat"),
            format!("101 sim {stat} normal login1 node1 sim-1 Jan 10 12:00\n"),
        )
        .unwrap();
    }

    fn read(&self, name: &str) -> String {
        fs::read_to_string(self.dir.path().join(name)).unwrap_or_default()
    }

    fn driver(&self) -> Driver {
        let driver = new_batch_cluster("normal", "select[type==X]", "", 4).unwrap();
        driver.set_string_option(LSF_BSUB_CMD, &self.path("bsub")).unwrap();
        driver.set_string_option(LSF_BJOBS_CMD, &self.path("bjobs")).unwrap();
        driver.set_string_option(LSF_BKILL_CMD, &self.path("bkill")).unwrap();
        driver
    }
}

fn request(lsf: &FakeLsf) -> JobRequest {
    JobRequest::new("/opt/sim/run", lsf.dir.path(), "sim-1").with_args(["realization-1"])
}

#[tokio::test]
async fn submit_poll_and_finish() {
    let lsf = FakeLsf::new("Job <101> is submitted to queue <normal>.");
    let driver = lsf.driver();

    lsf.set_stat("PEND");
    let handle = driver.submit(&request(&lsf)).await.unwrap();

    let args = lsf.read("bsub.args");
    assert!(args.contains("-q normal -J sim-1 -n 4 -R select[type==X] /opt/sim/run realization-1"));
    assert!(args.contains("sim-1.LSF-stdout"));

    assert_eq!(driver.get_status(&handle).await.unwrap(), JobStatus::Pending);
    lsf.set_stat("RUN");
    assert_eq!(driver.get_status(&handle).await.unwrap(), JobStatus::Running);
    lsf.set_stat("DONE");
    assert_eq!(driver.get_status(&handle).await.unwrap(), JobStatus::Success);

    // Terminal status is sticky even if bjobs forgets the job.
    fs::remove_file(lsf.dir.path().join("stat")).unwrap();
    assert_eq!(driver.get_status(&handle).await.unwrap(), JobStatus::Success);

    driver.free_job(handle).await.unwrap();
    driver.free_driver().await.unwrap();
}

#[tokio::test]
async fn kill_running_job() {
    let lsf = FakeLsf::new("Job <101> is submitted to queue <normal>.");
    let driver = lsf.driver();
    lsf.set_stat("RUN");

    let handle = driver.submit(&request(&lsf)).await.unwrap();
    driver.kill(&handle).await.unwrap();
    assert_eq!(lsf.read("killed").trim(), "101");

    lsf.set_stat("EXIT");
    assert_eq!(driver.get_status(&handle).await.unwrap(), JobStatus::Failed);

    // No bkill once the job is known to be finished.
    driver.kill(&handle).await.unwrap();
    assert_eq!(lsf.read("killed").lines().count(), 1);
    driver.free_job(handle).await.unwrap();
}

#[tokio::test]
async fn rejected_submission_is_failed() {
    let lsf = FakeLsf::new("Request aborted by esub. Job not submitted.");
    let driver = lsf.driver();

    let handle = driver.submit(&request(&lsf)).await.unwrap();
    assert_eq!(driver.get_status(&handle).await.unwrap(), JobStatus::Failed);

    driver.kill(&handle).await.unwrap();
    assert_eq!(lsf.read("killed"), "");
    driver.free_job(handle).await.unwrap();
}

#[tokio::test]
async fn slow_bjobs_reads_as_unknown() {
    let lsf = FakeLsf::new("Job <101> is submitted to queue <normal>.");
    let driver = lsf.driver();
    let slow = script(lsf.dir.path(), "bjobs-slow", "sleep 5");
    driver.set_string_option(LSF_BJOBS_CMD, &slow).unwrap();
    driver.set_int_option(LSF_STATUS_TIMEOUT_MS, 100).unwrap();

    let handle = driver.submit(&request(&lsf)).await.unwrap();
    let started = std::time::Instant::now();
    assert_eq!(driver.get_status(&handle).await.unwrap(), JobStatus::Unknown);
    assert!(started.elapsed() < std::time::Duration::from_secs(3));

    // Recovers once bjobs answers again.
    driver.set_string_option(LSF_BJOBS_CMD, &lsf.path("bjobs")).unwrap();
    lsf.set_stat("DONE");
    assert_eq!(driver.get_status(&handle).await.unwrap(), JobStatus::Success);
    driver.free_job(handle).await.unwrap();
}

#[tokio::test]
async fn missing_bsub_is_failed() {
    let driver = new_batch_cluster("normal", "", "", 1).unwrap();
    driver
        .set_string_option(LSF_BSUB_CMD, "/no/such/bsub")
        .unwrap();

    let handle = driver
        .submit(&JobRequest::new("run", "/tmp", "nobsub"))
        .await
        .unwrap();
    assert_eq!(driver.get_status(&handle).await.unwrap(), JobStatus::Failed);
    driver.free_job(handle).await.unwrap();
}
