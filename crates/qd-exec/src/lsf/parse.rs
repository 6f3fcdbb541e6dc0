//! Parsing of `bsub` / `bjobs` output.
use qd_model::JobStatus;

/// LSF job id.
pub type LsfJobId = u64;

/// Extract the job id from `Job <1234> is submitted to queue <normal>.`
pub fn submitted_job_id(stdout: &str) -> Option<LsfJobId> {
    stdout.lines().find_map(|line| {
        let rest = line.trim_start().strip_prefix("Job <")?;
        let (id, _) = rest.split_once('>')?;
        id.trim().parse().ok()
    })
}

/// Find the STAT column of `id` in `bjobs` output.
///
/// Expected layout (header optional):
/// ```text
/// JOBID   USER    STAT  QUEUE      FROM_HOST   EXEC_HOST   JOB_NAME   SUBMIT_TIME
/// 1234    sim     RUN   normal     login1      node17      sim-0001   Jan 10 12:00
/// ```
pub fn job_stat(stdout: &str, id: LsfJobId) -> Option<&str> {
    stdout.lines().find_map(|line| {
        let mut cols = line.split_whitespace();
        let job = cols.next()?.parse::<LsfJobId>().ok()?;
        if job != id {
            return None;
        }
        cols.nth(1)
    })
}

/// Map an LSF STAT value onto [`JobStatus`].
pub fn map_stat(stat: &str) -> JobStatus {
    match stat {
        "PEND" | "PSUSP" => JobStatus::Pending,
        "RUN" | "USUSP" | "SSUSP" => JobStatus::Running,
        "DONE" => JobStatus::Success,
        "EXIT" | "ZOMBI" => JobStatus::Failed,
        _ => JobStatus::Unknown,
    }
}
