use thiserror::Error;

/// Failures of the external commands a backend runs (`bsub`, `bjobs`, remote shells, ...).
///
/// These never cross the driver boundary: backends log them and translate them
/// into a job status.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("non-zero exit code: {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },
    #[error("killed by signal")]
    KilledBySignal,
    #[error("timed out after {ms} ms")]
    Timeout { ms: u64 },
    #[error("unexpected output: {0}")]
    UnexpectedOutput(String),
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ExecError {
    fn from(e: std::io::Error) -> Self {
        ExecError::Io(e.to_string())
    }
}

pub type ExecResult<T> = Result<T, ExecError>;
