//! Execution backends for [`qd_core::Driver`]: local processes, remote shell, LSF.
mod error;
pub use error::{ExecError, ExecResult};

pub mod util;

mod proc;
pub use proc::ProcJob;

pub mod local;
pub use local::LocalBackend;

pub mod rsh;
pub use rsh::{RemoteShellBackend, RshJob};

pub mod lsf;
pub use lsf::{LsfBackend, LsfJob};

pub mod factory;
pub use factory::{from_config, new_batch_cluster, new_local, new_remote_shell};

pub mod prelude {
    pub use crate::error::{ExecError, ExecResult};
    pub use crate::factory::{from_config, new_batch_cluster, new_local, new_remote_shell};
    pub use crate::{LocalBackend, LsfBackend, RemoteShellBackend};
}
