//! Driver abstraction between a job queue and the execution backends.
//!
//! A [`Driver`] wraps exactly one [`Backend`] and exposes the uniform job lifecycle
//! (`submit` → `get_status`* → `kill`? → `free_job`) together with the backend's
//! runtime options, reached through [`Configurable`].

pub mod error;
pub use error::{BackendError, DriverError, OptionError};

pub mod backend;
pub use backend::{Backend, Configurable};

pub mod options;
pub use options::OptionRegistry;

mod handle;
pub use handle::JobHandle;

pub mod driver;
pub use driver::Driver;

pub mod prelude {
    pub use crate::backend::{Backend, Configurable};
    pub use crate::driver::Driver;
    pub use crate::error::{BackendError, DriverError, OptionError};
    pub use crate::handle::JobHandle;
    pub use crate::options::OptionRegistry;
    pub use qd_model::{DriverKind, JobRequest, JobStatus, OptionValue};
}
