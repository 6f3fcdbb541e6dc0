//! Plain data shared by the driver core, the backends and the configuration layer.

mod job_status;
pub use job_status::JobStatus;

mod driver_kind;
pub use driver_kind::DriverKind;

mod host_pool;
pub use host_pool::{Host, HostPool, HostParseError};

mod option_value;
pub use option_value::{OptionKind, OptionValue};

mod job_request;
pub use job_request::JobRequest;

mod driver_config;
pub use driver_config::{BackendConfig, DriverConfig};

/// Per-driver sequential job identifier, used for logging only.
pub type JobId = u64;
