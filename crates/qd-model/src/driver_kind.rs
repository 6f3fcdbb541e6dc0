use serde::{Deserialize, Serialize};

/// Backend family a driver is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DriverKind {
    /// Unbound driver tag. Never produced by the factory.
    #[default]
    None,
    /// Child processes on the current host.
    Local,
    /// Processes started on pool hosts through a remote shell.
    RemoteShell,
    /// Jobs submitted to an LSF batch cluster.
    BatchCluster,
}

impl DriverKind {
    /// Returns a short symbolic identifier, matching the driver name used in logs:
    /// - `"none"`
    /// - `"local"`
    /// - `"RSH"`
    /// - `"LSF"`
    pub fn label(&self) -> &'static str {
        match self {
            DriverKind::None => "none",
            DriverKind::Local => "local",
            DriverKind::RemoteShell => "RSH",
            DriverKind::BatchCluster => "LSF",
        }
    }
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
