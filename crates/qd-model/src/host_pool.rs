use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a `host[:capacity]` entry cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostParseError {
    #[error("empty host name in entry: {0:?}")]
    EmptyName(String),
    #[error("invalid capacity in entry {entry:?}: {reason}")]
    InvalidCapacity { entry: String, reason: String },
}

/// One remote host together with the number of jobs it may run at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Host {
    pub name: String,
    pub max_running: usize,
}

impl Host {
    pub fn new(name: impl Into<String>, max_running: usize) -> Self {
        Self {
            name: name.into(),
            max_running,
        }
    }
}

/// Parses `"host"` or `"host:capacity"`; a missing capacity means 1.
impl FromStr for Host {
    type Err = HostParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let entry = s.trim();
        let (name, capacity) = match entry.rsplit_once(':') {
            Some((name, cap)) => {
                let cap = cap
                    .trim()
                    .parse::<usize>()
                    .map_err(|e| HostParseError::InvalidCapacity {
                        entry: entry.to_string(),
                        reason: e.to_string(),
                    })?;
                (name.trim(), cap)
            }
            None => (entry, 1),
        };

        if name.is_empty() {
            return Err(HostParseError::EmptyName(entry.to_string()));
        }
        Ok(Host::new(name, capacity))
    }
}

/// Ordered set of hosts available to a remote-shell driver.
///
/// Host names are unique: pushing a host that is already present adds its capacity to the existing entry.
/// Deserialization goes through the same merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Host>", into = "Vec<Host>")]
pub struct HostPool(Vec<Host>);

impl HostPool {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Add a host, merging capacity with an existing entry of the same name.
    pub fn push(&mut self, host: Host) {
        match self.0.iter_mut().find(|h| h.name == host.name) {
            Some(existing) => existing.max_running += host.max_running,
            None => self.0.push(host),
        }
    }

    /// Builder-style [`HostPool::push`].
    pub fn with_host(mut self, name: impl Into<String>, max_running: usize) -> Self {
        self.push(Host::new(name, max_running));
        self
    }

    /// Parse a list of `host[:capacity]` entries.
    pub fn parse<I, S>(entries: I) -> Result<Self, HostParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pool = HostPool::new();
        for entry in entries {
            pool.push(entry.as_ref().parse()?);
        }
        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Host> {
        self.0.iter()
    }

    /// Sum of per-host capacities.
    pub fn total_capacity(&self) -> usize {
        self.0.iter().map(|h| h.max_running).sum()
    }
}

impl FromIterator<Host> for HostPool {
    fn from_iter<T: IntoIterator<Item = Host>>(iter: T) -> Self {
        let mut pool = HostPool::new();
        for host in iter {
            pool.push(host);
        }
        pool
    }
}

impl From<Vec<Host>> for HostPool {
    fn from(hosts: Vec<Host>) -> Self {
        hosts.into_iter().collect()
    }
}

impl From<HostPool> for Vec<Host> {
    fn from(pool: HostPool) -> Self {
        pool.0
    }
}

impl IntoIterator for HostPool {
    type Item = Host;
    type IntoIter = std::vec::IntoIter<Host>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
