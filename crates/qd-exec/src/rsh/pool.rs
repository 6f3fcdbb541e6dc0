use qd_model::{Host, HostPool};

/// Host with its live slot count.
#[derive(Debug, Clone)]
struct HostSlot {
    name: String,
    max_running: usize,
    running: usize,
}

/// Slot bookkeeping for the remote-shell host pool.
///
/// Selection is least-loaded first; ties go to the host listed first.
#[derive(Debug, Default)]
pub(crate) struct Slots {
    hosts: Vec<HostSlot>,
}

impl Slots {
    /// Replace the host list. Hosts that stay keep their running count; repeated names merge.
    pub(crate) fn replace(&mut self, pool: &HostPool) {
        let previous = std::mem::take(&mut self.hosts);
        for host in pool.iter() {
            self.add(host.clone());
        }
        for slot in &mut self.hosts {
            slot.running = previous
                .iter()
                .find(|p| p.name == slot.name)
                .map_or(0, |p| p.running);
        }
    }

    pub(crate) fn add(&mut self, host: Host) {
        match self.hosts.iter_mut().find(|h| h.name == host.name) {
            Some(slot) => slot.max_running += host.max_running,
            None => self.hosts.push(HostSlot {
                name: host.name,
                max_running: host.max_running,
                running: 0,
            }),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.hosts.clear();
    }

    /// Sum of per-host capacities.
    pub(crate) fn capacity(&self) -> usize {
        self.hosts.iter().map(|h| h.max_running).sum()
    }

    pub(crate) fn pool(&self) -> HostPool {
        self.hosts
            .iter()
            .map(|h| Host::new(h.name.clone(), h.max_running))
            .collect()
    }

    /// Reserve a slot on the least-loaded host with free capacity.
    pub(crate) fn acquire(&mut self) -> Option<String> {
        let slot = self
            .hosts
            .iter_mut()
            .filter(|h| h.running < h.max_running)
            .min_by_key(|h| h.running)?;
        slot.running += 1;
        Some(slot.name.clone())
    }

    /// Return a slot. Unknown hosts (removed from the pool meanwhile) are ignored.
    pub(crate) fn release(&mut self, host: &str) {
        if let Some(slot) = self.hosts.iter_mut().find(|h| h.name == host) {
            slot.running = slot.running.saturating_sub(1);
        }
    }

    pub(crate) fn running(&self) -> usize {
        self.hosts.iter().map(|h| h.running).sum()
    }

    pub(crate) fn running_on(&self, host: &str) -> usize {
        self.hosts
            .iter()
            .find(|h| h.name == host)
            .map_or(0, |h| h.running)
    }
}
