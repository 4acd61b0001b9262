//! Service-location state: the per-service load table gossiped between
//! nodes, and the per-service packet queue used while no provider is known.

use std::collections::HashMap;

use crate::packet::Packet;

/// `serviceLoadMap`: `serviceID -> (providerAddress -> load)`.
#[derive(Default)]
pub struct ServiceLoadTable {
    map: HashMap<u16, HashMap<u16, u16>>,
}

impl ServiceLoadTable {
    pub fn new() -> Self {
        Self { map: HashMap::new() }
    }

    pub fn upsert(&mut self, service_id: u16, provider: u16, load: u16) {
        self.map.entry(service_id).or_default().insert(provider, load);
    }

    /// The provider with the lowest reported load for `service_id`, or
    /// `None` if nobody has advertised it. Tracks the true minimum
    /// starting from the first candidate seen, so a provider legitimately
    /// reporting load `0` is never mistaken for "no candidate yet".
    pub fn min_provider(&self, service_id: u16) -> Option<(u16, u16)> {
        let providers = self.map.get(&service_id)?;
        let mut best: Option<(u16, u16)> = None;
        for (&addr, &load) in providers {
            best = match best {
                None => Some((addr, load)),
                Some((_, best_load)) if load < best_load => Some((addr, load)),
                Some(current) => Some(current),
            };
        }
        best
    }

    /// Providers for `service_id` ordered ascending by load, so the
    /// cheapest is received first by a peer exporting this table.
    pub fn providers_sorted(&self, service_id: u16) -> Vec<(u16, u16)> {
        let mut entries: Vec<(u16, u16)> = self
            .map
            .get(&service_id)
            .map(|providers| providers.iter().map(|(&addr, &load)| (addr, load)).collect())
            .unwrap_or_default();
        entries.sort_by_key(|&(_, load)| load);
        entries
    }

    /// All `(serviceID, providerAddress, load)` entries, grouped by
    /// service and load-ordered within each group, for `export_services`.
    pub fn iter_exportable(&self) -> impl Iterator<Item = (u16, u16, u16)> + '_ {
        self.map.keys().flat_map(move |&service_id| {
            self.providers_sorted(service_id)
                .into_iter()
                .map(move |(addr, load)| (service_id, addr, load))
        })
    }
}

/// `serviceQueue`: `serviceID -> ordered packets awaiting a provider`.
#[derive(Default)]
pub struct ServiceQueueTable {
    map: HashMap<u16, Vec<Packet>>,
}

impl ServiceQueueTable {
    pub fn new() -> Self {
        Self { map: HashMap::new() }
    }

    pub fn push(&mut self, service_id: u16, packet: Packet) {
        self.map.entry(service_id).or_default().push(packet);
    }

    pub fn contains(&self, service_id: u16) -> bool {
        self.map.contains_key(&service_id)
    }

    /// Removes and returns the queued packets for `service_id`, if any.
    pub fn take(&mut self, service_id: u16) -> Option<Vec<Packet>> {
        self.map.remove(&service_id)
    }
}
