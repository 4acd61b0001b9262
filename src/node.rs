//! The forwarding table: one [`RemoteNode`] per known non-local destination.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::channel::SharedChannel;

/// A destination reachable through a neighbor, as last advertised.
pub struct RemoteNode {
    pub address: u16,
    pub next_hop: u16,
    pub cost: u16,
    pub channel: SharedChannel,
    pub last_seen: Instant,
}

impl RemoteNode {
    pub fn new(address: u16, next_hop: u16, cost: u16, channel: SharedChannel) -> Self {
        Self { address, next_hop, cost, channel, last_seen: Instant::now() }
    }

    fn refresh(&mut self) {
        self.last_seen = Instant::now();
    }
}

/// `remoteNodeMap`: keyed by destination address, never contains the
/// router's own address.
#[derive(Default)]
pub struct RouteTable {
    map: HashMap<u16, RemoteNode>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self { map: HashMap::new() }
    }

    pub fn get(&self, address: u16) -> Option<&RemoteNode> {
        self.map.get(&address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteNode> {
        self.map.values()
    }

    /// Applies a `NET_ROUTE` advertisement. Returns `true` if the table was
    /// inserted or updated (and therefore should be relayed), `false` if it
    /// was silently dropped per the monotone-cost acceptance rule.
    ///
    /// `channel_still_present` lets the caller report whether the stored
    /// channel for an existing entry is still in the router's channel set,
    /// without this table needing to know about the channel set itself.
    pub fn apply_advertisement(
        &mut self,
        address: u16,
        next_hop: u16,
        cost: u16,
        channel: SharedChannel,
        channel_still_present: impl FnOnce(&SharedChannel) -> bool,
    ) -> bool {
        match self.map.get_mut(&address) {
            None => {
                self.map.insert(address, RemoteNode::new(address, next_hop, cost, channel));
                true
            }
            Some(existing) => {
                let accept = !channel_still_present(&existing.channel)
                    || cost < existing.cost
                    || existing.cost == 0;
                if !accept {
                    return false;
                }
                existing.next_hop = next_hop;
                existing.channel = channel;
                existing.cost = cost;
                existing.refresh();
                true
            }
        }
    }

    /// Drops entries whose channel is no longer reachable and whose last
    /// advertisement is older than `expiry`. No expiry is enforced when
    /// `expiry` is `None`.
    pub fn evict_expired(&mut self, expiry: Option<Duration>) {
        let Some(expiry) = expiry else { return };
        let now = Instant::now();
        self.map.retain(|_, node| now.duration_since(node.last_seen) < expiry);
    }

    pub fn remove_by_address(&mut self, address: u16) {
        self.map.remove(&address);
    }

    /// Destinations currently routed through `channel`, for a caller that
    /// just lost that channel and wants to drop the routes it carried
    /// rather than wait for `evict_expired`.
    pub fn addresses_via_channel(&self, channel: &SharedChannel) -> Vec<u16> {
        self.map
            .values()
            .filter(|node| std::sync::Arc::ptr_eq(&node.channel, channel))
            .map(|node| node.address)
            .collect()
    }
}
