//! Netstate protocol handling: `NET_QUERY`/`NET_ROUTE`/`NET_SERVICE`
//! ingest, and the `export_routes`/`export_services` producers used both
//! to answer a query and (indirectly, via relay) to gossip updates.

use std::sync::Arc;
use std::time::Instant;

use crate::channel::SharedChannel;
use crate::packet::{
    make_route_packet, make_service_packet, parse_route_packet, parse_service_packet, NetState,
    Packet,
};

use super::Router;

impl Router {
    pub(super) fn handle_netstate(&self, channel: &SharedChannel, packet: Packet) {
        match packet.net_state {
            NetState::NetQuery => {
                let mut replies = self.export_routes();
                replies.extend(self.export_services());
                for reply in &replies {
                    if let Err(err) = channel.send(reply) {
                        log::warn!("failed to answer NET_QUERY: {err}");
                    }
                }
            }
            NetState::NetRoute => self.handle_net_route(channel, packet),
            NetState::NetService => self.handle_net_service(channel, packet),
            NetState::None => {
                log::warn!("handle_netstate called with a non-control packet");
            }
        }
    }

    fn handle_net_route(&self, channel: &SharedChannel, packet: Packet) {
        let (dest_addr, cost) = match parse_route_packet(&packet) {
            Ok(parsed) => parsed,
            Err(err) => {
                log::warn!("dropping malformed NET_ROUTE: {err}");
                return;
            }
        };

        let self_addr = self.config.self_addr();
        if dest_addr == self_addr {
            // remoteNodeMap never contains the router's own address.
            return;
        }
        let next_hop = packet.src_addr;

        let accepted = {
            let mut state = self.state.lock().expect("router mutex poisoned");
            let channel_snapshot: Vec<SharedChannel> = state.channels.clone();
            state.routes.apply_advertisement(dest_addr, next_hop, cost, channel.clone(), |stored| {
                channel_snapshot.iter().any(|c| Arc::ptr_eq(c, stored))
            })
        };
        if !accepted {
            return;
        }

        // Guard cost+1 against 16-bit overflow; cost >= 65535 is treated
        // as unreachable and is not relayed further.
        if cost >= u16::MAX {
            log::warn!("route to {dest_addr} at max cost, not relaying further");
            return;
        }
        let relay_cost = cost.saturating_add(1);

        self.relay_except(channel, &make_route_packet(self_addr, dest_addr, relay_cost));
    }

    fn handle_net_service(&self, channel: &SharedChannel, packet: Packet) {
        let (host_addr, service_id, load) = match parse_service_packet(&packet) {
            Ok(parsed) => parsed,
            Err(err) => {
                log::warn!("dropping malformed NET_SERVICE: {err}");
                return;
            }
        };

        {
            let mut state = self.state.lock().expect("router mutex poisoned");
            state.service_load.upsert(service_id, host_addr, load);
        }

        self.relay_except(channel, &packet);

        let to_flush: Vec<Packet> = {
            let mut state = self.state.lock().expect("router mutex poisoned");
            let queued = state.service_queue.take(service_id);
            match queued {
                Some(queued) => match state.routes.get(host_addr) {
                    Some(route) => {
                        let next_hop = route.next_hop;
                        queued
                            .into_iter()
                            .map(|mut queued_packet| {
                                queued_packet.dest_addr = host_addr;
                                queued_packet.next_addr = next_hop;
                                queued_packet
                            })
                            .collect()
                    }
                    None => Vec::new(),
                },
                None => Vec::new(),
            }
        };
        for flushed in &to_flush {
            if let Err(err) = channel.send(flushed) {
                log::warn!("failed to flush queued packet for service {service_id}: {err}");
            }
        }
    }

    /// Sends `packet` on every attached channel except `arrived_on`
    /// (split horizon: never echo an advertisement back to its source).
    fn relay_except(&self, arrived_on: &SharedChannel, packet: &Packet) {
        let targets: Vec<SharedChannel> = {
            let state = self.state.lock().expect("router mutex poisoned");
            state.channels.iter().filter(|c| !Arc::ptr_eq(c, arrived_on)).cloned().collect()
        };
        for target in targets {
            if let Err(err) = target.send(packet) {
                log::warn!("relay failed: {err}");
            }
        }
    }

    /// One self-route `(cost=1)` followed by one entry per known
    /// destination, each re-costed as `remote.cost + 1`. Entries whose
    /// `lastSeen` exceeds the configured expiry are omitted.
    pub(super) fn export_routes(&self) -> Vec<Packet> {
        let state = self.state.lock().expect("router mutex poisoned");
        let self_addr = self.config.self_addr();
        let expiry = self.config.route_expiry();
        let now = Instant::now();

        let mut routes = vec![make_route_packet(self_addr, self_addr, 1)];
        for node in state.routes.iter() {
            if let Some(expiry) = expiry {
                if now.duration_since(node.last_seen) >= expiry {
                    continue;
                }
            }
            routes.push(make_route_packet(self_addr, node.address, node.cost.saturating_add(1)));
        }
        routes
    }

    /// One `(host=self, load=0)` entry per locally registered service,
    /// followed by every known remote provider, ordered ascending by
    /// load within each service so the cheapest is received first.
    pub(super) fn export_services(&self) -> Vec<Packet> {
        let state = self.state.lock().expect("router mutex poisoned");
        let self_addr = self.config.self_addr();

        let mut local_ids: Vec<u16> = state.service_map.keys().copied().collect();
        local_ids.sort_unstable();

        let mut services: Vec<Packet> = local_ids
            .into_iter()
            .map(|service_id| make_service_packet(self_addr, self_addr, service_id, 0))
            .collect();

        for (service_id, provider, load) in state.service_load.iter_exportable() {
            services.push(make_service_packet(self_addr, provider, service_id, load));
        }
        services
    }
}
