//! Dispatch: `send(packet)` and the service-selection it relies on.

use crate::error::RouterError;
use crate::packet::{Packet, UNSET};

use super::Router;

impl Router {
    /// Dispatches `packet`: local delivery, forwarding, queueing behind a
    /// not-yet-reachable service, or a diagnostic failure.
    pub fn send(&self, mut packet: Packet) -> Result<(), RouterError> {
        let self_addr = self.config.self_addr();

        if packet.src_addr == UNSET {
            packet.src_addr = self_addr;
        }

        if packet.dest_addr == UNSET && packet.service_id != UNSET {
            let service_id = packet.service_id;
            match self.select_service(service_id) {
                Some(dest) => packet.dest_addr = dest,
                None => {
                    let mut state = self.state.lock().expect("router mutex poisoned");
                    state.service_queue.push(service_id, packet);
                    return Err(RouterError::ServiceUnavailable { service_id });
                }
            }
        }

        if packet.dest_addr == self_addr {
            let handler = {
                let state = self.state.lock().expect("router mutex poisoned");
                let by_service = if packet.service_id != UNSET {
                    state.service_map.get(&packet.service_id).cloned()
                } else {
                    None
                };
                by_service.or_else(|| {
                    if packet.context_id != UNSET {
                        state.context_map.get(&packet.context_id).cloned()
                    } else {
                        None
                    }
                })
            };
            return match handler {
                Some(handler) => {
                    // Invoked after the lock above is released.
                    handler(packet);
                    Ok(())
                }
                None => Err(RouterError::HandlerMissing),
            };
        }

        if packet.next_addr == UNSET || packet.next_addr == self_addr {
            let (route_channel, next_hop) = {
                let state = self.state.lock().expect("router mutex poisoned");
                match state.routes.get(packet.dest_addr) {
                    Some(route) => (route.channel.clone(), route.next_hop),
                    None => return Err(RouterError::NoRoute { dest: packet.dest_addr }),
                }
            };
            packet.src_addr = self_addr;
            packet.next_addr = next_hop;
            if let Err(err) = route_channel.send(&packet) {
                log::warn!("forwarding to {} failed: {err}", packet.dest_addr);
            }
            return Ok(());
        }

        Err(RouterError::Unroutable)
    }

    /// A locally registered service wins unconditionally; otherwise the
    /// provider with the minimum reported load, tracked from the first
    /// candidate seen so a provider legitimately reporting load `0` is
    /// never mistaken for "no candidate yet".
    fn select_service(&self, service_id: u16) -> Option<u16> {
        let state = self.state.lock().expect("router mutex poisoned");
        if state.service_map.contains_key(&service_id) {
            return Some(self.config.self_addr());
        }
        state.service_load.min_provider(service_id).map(|(addr, _)| addr)
    }
}
