//! The router itself: owns the channel set, routing and service tables,
//! and the local handler registries; implements the netstate protocol and
//! dispatch (split across [`netstate`] and [`dispatch`]).

mod dispatch;
mod netstate;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rand_core::{OsRng, RngCore};

use crate::channel::SharedChannel;
use crate::config::RouterConfig;
use crate::node::RouteTable;
use crate::packet::{make_net_query_packet, Packet};
use crate::selector::Selector;
use crate::service::{ServiceLoadTable, ServiceQueueTable};

/// A local service or context reply handler: a single-method interface,
/// represented as a closure.
pub type Handler = Arc<dyn Fn(Packet) + Send + Sync>;

#[derive(Default)]
struct RouterState {
    channels: Vec<SharedChannel>,
    routes: RouteTable,
    service_map: HashMap<u16, Handler>,
    context_map: HashMap<u16, Handler>,
    service_load: ServiceLoadTable,
    service_queue: ServiceQueueTable,
}

/// Owns every piece of shared router state behind one mutex, plus the
/// immutable [`RouterConfig`]. Constructed behind an `Arc` because
/// `add_channel` needs a non-owning (`Weak`) back-reference to hand to
/// channels for their `on_close`/`on_packet` callbacks, avoiding a
/// reference cycle between a router and the channels it owns.
pub struct Router {
    config: RouterConfig,
    state: Mutex<RouterState>,
    stopped: AtomicBool,
}

impl Router {
    pub fn new(config: RouterConfig) -> Arc<Self> {
        Arc::new(Self { config, state: Mutex::new(RouterState::default()), stopped: AtomicBool::new(false) })
    }

    pub fn self_addr(&self) -> u16 {
        self.config.self_addr()
    }

    /// Registers `channel`, subscribes to its packets, installs eviction
    /// as its `on_close` hook, then immediately queries it.
    pub fn add_channel(self: &Arc<Self>, channel: SharedChannel, selector: &dyn Selector) {
        {
            let mut state = self.state.lock().expect("router mutex poisoned");
            state.channels.push(channel.clone());
        }
        log::debug!("channel attached, querying neighbor");

        let weak_for_close = Arc::downgrade(self);
        let channel_for_close = channel.clone();
        channel.set_on_close(Arc::new(move || {
            if let Some(router) = weak_for_close.upgrade() {
                router.remove_channel(&channel_for_close);
            }
        }));

        let weak_for_packet = Arc::downgrade(self);
        let channel_for_packet = channel.clone();
        channel.listen(
            selector,
            Arc::new(move |packet| {
                if let Some(router) = weak_for_packet.upgrade() {
                    router.on_packet(&channel_for_packet, packet);
                }
            }),
        );

        let query = make_net_query_packet(self.config.self_addr());
        if let Err(err) = channel.send(&query) {
            log::warn!("failed to send NET_QUERY on newly attached channel: {err}");
        }
    }

    /// Drops `channel` from the channel set and proactively drops any
    /// routes it was carrying, rather than waiting for a fresh
    /// advertisement to correct them or for `evict_expired_routes` to
    /// reap them on a timer.
    pub fn remove_channel(&self, channel: &SharedChannel) {
        let mut state = self.state.lock().expect("router mutex poisoned");
        state.channels.retain(|c| !Arc::ptr_eq(c, channel));
        for address in state.routes.addresses_via_channel(channel) {
            state.routes.remove_by_address(address);
        }
        log::debug!("channel removed, {} channels remain", state.channels.len());
    }

    pub fn register_service(&self, service_id: u16, handler: Handler) {
        let mut state = self.state.lock().expect("router mutex poisoned");
        state.service_map.insert(service_id, handler);
        log::debug!("service {service_id} registered locally");
    }

    /// Removes `service_id` from the local service map, if present.
    pub fn unregister_service(&self, service_id: u16) {
        let mut state = self.state.lock().expect("router mutex poisoned");
        state.service_map.remove(&service_id);
        log::debug!("service {service_id} unregistered");
    }

    /// Allocates a fresh random context id in the configured range,
    /// retrying within the lock until a non-colliding value is drawn.
    pub fn register_context_handler(&self, handler: Handler) -> u16 {
        let (min, max) = self.config.context_id_range();
        let span = u32::from(max - min) + 1;
        let mut state = self.state.lock().expect("router mutex poisoned");
        loop {
            let candidate = min + (OsRng.next_u32() % span) as u16;
            if !state.context_map.contains_key(&candidate) {
                state.context_map.insert(candidate, handler);
                return candidate;
            }
        }
    }

    /// Idempotent: releasing an id that isn't bound is a no-op.
    pub fn release_context(&self, context_id: u16) {
        let mut state = self.state.lock().expect("router mutex poisoned");
        state.context_map.remove(&context_id);
    }

    /// Drops stale routes whose channel is gone and whose last
    /// advertisement is older than the configured expiry. Not invoked
    /// automatically; an embedding application drives it from its own
    /// periodic maintenance loop (no timer lives in the core).
    pub fn evict_expired_routes(&self) {
        let mut state = self.state.lock().expect("router mutex poisoned");
        state.routes.evict_expired(self.config.route_expiry());
    }

    /// Stops the run loop and closes every channel.
    pub fn close(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        let channels = {
            let state = self.state.lock().expect("router mutex poisoned");
            state.channels.clone()
        };
        for channel in channels {
            channel.close();
        }
        log::info!("router closed");
    }

    /// Drives the selector loop until `close()` is called. Channel
    /// callbacks fire on this thread; other threads may still call
    /// `send`/`register_*`/`release_context` concurrently.
    pub fn run(&self, selector: &dyn Selector) {
        while !self.stopped.load(Ordering::SeqCst) {
            for key in selector.select() {
                (key.callback)();
            }
        }
    }

    /// Per-channel callback: routes control-plane packets to
    /// `handle_netstate`, everything else to `send`.
    fn on_packet(&self, channel: &SharedChannel, packet: Packet) {
        if packet.is_netstate() {
            self.handle_netstate(channel, packet);
        } else if let Err(err) = self.send(packet) {
            log::debug!("dispatch declined packet: {err}");
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Router {
    /// `(nextHop, cost)` for a known destination, for tests that need to
    /// inspect `remoteNodeMap` directly rather than only through dispatch.
    pub fn debug_route(&self, dest_addr: u16) -> Option<(u16, u16)> {
        let state = self.state.lock().expect("router mutex poisoned");
        state.routes.get(dest_addr).map(|route| (route.next_hop, route.cost))
    }

    /// Whether `service_id` currently has a pending packet queue.
    pub fn debug_service_queued(&self, service_id: u16) -> bool {
        let state = self.state.lock().expect("router mutex poisoned");
        state.service_queue.contains(service_id)
    }
}
