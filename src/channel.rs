//! The `Channel` contract (duck-typed per the external interface): a
//! full-duplex transport the router drives but never implements concretely.
//! Concrete transports (serial, TCP, UDP) are out of scope for the core;
//! only the contract and a loopback test double ([`crate::testutil`]) live
//! here.

use std::sync::Arc;

use crate::error::ChannelError;
use crate::packet::Packet;
use crate::selector::Selector;

/// Invoked once per inbound packet, in arrival order, on the thread driving
/// the selector loop. `Arc`-wrapped (rather than `Box`) so a channel
/// implementation can clone it out from under its own lock before
/// invoking it, avoiding reentrant-lock deadlocks on delivery.
pub type OnPacket = Arc<dyn Fn(Packet) + Send + Sync>;

/// Invoked at most once, when the peer disconnects or the transport fails.
pub type OnClose = Arc<dyn Fn() + Send + Sync>;

/// A bidirectional transport between this node and one neighbor.
///
/// `set_on_close` registers the callback fired on disconnect; the router
/// installs its own channel-eviction callback there in `add_channel`, and
/// implementations MUST invoke it at most once.
pub trait Channel: Send + Sync {
    fn send(&self, packet: &Packet) -> Result<(), ChannelError>;

    /// Registers `on_packet` against `selector` so the channel's readiness
    /// events reach the router's dispatch loop.
    fn listen(&self, selector: &dyn Selector, on_packet: OnPacket);

    fn close(&self);

    fn set_on_close(&self, on_close: OnClose);
}

pub type SharedChannel = Arc<dyn Channel>;
