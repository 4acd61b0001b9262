//! In-memory test doubles for the `Channel` and `Selector` contracts, in
//! the style of `MockEmbeddedLink`: enough of the real behavior to drive
//! the router end to end without sockets.

use std::sync::{Arc, Mutex, Weak};

use crate::channel::{Channel, OnClose, OnPacket};
use crate::error::ChannelError;
use crate::packet::Packet;
use crate::selector::{ReadyKey, Selector};

#[derive(Default)]
struct LoopbackState {
    peer: Option<Weak<LoopbackChannel>>,
    on_packet: Option<OnPacket>,
    on_close: Option<OnClose>,
    closed: bool,
    sent: Vec<Packet>,
    /// Packets that arrived before `listen` registered a callback —
    /// mirrors a real transport buffering bytes ahead of the application
    /// installing its read handler. Drained in order once `listen` runs.
    pending: Vec<Packet>,
}

/// A synchronous in-memory channel pair: `send` on one side hands the
/// packet straight to the other side's registered `on_packet`, and
/// `close` fires the other side's `on_close`. No real selector readiness
/// is involved — the host's selector abstraction is out of scope, so the
/// double is free to deliver immediately.
pub struct LoopbackChannel {
    state: Mutex<LoopbackState>,
}

impl LoopbackChannel {
    pub fn pair() -> (Arc<LoopbackChannel>, Arc<LoopbackChannel>) {
        let a = Arc::new(LoopbackChannel { state: Mutex::new(LoopbackState::default()) });
        let b = Arc::new(LoopbackChannel { state: Mutex::new(LoopbackState::default()) });
        a.state.lock().expect("loopback mutex poisoned").peer = Some(Arc::downgrade(&b));
        b.state.lock().expect("loopback mutex poisoned").peer = Some(Arc::downgrade(&a));
        (a, b)
    }

    /// Every packet sent on this side, for test assertions.
    pub fn sent(&self) -> Vec<Packet> {
        self.state.lock().expect("loopback mutex poisoned").sent.clone()
    }

    pub fn sent_count(&self) -> usize {
        self.state.lock().expect("loopback mutex poisoned").sent.len()
    }
}

impl Channel for LoopbackChannel {
    fn send(&self, packet: &Packet) -> Result<(), ChannelError> {
        let (peer, closed) = {
            let mut state = self.state.lock().expect("loopback mutex poisoned");
            if state.closed {
                return Err(ChannelError::Closed);
            }
            state.sent.push(packet.clone());
            (state.peer.clone(), state.closed)
        };
        let _ = closed;
        if let Some(peer) = peer.and_then(|weak| weak.upgrade()) {
            let on_packet = {
                let mut peer_state = peer.state.lock().expect("loopback mutex poisoned");
                match peer_state.on_packet.clone() {
                    Some(cb) => Some(cb),
                    None => {
                        peer_state.pending.push(packet.clone());
                        None
                    }
                }
            };
            if let Some(on_packet) = on_packet {
                on_packet(packet.clone());
            }
        }
        Ok(())
    }

    fn listen(&self, _selector: &dyn Selector, on_packet: OnPacket) {
        let backlog = {
            let mut state = self.state.lock().expect("loopback mutex poisoned");
            state.on_packet = Some(on_packet.clone());
            std::mem::take(&mut state.pending)
        };
        for packet in backlog {
            on_packet(packet);
        }
    }

    fn close(&self) {
        let (peer, on_close) = {
            let mut state = self.state.lock().expect("loopback mutex poisoned");
            state.closed = true;
            (state.peer.clone(), state.on_close.clone())
        };
        if let Some(on_close) = on_close {
            on_close();
        }
        if let Some(peer) = peer.and_then(|weak| weak.upgrade()) {
            let peer_close = {
                let mut state = peer.state.lock().expect("loopback mutex poisoned");
                if state.closed {
                    None
                } else {
                    state.closed = true;
                    state.on_close.clone()
                }
            };
            if let Some(peer_close) = peer_close {
                peer_close();
            }
        }
    }

    fn set_on_close(&self, on_close: OnClose) {
        self.state.lock().expect("loopback mutex poisoned").on_close = Some(on_close);
    }
}

/// A `Selector` double that never yields readiness events. The loopback
/// channel delivers synchronously and ignores the selector entirely, so
/// tests never need `Router::run` to make progress; this exists only to
/// satisfy `add_channel`'s signature.
pub struct NullSelector;

impl Selector for NullSelector {
    fn select(&self) -> Vec<ReadyKey> {
        Vec::new()
    }
}
