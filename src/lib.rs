//! Core of an ad-hoc mesh router: distance-vector route propagation,
//! service advertisement/selection with load-based tie-breaking, packet
//! dispatch, and a request/response context registry.
//!
//! Framing of individual packets beyond the three control-plane kinds,
//! concrete channel transports, and the host's selector/event loop are
//! external collaborators — see [`channel`] and [`selector`] for the
//! contracts this crate drives but does not implement.

pub mod channel;
pub mod config;
pub mod error;
pub mod node;
pub mod packet;
pub mod router;
pub mod selector;
pub mod service;

#[cfg(any(test, feature = "test-support"))]
pub mod testutil;

pub use channel::Channel;
pub use config::RouterConfig;
pub use error::RouterError;
pub use packet::Packet;
pub use router::{Handler, Router};
pub use selector::Selector;
