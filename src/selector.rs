//! The host's readiness-based I/O multiplexer (external, out of scope for
//! the core). The router only needs enough of a contract to drive its run
//! loop; concrete selectors (epoll, kqueue, IOCP, or language-runtime
//! equivalents) are an application concern.

use std::sync::Arc;

/// A registration token a [`Selector`] hands back from `select()`. The host
/// abstraction is free to shape the underlying descriptor however it likes;
/// the router only ever invokes the callback bound to it.
pub struct ReadyKey {
    pub callback: Arc<dyn Fn() + Send + Sync>,
}

/// Minimal selector contract: block until at least one registration is
/// ready, then hand back the matching keys in arbitrary order.
pub trait Selector: Send + Sync {
    fn select(&self) -> Vec<ReadyKey>;
}
