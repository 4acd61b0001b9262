/// Errors surfaced by dispatch (`Router::send`) and friends.
///
/// Parse and channel failures are handled locally (logged, dropped) and never
/// reach this enum; only dispatch outcomes that the caller of `send` needs to
/// see are represented here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum RouterError {
    #[error("no route to {dest}")]
    NoRoute { dest: u16 },

    #[error("service {service_id} unavailable, packet queued")]
    ServiceUnavailable { service_id: u16 },

    #[error("not registered")]
    HandlerMissing,

    #[error("unroutable")]
    Unroutable,
}

impl RouterError {
    /// `true` for outcomes where the packet was nonetheless retained
    /// (queued) rather than dropped.
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::ServiceUnavailable { .. })
    }
}

/// Malformed control-plane payload. Logged and dropped by `handle_netstate`;
/// never propagated to peers or returned from `send`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("control packet payload length {actual} does not match expected {expected}")]
    WrongLength { expected: usize, actual: usize },

    #[error("control packet carries unexpected net state")]
    WrongNetState,
}

/// Transport-facing error returned by a [`crate::channel::Channel`] impl.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ChannelError {
    #[error("channel closed")]
    Closed,

    #[error("channel send failed: {reason}")]
    SendFailed { reason: String },
}
