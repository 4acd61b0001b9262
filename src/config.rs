//! Router tunables. Mirrors the builder-style config objects used
//! elsewhere in the stack: a plain struct, `set_*` mutators, and a
//! `Default` impl spelling out the same constants rather than deriving
//! them.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    self_addr: u16,
    route_expiry: Option<Duration>,
    context_id_min: u16,
    context_id_max: u16,
    channel_send_queue_hint: usize,
}

impl RouterConfig {
    pub fn new(self_addr: u16) -> Self {
        Self {
            self_addr,
            route_expiry: None,
            context_id_min: 2,
            context_id_max: 65535,
            channel_send_queue_hint: 64,
        }
    }

    pub fn set_route_expiry(&mut self, expiry: Option<Duration>) {
        self.route_expiry = expiry;
    }

    pub fn set_context_id_range(&mut self, min: u16, max: u16) {
        assert!(min >= 2, "context ids below 2 collide with reserved values");
        assert!(min <= max, "context id range must be non-empty");
        self.context_id_min = min;
        self.context_id_max = max;
    }

    pub fn set_channel_send_queue_hint(&mut self, hint: usize) {
        self.channel_send_queue_hint = hint;
    }

    pub fn self_addr(&self) -> u16 {
        self.self_addr
    }

    pub fn route_expiry(&self) -> Option<Duration> {
        self.route_expiry
    }

    pub fn context_id_range(&self) -> (u16, u16) {
        (self.context_id_min, self.context_id_max)
    }

    pub fn channel_send_queue_hint(&self) -> usize {
        self.channel_send_queue_hint
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            self_addr: crate::packet::UNSET,
            route_expiry: None,
            context_id_min: 2,
            context_id_max: 65535,
            channel_send_queue_hint: 64,
        }
    }
}
