//! Broadcaster configuration

use std::time::Duration;

use crate::tail::DEFAULT_TAIL_CAPACITY;

/// Broadcaster configuration options
#[derive(Debug, Clone)]
pub struct BroadcastConfig {
    /// Capacity of the control request channel (subscribe/cancel/stats)
    pub command_capacity: usize,

    /// Per-subscription output buffer. 1 makes each delivery a handoff.
    pub subscriber_capacity: usize,

    /// Disconnect a subscriber that does not accept a message within this
    /// window. `None` blocks fan-out until the subscriber catches up.
    pub send_timeout: Option<Duration>,

    /// Number of recent messages kept for replay to late joiners
    pub tail_capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            command_capacity: 64,
            subscriber_capacity: 1,
            send_timeout: None,
            tail_capacity: DEFAULT_TAIL_CAPACITY,
        }
    }
}

impl BroadcastConfig {
    /// Set the control request channel capacity
    pub fn command_capacity(mut self, capacity: usize) -> Self {
        self.command_capacity = capacity.max(1);
        self
    }

    /// Set the per-subscription buffer size
    pub fn subscriber_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_capacity = capacity.max(1);
        self
    }

    /// Evict subscribers that stall longer than `timeout`
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = Some(timeout);
        self
    }

    /// Set how many recent messages are replayed to late joiners
    pub fn tail_capacity(mut self, capacity: usize) -> Self {
        self.tail_capacity = capacity;
        self
    }

    /// Keep no history
    pub fn disable_tail(self) -> Self {
        self.tail_capacity(0)
    }
}
