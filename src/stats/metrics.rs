//! Broadcaster counters
//!
//! Counters live inside the coordination task and are handed out as
//! snapshots, so they never need atomics.

use std::time::{Duration, Instant};

/// Snapshot of broadcaster activity
#[derive(Debug, Clone)]
pub struct BroadcastStats {
    /// When the coordination task started
    pub started_at: Instant,
    /// Messages taken from the input stream
    pub messages_received: u64,
    /// Successful per-subscriber handoffs
    pub deliveries: u64,
    /// Subscriptions ever registered
    pub total_subscriptions: u64,
    /// Subscriptions currently registered
    pub active_subscriptions: u64,
    /// Subscriptions removed because they stalled or dropped their receiver
    pub evicted_subscriptions: u64,
}

impl BroadcastStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            messages_received: 0,
            deliveries: 0,
            total_subscriptions: 0,
            active_subscriptions: 0,
            evicted_subscriptions: 0,
        }
    }

    /// Time since the coordination task started
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Average number of subscribers reached per message
    pub fn fan_out_ratio(&self) -> f64 {
        if self.messages_received > 0 {
            self.deliveries as f64 / self.messages_received as f64
        } else {
            0.0
        }
    }
}

impl Default for BroadcastStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let stats = BroadcastStats::new();
        assert_eq!(stats.messages_received, 0);
        assert_eq!(stats.deliveries, 0);
        assert_eq!(stats.total_subscriptions, 0);
        assert_eq!(stats.active_subscriptions, 0);
        assert_eq!(stats.evicted_subscriptions, 0);
    }

    #[test]
    fn test_fan_out_ratio_zero_messages() {
        let stats = BroadcastStats::new();
        assert_eq!(stats.fan_out_ratio(), 0.0);
    }

    #[test]
    fn test_fan_out_ratio() {
        let mut stats = BroadcastStats::new();
        stats.messages_received = 4;
        stats.deliveries = 10;

        assert_eq!(stats.fan_out_ratio(), 2.5);
    }
}
