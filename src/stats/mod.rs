//! Statistics for the broadcaster

pub mod metrics;

pub use metrics::BroadcastStats;
