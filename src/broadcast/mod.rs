//! Message fan-out to dynamic subscribers
//!
//! A single coordination task owns the subscriber set. Subscribe and cancel
//! requests travel over a command channel, messages arrive on the input
//! channel, and the task serializes both, so the set is never shared and
//! never locked.
//!
//! # Architecture
//!
//! ```text
//!   [Producer]                 coordination task                 [Consumer]
//!   input.send() ──► source ──┐ ┌──────────────────────┐ ┌──► sub.recv() ──► SSE
//!                             ├─► subscribers:          ├─┤
//!   broadcaster.subscribe() ──┤ │   HashMap<Id, Sender> │ └──► sub.recv() ──► SSE
//!   broadcaster.cancel(id) ───┘ └──────────────────────┘
//!                                 ▲
//!                     CancellationToken (shutdown)
//! ```
//!
//! # Backpressure
//!
//! Each handoff waits for the subscriber to accept the message, so one slow
//! consumer delays delivery to the rest until it catches up, is cancelled,
//! or exceeds `BroadcastConfig::send_timeout` when one is configured. Every
//! handoff also watches the shutdown token, so a stalled consumer never
//! blocks shutdown.
//!
//! While a handoff is stalled, `cancel` and `stats` are still answered, but
//! `subscribe`, `subscribe_with_history` and `history` wait until the fan-out
//! completes and the input is drained.

pub mod config;
pub mod hub;
pub mod subscription;

pub use config::BroadcastConfig;
pub use hub::Broadcaster;
pub use subscription::{Subscription, SubscriptionId, SubscriptionState};
