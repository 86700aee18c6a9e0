//! Real-time chat broadcast hub
//!
//! One input stream of chat messages is fanned out to any number of
//! subscribers that attach and detach at will. Every subscriber receives the
//! messages published while it is attached, in publish order.
//!
//! - [`broadcast`]: the broadcaster and its coordination loop
//! - [`chat`]: posting, history replay and connection helpers
//! - [`sse`]: server-sent event encoding for relays
//! - [`tail`]: bounded recent-message buffer
//!
//! # Example
//! ```no_run
//! use chat_hub::{ChatConfig, ChatService};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> chat_hub::Result<()> {
//! let chat = ChatService::new(ChatConfig::default(), CancellationToken::new());
//!
//! let (history, mut sub) = chat.connect().await?;
//! chat.post("acorn1", "hello").await?;
//!
//! assert!(history.is_empty());
//! assert_eq!(sub.recv().await.map(|m| m.text), Some("hello".to_string()));
//! # Ok(())
//! # }
//! ```

pub mod broadcast;
pub mod chat;
pub mod error;
pub mod message;
pub mod sse;
pub mod stats;
pub mod tail;

pub use broadcast::{BroadcastConfig, Broadcaster, Subscription, SubscriptionId, SubscriptionState};
pub use chat::{ChatConfig, ChatService};
pub use error::{Error, Result};
pub use message::Message;
pub use sse::SseEvent;
pub use stats::BroadcastStats;
pub use tail::MessageTail;
