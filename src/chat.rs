//! Chat service
//!
//! Owns the input side of the broadcaster. Handlers that accept posts call
//! `post`, handlers that stream events call `connect`, and both share one
//! cloned `ChatService` instead of process-wide state.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::broadcast::{BroadcastConfig, Broadcaster, Subscription, SubscriptionId};
use crate::error::{Error, Result};
use crate::message::Message;

/// Chat service configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Broadcaster settings
    pub broadcast: BroadcastConfig,

    /// Posts that may queue ahead of the coordination loop
    pub input_capacity: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            broadcast: BroadcastConfig::default(),
            input_capacity: 16,
        }
    }
}

impl ChatConfig {
    /// Set the broadcaster configuration
    pub fn broadcast(mut self, config: BroadcastConfig) -> Self {
        self.broadcast = config;
        self
    }

    /// Set the input queue capacity
    pub fn input_capacity(mut self, capacity: usize) -> Self {
        self.input_capacity = capacity.max(1);
        self
    }
}

/// Entry point for posting and following a chat
#[derive(Debug, Clone)]
pub struct ChatService {
    input: mpsc::Sender<Message>,
    broadcaster: Broadcaster,
    shutdown: CancellationToken,
}

impl ChatService {
    /// Start a chat service bound to `shutdown`
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: ChatConfig, shutdown: CancellationToken) -> Self {
        let (input, source) = mpsc::channel(config.input_capacity.max(1));
        let broadcaster = Broadcaster::with_config(config.broadcast, source, shutdown.clone());

        Self {
            input,
            broadcaster,
            shutdown,
        }
    }

    /// Stamp and publish a message
    ///
    /// Waits while the input queue is full. Returns the stamped message.
    pub async fn post(&self, id: impl Into<String>, text: impl Into<String>) -> Result<Message> {
        if self.shutdown.is_cancelled() {
            return Err(Error::Closed);
        }

        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::EmptyMessage);
        }

        let message = Message::new(id, text);
        self.input
            .send(message.clone())
            .await
            .map_err(|_| Error::Closed)?;

        tracing::debug!(id = %message.id, len = message.text.len(), "Message posted");
        Ok(message)
    }

    /// Recent messages, oldest first
    pub async fn history(&self) -> Result<Vec<Message>> {
        self.broadcaster.history().await
    }

    /// Follow the chat: recent history followed by a live subscription
    pub async fn connect(&self) -> Result<(Vec<Message>, Subscription)> {
        self.broadcaster.subscribe_with_history().await
    }

    /// Stop following the chat
    pub async fn disconnect(&self, id: SubscriptionId) -> Result<()> {
        self.broadcaster.cancel(id).await
    }

    /// The underlying broadcaster
    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Shut down the broadcaster and close every subscription
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    const WAIT: Duration = Duration::from_secs(5);

    fn service() -> ChatService {
        ChatService::new(ChatConfig::default(), CancellationToken::new())
    }

    async fn next(sub: &mut Subscription) -> Option<Message> {
        tokio::time::timeout(WAIT, sub.recv()).await.unwrap()
    }

    #[test]
    fn test_config_builder() {
        let config = ChatConfig::default()
            .input_capacity(0)
            .broadcast(BroadcastConfig::default().tail_capacity(3));

        assert_eq!(config.input_capacity, 1);
        assert_eq!(config.broadcast.tail_capacity, 3);
    }

    #[tokio::test]
    async fn test_post_reaches_connected_client() {
        let chat = service();
        let (history, mut sub) = chat.connect().await.unwrap();
        assert!(history.is_empty());

        let posted = chat.post("acorn1", "hello").await.unwrap();
        let received = next(&mut sub).await.unwrap();

        assert_eq!(received, posted);
        assert_eq!(received.id, "acorn1");
    }

    #[tokio::test]
    async fn test_late_subscriber_starts_after_earlier_post() {
        let chat = service();

        chat.post("a", "before attach").await.unwrap();
        let mut sub = chat.broadcaster().subscribe().await.unwrap();
        chat.post("b", "after attach").await.unwrap();

        assert_eq!(next(&mut sub).await.unwrap().text, "after attach");
    }

    #[tokio::test]
    async fn test_zero_input_capacity_in_literal_config() {
        let config = ChatConfig {
            input_capacity: 0,
            ..Default::default()
        };
        let chat = ChatService::new(config, CancellationToken::new());
        let (_, mut sub) = chat.connect().await.unwrap();

        chat.post("a", "fits").await.unwrap();
        assert_eq!(next(&mut sub).await.unwrap().text, "fits");
    }

    #[tokio::test]
    async fn test_empty_post_rejected() {
        let chat = service();

        assert_eq!(chat.post("acorn1", "   ").await, Err(Error::EmptyMessage));
        assert!(chat.history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_late_joiner_gets_history_then_live() {
        let chat = service();
        let (_, mut first) = chat.connect().await.unwrap();

        chat.post("a", "one").await.unwrap();
        chat.post("b", "two").await.unwrap();
        next(&mut first).await.unwrap();
        next(&mut first).await.unwrap();

        let (history, mut late) = chat.connect().await.unwrap();
        let texts: Vec<&str> = history.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two"]);

        chat.post("c", "three").await.unwrap();
        assert_eq!(next(&mut late).await.unwrap().text, "three");
        assert_eq!(next(&mut first).await.unwrap().text, "three");
    }

    #[tokio::test]
    async fn test_disconnect_closes_stream() {
        let chat = service();
        let (_, mut sub) = chat.connect().await.unwrap();

        chat.disconnect(sub.id()).await.unwrap();
        assert!(next(&mut sub).await.is_none());
    }

    #[tokio::test]
    async fn test_post_after_shutdown() {
        let chat = service();
        let (_, mut sub) = chat.connect().await.unwrap();

        chat.shutdown();

        assert!(next(&mut sub).await.is_none());
        assert_eq!(chat.post("a", "too late").await, Err(Error::Closed));
        assert!(matches!(chat.connect().await, Err(Error::Closed)));

        tokio::time::timeout(WAIT, chat.broadcaster().closed())
            .await
            .unwrap();
    }
}
