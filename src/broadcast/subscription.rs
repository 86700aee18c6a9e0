//! Subscription handle and state
//!
//! The broadcaster keeps the write side of every subscription; the consumer
//! holds the read side here and uses its id to request cancellation.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::message::Message;

/// Unique identifier of a subscription, never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(super) u64);

impl SubscriptionId {
    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Lifecycle of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Registered, may receive messages
    Active,
    /// End of stream observed (cancelled or broadcaster shut down)
    Closed,
}

/// Read side of one consumer's output stream
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    rx: mpsc::Receiver<Message>,
    state: SubscriptionState,
}

impl Subscription {
    pub(super) fn new(id: SubscriptionId, rx: mpsc::Receiver<Message>) -> Self {
        Self {
            id,
            rx,
            state: SubscriptionState::Active,
        }
    }

    /// Identifier to pass to `Broadcaster::cancel`
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Current state as observed by this consumer
    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    /// Wait for the next message
    ///
    /// Returns `None` once the subscription has been cancelled or the
    /// broadcaster has shut down and every buffered message was consumed.
    pub async fn recv(&mut self) -> Option<Message> {
        let msg = self.rx.recv().await;
        if msg.is_none() {
            self.state = SubscriptionState::Closed;
        }
        msg
    }

    /// Take a buffered message without waiting
    ///
    /// `Ok(None)` means nothing is buffered yet; `Err(Closed)` means end of stream.
    pub fn try_recv(&mut self) -> crate::error::Result<Option<Message>> {
        match self.rx.try_recv() {
            Ok(msg) => Ok(Some(msg)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                self.state = SubscriptionState::Closed;
                Err(crate::error::Error::Closed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn test_state_transitions_on_end_of_stream() {
        let (tx, rx) = mpsc::channel(1);
        let mut sub = Subscription::new(SubscriptionId(7), rx);

        assert_eq!(sub.id().as_u64(), 7);
        assert_eq!(sub.state(), SubscriptionState::Active);

        tx.send(Message::new("a", "one")).await.unwrap();
        drop(tx);

        assert_eq!(sub.recv().await.unwrap().text, "one");
        assert_eq!(sub.state(), SubscriptionState::Active);

        assert!(sub.recv().await.is_none());
        assert_eq!(sub.state(), SubscriptionState::Closed);
    }

    #[test]
    fn test_try_recv() {
        let (tx, rx) = mpsc::channel(1);
        let mut sub = Subscription::new(SubscriptionId(1), rx);

        assert_eq!(sub.try_recv(), Ok(None));

        tx.try_send(Message::new("a", "x")).unwrap();
        assert_eq!(sub.try_recv().unwrap().unwrap().text, "x");

        drop(tx);
        assert_eq!(sub.try_recv(), Err(Error::Closed));
        assert_eq!(sub.state(), SubscriptionState::Closed);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(SubscriptionId(3).to_string(), "sub-3");
    }
}
