//! Recent message history for late joiners
//!
//! A client that connects after the conversation started first receives the
//! tail, then the live stream. The tail is bounded; the oldest message is
//! evicted when a new one arrives at capacity.

use std::collections::VecDeque;

use crate::message::Message;

/// Default number of messages kept for replay
pub const DEFAULT_TAIL_CAPACITY: usize = 10;

/// Bounded, ordered buffer of the most recent messages
#[derive(Debug, Clone)]
pub struct MessageTail {
    capacity: usize,
    messages: VecDeque<Message>,
}

impl MessageTail {
    /// Create a tail with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TAIL_CAPACITY)
    }

    /// Create a tail holding at most `capacity` messages
    ///
    /// A zero capacity keeps nothing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            messages: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a message, evicting the oldest when full
    ///
    /// Returns the evicted message, if any.
    pub fn push(&mut self, message: Message) -> Option<Message> {
        if self.capacity == 0 {
            return Some(message);
        }

        let evicted = if self.messages.len() == self.capacity {
            self.messages.pop_front()
        } else {
            None
        };
        self.messages.push_back(message);
        evicted
    }

    /// The last `count` messages, oldest first
    pub fn recent(&self, count: usize) -> Vec<Message> {
        let skip = self.messages.len().saturating_sub(count);
        self.messages.iter().skip(skip).cloned().collect()
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl Default for MessageTail {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tail: &MessageTail) -> Vec<String> {
        tail.iter().map(|m| m.text.clone()).collect()
    }

    #[test]
    fn test_push_within_capacity() {
        let mut tail = MessageTail::with_capacity(3);
        assert!(tail.is_empty());

        assert!(tail.push(Message::new("a", "one")).is_none());
        assert!(tail.push(Message::new("a", "two")).is_none());

        assert_eq!(tail.len(), 2);
        assert_eq!(texts(&tail), vec!["one", "two"]);
    }

    #[test]
    fn test_oldest_evicted_first() {
        let mut tail = MessageTail::with_capacity(2);
        tail.push(Message::new("a", "one"));
        tail.push(Message::new("a", "two"));

        let evicted = tail.push(Message::new("a", "three")).unwrap();

        assert_eq!(evicted.text, "one");
        assert_eq!(tail.len(), 2);
        assert_eq!(texts(&tail), vec!["two", "three"]);
    }

    #[test]
    fn test_recent() {
        let mut tail = MessageTail::new();
        for n in 0..15 {
            tail.push(Message::new("a", n.to_string()));
        }

        assert_eq!(tail.len(), DEFAULT_TAIL_CAPACITY);

        let last: Vec<String> = tail.recent(3).into_iter().map(|m| m.text).collect();
        assert_eq!(last, vec!["12", "13", "14"]);

        // Asking for more than is stored returns everything
        assert_eq!(tail.recent(100).len(), DEFAULT_TAIL_CAPACITY);
        assert_eq!(tail.recent(100)[0].text, "5");
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut tail = MessageTail::with_capacity(0);
        let rejected = tail.push(Message::new("a", "dropped"));

        assert_eq!(rejected.unwrap().text, "dropped");
        assert!(tail.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut tail = MessageTail::with_capacity(4);
        tail.push(Message::new("a", "x"));
        tail.clear();

        assert!(tail.is_empty());
        assert_eq!(tail.capacity(), 4);
    }
}
