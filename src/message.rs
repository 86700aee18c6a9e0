//! Chat message type
//!
//! A message is stamped once when it is accepted and never changes afterwards.

use std::time::SystemTime;

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Client-supplied identifier (e.g. the sender's handle)
    pub id: String,
    /// Message body
    pub text: String,
    /// Server-side acceptance time
    pub timestamp: SystemTime,
}

impl Message {
    /// Create a message stamped with the current time
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_timestamp(id, text, SystemTime::now())
    }

    /// Create a message with an explicit timestamp
    pub fn with_timestamp(
        id: impl Into<String>,
        text: impl Into<String>,
        timestamp: SystemTime,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            timestamp,
        }
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_new_stamps_current_time() {
        let before = SystemTime::now();
        let msg = Message::new("acorn1", "hello");
        let after = SystemTime::now();

        assert_eq!(msg.id, "acorn1");
        assert_eq!(msg.text, "hello");
        assert!(msg.timestamp >= before && msg.timestamp <= after);
    }

    #[test]
    fn test_with_timestamp() {
        let ts = SystemTime::UNIX_EPOCH + Duration::from_secs(42);
        let msg = Message::with_timestamp("a", "b", ts);

        assert_eq!(msg.timestamp, ts);
        assert_eq!(msg.to_string(), "b");
    }
}
