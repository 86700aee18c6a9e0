//! Server-sent event encoding
//!
//! Formats messages for a `text/event-stream` response. The broadcaster never
//! formats anything itself; relays call into this module per message.

use bytes::{BufMut, Bytes, BytesMut};

use crate::message::Message;

/// Event name used for chat messages
pub const NEW_MESSAGES_EVENT: &str = "new-messages";

/// `Content-Type` of an event stream
pub const CONTENT_TYPE: &str = "text/event-stream";

/// A single server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event name (`event:` field), if any
    pub event: Option<String>,
    /// Payload; each line becomes its own `data:` field
    pub data: String,
}

impl SseEvent {
    /// Create a named event
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
            data: data.into(),
        }
    }

    /// Create an unnamed event (dispatched as `message` by browsers)
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            event: None,
            data: data.into(),
        }
    }

    /// Chat message event: the text under the `new-messages` name
    pub fn from_message(message: &Message) -> Self {
        Self::new(NEW_MESSAGES_EVENT, message.text.clone())
    }

    /// Encode to wire format, terminated by a blank line
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.data.len() + 32);

        if let Some(ref event) = self.event {
            buf.put_slice(b"event: ");
            buf.put_slice(event.as_bytes());
            buf.put_u8(b'\n');
        }

        for line in self.data.split('\n') {
            buf.put_slice(b"data: ");
            buf.put_slice(line.trim_end_matches('\r').as_bytes());
            buf.put_u8(b'\n');
        }

        buf.put_u8(b'\n');
        buf.freeze()
    }
}

/// A comment line, ignored by clients; keeps idle connections open
pub fn keep_alive() -> Bytes {
    Bytes::from_static(b": keep-alive\n\n")
}
