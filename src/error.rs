//! Error types
//!
//! Errors surfaced by the broadcaster and the chat service.

/// Error type for hub operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The broadcaster has shut down
    Closed,
    /// A post carried no text
    EmptyMessage,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Closed => write!(f, "Broadcaster is closed"),
            Error::EmptyMessage => write!(f, "Message text is empty"),
        }
    }
}

impl std::error::Error for Error {}

/// Result alias for hub operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Error::Closed.to_string(), "Broadcaster is closed");
        assert_eq!(Error::EmptyMessage.to_string(), "Message text is empty");
    }
}
