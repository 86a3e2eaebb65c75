//! Core identifier types for domain entities.
//!
//! These newtype wrappers keep sender addresses and provider message ids from
//! being mixed up with the many other strings that flow through a run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Email address of a newsletter sender whose messages are scanned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sender(pub String);

impl Sender {
    /// Returns the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Sender {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Sender {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Opaque message identifier assigned by the mail provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_display_and_equality() {
        let a = Sender::from("news@example.com");
        let b = Sender("news@example.com".to_string());
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "news@example.com");
        assert_eq!(a.as_str(), "news@example.com");
    }

    #[test]
    fn sender_serializes_as_plain_string() {
        let sender = Sender::from("a@x.com");
        let json = serde_json::to_string(&sender).unwrap();
        assert_eq!(json, "\"a@x.com\"");

        let back: Sender = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sender);
    }

    #[test]
    fn message_id_from_owned_string() {
        let id = MessageId::from("18c2f0a1b2".to_string());
        assert_eq!(id.0, "18c2f0a1b2");
        assert_eq!(format!("{}", id), "18c2f0a1b2");
    }
}
