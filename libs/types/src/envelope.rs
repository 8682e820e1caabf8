//! Message Envelopes
//!
//! Every user message travels inside a [`MessageEnvelope`]: the payload as a
//! dynamically-typed [`DynMessage`], an optional sender pid for replies, and
//! an optional ordered header bag. Envelopes are cheap to clone; the payload
//! is shared behind an `Arc`.

use crate::pid::Pid;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Dynamically-typed message payload carried by mailboxes and envelopes.
pub type DynMessage = Arc<dyn Any + Send + Sync>;

/// Wrap a concrete value as a [`DynMessage`].
pub fn message<T: Send + Sync + 'static>(value: T) -> DynMessage {
    Arc::new(value)
}

/// Borrow the payload as a concrete type, if it is one.
pub fn downcast_message<T: Send + Sync + 'static>(message: &DynMessage) -> Option<&T> {
    message.downcast_ref::<T>()
}

/// Ordered string key/value bag attached to an envelope.
///
/// Receivers treat an empty header and an absent header equivalently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    entries: BTreeMap<String, String>,
}

impl MessageHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Merge another header into this one; the other side wins on conflicts.
    pub fn merge(&mut self, other: &MessageHeader) {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), v.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for MessageHeader {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// The unit of delivery the receiving actor observes.
#[derive(Clone)]
pub struct MessageEnvelope {
    pub message: DynMessage,
    pub sender: Option<Pid>,
    pub header: Option<MessageHeader>,
}

impl MessageEnvelope {
    pub fn new(message: DynMessage) -> Self {
        Self {
            message,
            sender: None,
            header: None,
        }
    }

    /// Wrap a concrete value directly.
    pub fn wrap<T: Send + Sync + 'static>(value: T) -> Self {
        Self::new(Arc::new(value))
    }

    pub fn with_sender(mut self, sender: Pid) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn with_header(mut self, header: MessageHeader) -> Self {
        self.header = Some(header);
        self
    }

    pub fn sender(&self) -> Option<&Pid> {
        self.sender.as_ref()
    }

    /// Header lookup that treats a missing header as empty.
    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.header.as_ref().and_then(|h| h.get(key))
    }

    /// Borrow the payload as a concrete type, if it is one.
    pub fn message_as<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.message.downcast_ref::<T>()
    }
}

impl fmt::Debug for MessageEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageEnvelope")
            .field("message_type", &self.message.as_ref().type_id())
            .field("sender", &self.sender)
            .field("header", &self.header)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downcast_round_trip() {
        let env = MessageEnvelope::wrap("ping".to_string());
        assert_eq!(env.message_as::<String>().unwrap(), "ping");
        assert!(env.message_as::<u64>().is_none());
    }

    #[test]
    fn header_absent_and_empty_read_the_same() {
        let bare = MessageEnvelope::wrap(1u32);
        let empty = MessageEnvelope::wrap(1u32).with_header(MessageHeader::new());

        assert_eq!(bare.header_value("trace-id"), None);
        assert_eq!(empty.header_value("trace-id"), None);
    }

    #[test]
    fn header_merge_prefers_incoming_values() {
        let mut base = MessageHeader::new().with("a", "1").with("b", "2");
        let other = MessageHeader::new().with("b", "3").with("c", "4");
        base.merge(&other);

        assert_eq!(base.get("a"), Some("1"));
        assert_eq!(base.get("b"), Some("3"));
        assert_eq!(base.get("c"), Some("4"));
        assert_eq!(base.len(), 3);
    }
}
