//! Chat messages and sender identity.
//!
//! The class owner always writes as the literal sender id `"teacher"`;
//! every viewer device generates one random id and keeps it for the life
//! of its local store, so a viewer's own messages stay recognizable across
//! reloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sender id reserved for the class owner.
pub const TEACHER_SENDER_ID: &str = "teacher";

/// Identity a chat message is written under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SenderId(String);

impl SenderId {
    /// The owner identity.
    pub fn teacher() -> Self {
        Self(TEACHER_SENDER_ID.to_string())
    }

    /// A fresh viewer identity.  Generated once per device and persisted.
    pub fn new_viewer() -> Self {
        Self(format!("viewer_{}", Uuid::new_v4().simple()))
    }

    pub fn is_teacher(&self) -> bool {
        self.0 == TEACHER_SENDER_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SenderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for SenderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a message carries.  Image and file messages hold their payload as
/// a data URL in `file_url`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    File,
}

/// One chat message.  Immutable once created; deleting removes it from the
/// registry entry entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub sender_id: SenderId,
    pub sender_name: String,
    pub content: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl ChatMessage {
    /// Build a text message stamped `now`.  The id is the millisecond
    /// timestamp plus a random suffix, so two devices sending in the same
    /// millisecond still get distinct ids.
    pub fn text(sender_id: SenderId, sender_name: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Self::fresh_id(now),
            sender_id,
            sender_name: sender_name.into(),
            content: content.into(),
            timestamp: now,
            kind: MessageKind::Text,
            file_url: None,
            file_name: None,
        }
    }

    /// Build an image or file message carrying an inline data URL.
    pub fn attachment(
        sender_id: SenderId,
        sender_name: impl Into<String>,
        kind: MessageKind,
        file_url: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Self::fresh_id(now),
            sender_id,
            sender_name: sender_name.into(),
            content: String::new(),
            timestamp: now,
            kind,
            file_url: Some(file_url.into()),
            file_name: Some(file_name.into()),
        }
    }

    fn fresh_id(now: DateTime<Utc>) -> String {
        let suffix: u16 = rand::random();
        format!("{}-{:04x}", now.timestamp_millis(), suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teacher_id_is_the_literal() {
        assert_eq!(SenderId::teacher().as_str(), "teacher");
        assert!(SenderId::teacher().is_teacher());
    }

    #[test]
    fn viewer_ids_are_distinct() {
        let a = SenderId::new_viewer();
        let b = SenderId::new_viewer();
        assert_ne!(a, b);
        assert!(!a.is_teacher());
        assert!(a.as_str().starts_with("viewer_"));
    }

    #[test]
    fn message_ids_are_distinct_within_a_millisecond() {
        let a = ChatMessage::text(SenderId::teacher(), "Teacher", "hi");
        let b = ChatMessage::text(SenderId::teacher(), "Teacher", "hi");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn wire_shape_matches_web_clients() {
        let msg = ChatMessage {
            id: "1700000000000-00ff".to_string(),
            sender_id: SenderId::teacher(),
            sender_name: "Teacher".to_string(),
            content: "hello".to_string(),
            timestamp: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
            kind: MessageKind::Text,
            file_url: None,
            file_name: None,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["senderId"], "teacher");
        assert_eq!(json["type"], "text");
        assert_eq!(json["timestamp"], 1_700_000_000_000_i64);
        assert!(json.get("fileUrl").is_none());
    }
}
