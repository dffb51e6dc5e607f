use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Opaque handle to an avatar or image asset.
///
/// The inbox never interprets the value. Whatever renders a row resolves it
/// through its own resource loader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceRef(pub i64);

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res#{}", self.0)
    }
}

/// What a message carries besides its text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageKind {
    /// Plain or system text
    #[default]
    Text,
    /// Text plus an attached image
    Image,
    /// Promotional message with an action button
    Cta,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Image => "IMAGE",
            Self::Cta => "CTA",
        }
    }

    /// Parse a persisted kind name. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "TEXT" => Some(Self::Text),
            "IMAGE" => Some(Self::Image),
            "CTA" => Some(Self::Cta),
            _ => None,
        }
    }
}

/// A single inbox entry.
///
/// Field names on the wire follow the persisted JSON payload stored in the
/// `messages` table, so this type doubles as the storage format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub user_name: String,
    pub content: String,
    /// Display-formatted timestamp, e.g. `2024-05-01 09:30:00`
    pub timestamp: String,
    #[serde(default)]
    pub is_unread: bool,
    #[serde(rename = "avatarResId", default)]
    pub avatar: ResourceRef,
    #[serde(rename = "type", default, deserialize_with = "lenient_kind")]
    pub kind: MessageKind,
    #[serde(rename = "imageResId", default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_millis: Option<i64>,
}

impl Message {
    /// Plain text message with no attachments.
    pub fn text(
        user_name: impl Into<String>,
        content: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            user_name: user_name.into(),
            content: content.into(),
            timestamp: timestamp.into(),
            is_unread: false,
            avatar: ResourceRef::default(),
            kind: MessageKind::Text,
            image: None,
            button_text: None,
            timestamp_millis: None,
        }
    }

    /// Identity used when reconciling displayed lists.
    pub fn key(&self) -> MessageKey {
        MessageKey {
            user_name: self.user_name.clone(),
            content: self.content.clone(),
            timestamp: self.timestamp.clone(),
        }
    }

    /// Whether `other` refers to the same stored message.
    ///
    /// Millisecond timestamps win when both sides carry one; otherwise the
    /// display strings are compared.
    pub fn same_entry(&self, other: &Message) -> bool {
        let same_time = match (self.timestamp_millis, other.timestamp_millis) {
            (Some(a), Some(b)) => a == b,
            _ => self.timestamp == other.timestamp,
        };
        self.user_name == other.user_name && self.content == other.content && same_time
    }
}

impl AsRef<Message> for Message {
    fn as_ref(&self) -> &Message {
        self
    }
}

/// `(user_name, content, timestamp)` identity of a message.
///
/// Two distinct messages sharing all three fields are indistinguishable
/// under this key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageKey {
    pub user_name: String,
    pub content: String,
    pub timestamp: String,
}

/// A message as read back from the store, with its row id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: i64,
    pub message: Message,
}

impl AsRef<Message> for StoredMessage {
    fn as_ref(&self) -> &Message {
        &self.message
    }
}

/// Per-sender display-name override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remark {
    pub user_name: String,
    pub remark: String,
}

/// Missing, null and unrecognised kind names all fall back to `Text`.
fn lenient_kind<'de, D>(deserializer: D) -> Result<MessageKind, D::Error>
where
    D: Deserializer<'de>,
{
    let name: Option<String> = Option::deserialize(deserializer)?;
    Ok(name
        .as_deref()
        .and_then(MessageKind::from_name)
        .unwrap_or_default())
}
