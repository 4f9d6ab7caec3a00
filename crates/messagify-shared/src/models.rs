//! Domain models exchanged with the remote source.
//!
//! Field names follow the REST/gateway JSON so every struct can be decoded
//! straight from a response body. Unknown fields are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{CDN_BASE_URL, UNKNOWN_DM_LABEL};
use crate::types::{ChannelId, ChannelKind, GroupId, MessageId};

// ---------------------------------------------------------------------------
// Author
// ---------------------------------------------------------------------------

/// The user who wrote a message, or a DM recipient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    pub id: String,
    pub username: String,
    /// Display name, when the user has set one.
    #[serde(default)]
    pub global_name: Option<String>,
    /// Avatar hash.
    #[serde(default)]
    pub avatar: Option<String>,
}

impl Author {
    /// Name to show in the UI: the global name, falling back to the username.
    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.username)
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message.
///
/// Only `content` and `edited_timestamp` change after creation, through a
/// [`MessagePatch`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    #[serde(default)]
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub edited_timestamp: Option<DateTime<Utc>>,
    pub author: Author,
}

impl Message {
    /// Merge the fields present in `patch`. Returns `true` if anything changed.
    pub fn apply_patch(&mut self, patch: &MessagePatch) -> bool {
        let mut changed = false;
        if let Some(content) = &patch.content {
            if *content != self.content {
                self.content = content.clone();
                changed = true;
            }
        }
        if let Some(edited) = patch.edited_timestamp {
            if self.edited_timestamp != Some(edited) {
                self.edited_timestamp = Some(edited);
                changed = true;
            }
        }
        changed
    }

    pub fn is_edited(&self) -> bool {
        self.edited_timestamp.is_some()
    }
}

/// Partial update for a [`Message`]. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessagePatch {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub edited_timestamp: Option<DateTime<Utc>>,
}

impl MessagePatch {
    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.edited_timestamp.is_none()
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// An addressable item of a channel list: a category or a leaf conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    pub id: ChannelId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ChannelKind,
    /// Sort position within its bucket. Absent for DMs.
    #[serde(default)]
    pub position: i64,
    /// Owning category; `None` means top level.
    #[serde(default)]
    pub parent_id: Option<ChannelId>,
}

impl Channel {
    pub fn is_category(&self) -> bool {
        self.kind.is_category()
    }
}

/// A direct-message channel as listed by `GET /users/@me/channels`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DmChannel {
    pub id: ChannelId,
    #[serde(rename = "type")]
    pub kind: ChannelKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub last_message_id: Option<MessageId>,
    #[serde(default)]
    pub recipients: Vec<Author>,
}

impl DmChannel {
    /// Explicit name, else the recipients' display names, else a placeholder.
    pub fn label(&self) -> String {
        if let Some(name) = self.name.as_deref().map(str::trim) {
            if !name.is_empty() {
                return name.to_string();
            }
        }

        let from_recipients = self
            .recipients
            .iter()
            .map(Author::display_name)
            .filter(|n| !n.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        let from_recipients = from_recipients.trim();
        if !from_recipients.is_empty() {
            return from_recipients.to_string();
        }

        UNKNOWN_DM_LABEL.to_string()
    }
}

impl From<DmChannel> for Channel {
    fn from(dm: DmChannel) -> Self {
        let name = dm.label();
        Self {
            id: dm.id,
            name,
            kind: dm.kind,
            position: 0,
            parent_id: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Guild
// ---------------------------------------------------------------------------

/// A group of channels (a Discord guild).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Guild {
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
}

impl Guild {
    pub fn icon_url(&self) -> Option<String> {
        self.icon
            .as_ref()
            .map(|icon| format!("{CDN_BASE_URL}/icons/{}/{icon}.png?size=64", self.id))
    }
}
