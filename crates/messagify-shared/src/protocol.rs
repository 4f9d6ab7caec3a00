//! Typed change notifications and their decoding at the stream boundary.
//!
//! The gateway bridge forwards every dispatch as `{"type": ..., "data": ...}`.
//! [`ChangeNotification::decode`] is total: anything that does not match one
//! of the known shapes becomes [`ChangeNotification::Malformed`].

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::DecodeError;
use crate::models::{Message, MessagePatch};
use crate::types::{ChannelId, MessageId};

pub const TYPE_MESSAGE_CREATE: &str = "MessageCreate";
pub const TYPE_MESSAGE_UPDATE: &str = "MessageUpdate";
pub const TYPE_MESSAGE_DELETE: &str = "MessageDelete";
pub const TYPE_READY: &str = "Ready";
pub const TYPE_GATEWAY_ERROR: &str = "GatewayError";
pub const TYPE_CONNECTED: &str = "Connected";
pub const TYPE_DISCONNECTED: &str = "Disconnected";

/// Stream lifecycle signals. Logged, never applied to the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleSignal {
    Connected,
    Disconnected,
    Ready,
    Error(String),
}

/// One incremental change delivered by the push stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeNotification {
    Created {
        conversation: ChannelId,
        message: Message,
    },
    Updated {
        conversation: ChannelId,
        message_id: MessageId,
        patch: MessagePatch,
    },
    Deleted {
        conversation: ChannelId,
        message_id: MessageId,
    },
    Lifecycle(LifecycleSignal),
    /// A payload that failed validation. `kind` is the declared type, if any.
    Malformed { kind: String, reason: String },
}

#[derive(Deserialize)]
struct CreateData {
    channel_id: ChannelId,
    #[serde(flatten)]
    message: Message,
}

#[derive(Deserialize)]
struct UpdateData {
    id: MessageId,
    channel_id: ChannelId,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    edited_timestamp: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct DeleteData {
    id: MessageId,
    channel_id: ChannelId,
}

impl ChangeNotification {
    /// Decode a raw payload, mapping every failure to `Malformed`.
    pub fn decode(payload: &Value) -> Self {
        match Self::try_decode(payload) {
            Ok(notification) => notification,
            Err(e) => Self::Malformed {
                kind: payload
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("<none>")
                    .to_string(),
                reason: e.to_string(),
            },
        }
    }

    pub fn try_decode(payload: &Value) -> Result<Self, DecodeError> {
        let kind = payload
            .get("type")
            .and_then(Value::as_str)
            .ok_or(DecodeError::MissingType)?;
        let data = payload.get("data").filter(|d| !d.is_null());

        match kind {
            TYPE_MESSAGE_CREATE => {
                let data: CreateData = parse_data(kind, data)?;
                Ok(Self::Created {
                    conversation: data.channel_id,
                    message: data.message,
                })
            }
            TYPE_MESSAGE_UPDATE => {
                let data: UpdateData = parse_data(kind, data)?;
                Ok(Self::Updated {
                    conversation: data.channel_id,
                    message_id: data.id,
                    patch: MessagePatch {
                        content: data.content,
                        edited_timestamp: data.edited_timestamp,
                    },
                })
            }
            TYPE_MESSAGE_DELETE => {
                let data: DeleteData = parse_data(kind, data)?;
                Ok(Self::Deleted {
                    conversation: data.channel_id,
                    message_id: data.id,
                })
            }
            TYPE_READY => Ok(Self::Lifecycle(LifecycleSignal::Ready)),
            TYPE_CONNECTED => Ok(Self::Lifecycle(LifecycleSignal::Connected)),
            TYPE_DISCONNECTED => Ok(Self::Lifecycle(LifecycleSignal::Disconnected)),
            TYPE_GATEWAY_ERROR => {
                let reason = match data {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => "unknown gateway error".to_string(),
                };
                Ok(Self::Lifecycle(LifecycleSignal::Error(reason)))
            }
            other => Err(DecodeError::UnknownType(other.to_string())),
        }
    }

    /// The conversation a message event targets.
    pub fn conversation(&self) -> Option<&ChannelId> {
        match self {
            Self::Created { conversation, .. }
            | Self::Updated { conversation, .. }
            | Self::Deleted { conversation, .. } => Some(conversation),
            Self::Lifecycle(_) | Self::Malformed { .. } => None,
        }
    }
}

fn parse_data<T: for<'de> Deserialize<'de>>(
    kind: &str,
    data: Option<&Value>,
) -> Result<T, DecodeError> {
    let data = data.ok_or_else(|| DecodeError::MissingData(kind.to_string()))?;
    T::deserialize(data).map_err(|e| DecodeError::InvalidPayload {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}
