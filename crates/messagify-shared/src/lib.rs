//! Types shared by every Messagify crate: identifiers, domain models, and the
//! typed change notifications decoded from the push stream.

pub mod constants;
pub mod error;
pub mod models;
pub mod protocol;
pub mod types;

pub use error::DecodeError;
pub use models::{Author, Channel, DmChannel, Guild, Message, MessagePatch};
pub use protocol::{ChangeNotification, LifecycleSignal};
pub use types::{ChannelId, ChannelKind, GroupId, MessageId, StreamStatus};
