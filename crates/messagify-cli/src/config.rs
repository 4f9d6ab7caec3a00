//! CLI configuration loaded from environment variables.
//!
//! Everything except the token has a default.

use messagify_shared::constants::{DEFAULT_API_BASE, DEFAULT_MESSAGE_LIMIT};
use messagify_shared::{ChannelId, GroupId};

#[derive(Clone)]
pub struct CliConfig {
    /// Authorization token, sent verbatim.
    /// Env: `MESSAGIFY_TOKEN`
    pub token: Option<String>,

    /// Env: `MESSAGIFY_API_BASE`
    /// Default: `https://discord.com/api/v10`
    pub api_base: String,

    /// Messages per conversation snapshot.
    /// Env: `MESSAGIFY_MESSAGE_LIMIT`
    /// Default: `50`
    pub message_limit: u32,

    /// Group whose channels to list. DMs when unset.
    /// Env: `MESSAGIFY_GROUP_ID`
    pub group_id: Option<GroupId>,

    /// Conversation to open after listing.
    /// Env: `MESSAGIFY_CONVERSATION_ID`
    pub conversation_id: Option<ChannelId>,

    /// Read notifications from stdin after the initial load.
    /// Env: `MESSAGIFY_FOLLOW` (true/false)
    /// Default: `false`
    pub follow: bool,
}

impl std::fmt::Debug for CliConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("message_limit", &self.message_limit)
            .field("group_id", &self.group_id)
            .field("conversation_id", &self.conversation_id)
            .field("follow", &self.follow)
            .finish()
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: DEFAULT_API_BASE.to_string(),
            message_limit: DEFAULT_MESSAGE_LIMIT,
            group_id: None,
            conversation_id: None,
            follow: false,
        }
    }
}

impl CliConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        config.token = non_empty("MESSAGIFY_TOKEN");

        if let Some(base) = non_empty("MESSAGIFY_API_BASE") {
            config.api_base = base;
        }

        if let Some(val) = non_empty("MESSAGIFY_MESSAGE_LIMIT") {
            match val.trim().parse::<u32>() {
                Ok(n) if n > 0 => config.message_limit = n,
                _ => {
                    tracing::warn!(
                        value = %val,
                        "Invalid MESSAGIFY_MESSAGE_LIMIT, using default"
                    );
                }
            }
        }

        config.group_id = non_empty("MESSAGIFY_GROUP_ID").map(|v| GroupId::new(v.trim()));
        config.conversation_id =
            non_empty("MESSAGIFY_CONVERSATION_ID").map(|v| ChannelId::new(v.trim()));

        if let Some(val) = non_empty("MESSAGIFY_FOLLOW") {
            config.follow = val != "false" && val != "0";
        }

        config
    }
}
