/// Application name
pub const APP_NAME: &str = "Messagify";

/// Default REST API base URL
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// CDN used for guild icons and avatars
pub const CDN_BASE_URL: &str = "https://cdn.discordapp.com";

/// Number of messages requested per conversation snapshot
pub const DEFAULT_MESSAGE_LIMIT: u32 = 50;

/// Label for a DM channel with neither a name nor recipients
pub const UNKNOWN_DM_LABEL: &str = "Unknown DM";
