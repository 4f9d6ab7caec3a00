//! REST implementation of [`SnapshotSource`].

use serde::de::DeserializeOwned;
use tracing::{debug, error};

use messagify_shared::constants::{DEFAULT_API_BASE, DEFAULT_MESSAGE_LIMIT};
use messagify_shared::{Author, Channel, ChannelId, DmChannel, GroupId, Guild, Message};

use crate::error::NetError;
use crate::source::SnapshotSource;

/// Snapshot queries over the REST API.
///
/// The token is sent verbatim in the `Authorization` header. Token storage
/// belongs to the embedding application.
#[derive(Debug, Clone)]
pub struct HttpSnapshotSource {
    http: reqwest::Client,
    api_base: String,
    token: String,
    message_limit: u32,
}

impl HttpSnapshotSource {
    pub fn new(api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into(),
            token: token.into(),
            message_limit: DEFAULT_MESSAGE_LIMIT,
        }
    }

    /// Source against the public API.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self::new(DEFAULT_API_BASE, token)
    }

    /// Number of messages requested per conversation snapshot.
    pub fn with_message_limit(mut self, limit: u32) -> Self {
        self.message_limit = limit;
        self
    }

    pub fn message_limit(&self) -> u32 {
        self.message_limit
    }

    /// Validate the token; returns the authenticated user.
    pub async fn check_token(&self) -> Result<Author, NetError> {
        self.get_json("users/@me").await
    }

    /// Groups the user belongs to.
    pub async fn fetch_groups(&self) -> Result<Vec<Guild>, NetError> {
        self.get_json("users/@me/guilds").await
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, NetError> {
        if self.token.is_empty() {
            return Err(NetError::NotAuthenticated);
        }

        let url = self.url(path);
        debug!(url = %url, "GET");

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, &self.token)
            .send()
            .await
            .map_err(|e| {
                error!(url = %url, error = %e, "Request failed");
                NetError::Request(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(url = %url, status = status.as_u16(), "Snapshot query failed");
            return Err(NetError::Status(status.as_u16()));
        }

        response.json::<T>().await.map_err(|e| {
            error!(url = %url, error = %e, "Failed to decode response");
            if e.is_decode() {
                NetError::Decode(e.to_string())
            } else {
                NetError::Request(e)
            }
        })
    }
}

impl SnapshotSource for HttpSnapshotSource {
    async fn fetch_conversation_snapshot(
        &self,
        conversation: ChannelId,
    ) -> Result<Vec<Message>, NetError> {
        let path = format!(
            "channels/{}/messages?limit={}",
            conversation, self.message_limit
        );
        self.get_json(&path).await
    }

    async fn fetch_conversation_list(&self) -> Result<Vec<Channel>, NetError> {
        let dms: Vec<DmChannel> = self.get_json("users/@me/channels").await?;
        Ok(dms.into_iter().map(Channel::from).collect())
    }

    async fn fetch_conversation_list_for_group(
        &self,
        group: GroupId,
    ) -> Result<Vec<Channel>, NetError> {
        self.get_json(&format!("guilds/{group}/channels")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let source = HttpSnapshotSource::new("https://example.test/api/", "t");
        assert_eq!(
            source.url("/users/@me"),
            "https://example.test/api/users/@me"
        );
    }

    #[test]
    fn test_default_message_limit() {
        let source = HttpSnapshotSource::with_token("t");
        assert_eq!(source.message_limit(), DEFAULT_MESSAGE_LIMIT);
        assert_eq!(source.with_message_limit(10).message_limit(), 10);
    }

    #[tokio::test]
    async fn test_missing_token_fails_without_request() {
        let source = HttpSnapshotSource::new("http://127.0.0.1:9", "");
        let err = source
            .fetch_conversation_snapshot(ChannelId::from("1"))
            .await
            .unwrap_err();
        assert!(matches!(err, NetError::NotAuthenticated));
    }
}
