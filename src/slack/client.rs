//! Slack Web API client.
//!
//! Implements [`ChatService`] on top of `conversations.list`,
//! `conversations.members`, `users.list` and `conversations.history`.
//! `conversations.list` carries no members; they are fetched per channel.

use super::{ChatService, SlackError};
use crate::models::{Channel, History, HistoryParams, User};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Page size requested from cursor-paginated list methods.
const PAGE_LIMIT: &str = "200";

/// Connection settings for the Slack client.
#[derive(Debug, Clone)]
pub struct SlackClientConfig {
    pub api_url: String,
    pub token: String,
    pub timeout_seconds: u64,
}

/// Slack Web API client authenticated with a bearer token.
pub struct SlackClient {
    config: SlackClientConfig,
    http_client: reqwest::Client,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Deserialize)]
struct ChannelsPage {
    #[serde(default)]
    channels: Vec<Channel>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

#[derive(Debug, Deserialize)]
struct MembersPage {
    #[serde(default)]
    members: Vec<String>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

#[derive(Debug, Deserialize)]
struct UsersPage {
    #[serde(default)]
    members: Vec<User>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

impl ResponseMetadata {
    fn cursor(&self) -> Option<String> {
        if self.next_cursor.is_empty() {
            None
        } else {
            Some(self.next_cursor.clone())
        }
    }
}

/// Check the `ok` flag of a Slack response and decode the payload.
fn parse_envelope<T: DeserializeOwned>(method: &str, body: Value) -> Result<T, SlackError> {
    if !body["ok"].as_bool().unwrap_or(false) {
        return Err(SlackError::Api {
            method: method.to_string(),
            error: body["error"].as_str().unwrap_or("unknown_error").to_string(),
        });
    }

    serde_json::from_value(body).map_err(|source| SlackError::Payload {
        method: method.to_string(),
        source,
    })
}

impl SlackClient {
    /// Create a new client.
    pub fn new(config: SlackClientConfig) -> Result<Self, SlackError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(SlackError::Client)?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), method)
    }

    /// Call a Web API method with query parameters.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> Result<T, SlackError> {
        let url = self.method_url(method);
        debug!("Calling Slack API {}", method);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.config.token)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SlackError::Timeout {
                        method: method.to_string(),
                        seconds: self.config.timeout_seconds,
                    }
                } else if e.is_connect() {
                    SlackError::Connect {
                        url: self.config.api_url.clone(),
                    }
                } else {
                    SlackError::Http {
                        method: method.to_string(),
                        source: e,
                    }
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SlackError::Status {
                method: method.to_string(),
                status,
                body,
            });
        }

        let body: Value = response.json().await.map_err(|source| SlackError::Decode {
            method: method.to_string(),
            source,
        })?;

        parse_envelope(method, body)
    }
}

#[async_trait]
impl ChatService for SlackClient {
    async fn list_private_channels(&self) -> Result<Vec<Channel>, SlackError> {
        let mut channels = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query = vec![
                ("types", "private_channel".to_string()),
                ("exclude_archived", "true".to_string()),
                ("limit", PAGE_LIMIT.to_string()),
            ];
            if let Some(ref c) = cursor {
                query.push(("cursor", c.clone()));
            }

            let page: ChannelsPage = self.call("conversations.list", &query).await?;
            channels.extend(page.channels);

            cursor = page.response_metadata.cursor();
            if cursor.is_none() {
                break;
            }
        }

        Ok(channels)
    }

    async fn channel_members(&self, channel_id: &str) -> Result<Vec<String>, SlackError> {
        let mut members = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query = vec![
                ("channel", channel_id.to_string()),
                ("limit", PAGE_LIMIT.to_string()),
            ];
            if let Some(ref c) = cursor {
                query.push(("cursor", c.clone()));
            }

            let page: MembersPage = self.call("conversations.members", &query).await?;
            members.extend(page.members);

            cursor = page.response_metadata.cursor();
            if cursor.is_none() {
                break;
            }
        }

        Ok(members)
    }

    async fn list_users(&self) -> Result<Vec<User>, SlackError> {
        let mut users = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query = vec![("limit", PAGE_LIMIT.to_string())];
            if let Some(ref c) = cursor {
                query.push(("cursor", c.clone()));
            }

            let page: UsersPage = self.call("users.list", &query).await?;
            users.extend(page.members);

            cursor = page.response_metadata.cursor();
            if cursor.is_none() {
                break;
            }
        }

        Ok(users)
    }

    async fn channel_history(
        &self,
        channel_id: &str,
        params: &HistoryParams,
    ) -> Result<History, SlackError> {
        let query = vec![
            ("channel", channel_id.to_string()),
            ("limit", params.count.to_string()),
            ("oldest", params.oldest.clone()),
            ("inclusive", params.inclusive.to_string()),
        ];

        self.call("conversations.history", &query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_client(api_url: &str) -> SlackClient {
        SlackClient::new(SlackClientConfig {
            api_url: api_url.to_string(),
            token: "xoxb-test".to_string(),
            timeout_seconds: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_method_url_trims_trailing_slash() {
        let client = test_client("https://slack.com/api/");
        assert_eq!(
            client.method_url("users.list"),
            "https://slack.com/api/users.list"
        );
    }

    #[test]
    fn test_envelope_error() {
        let body = json!({"ok": false, "error": "invalid_auth"});
        let err = parse_envelope::<History>("users.list", body).unwrap_err();
        match err {
            SlackError::Api { method, error } => {
                assert_eq!(method, "users.list");
                assert_eq!(error, "invalid_auth");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_envelope_missing_ok_is_error() {
        let body = json!({"messages": []});
        assert!(parse_envelope::<History>("conversations.history", body).is_err());
    }

    #[test]
    fn test_decode_channels_page() {
        let body = json!({
            "ok": true,
            "channels": [
                {"id": "G1", "name": "stand-ups", "name_normalized": "stand-ups", "is_private": true},
                {"id": "G2", "name": "random"}
            ],
            "response_metadata": {"next_cursor": "dGVhbTpDMDYxRkE1UEI="}
        });

        let page: ChannelsPage = parse_envelope("conversations.list", body).unwrap();
        assert_eq!(page.channels.len(), 2);
        assert_eq!(page.channels[0].normalized_name(), "stand-ups");
        assert!(page.channels[1].members.is_empty());
        assert_eq!(
            page.response_metadata.cursor().as_deref(),
            Some("dGVhbTpDMDYxRkE1UEI=")
        );
    }

    #[test]
    fn test_decode_users_page_last() {
        let body = json!({
            "ok": true,
            "members": [
                {"id": "U1", "name": "alice", "deleted": false, "real_name": "Alice"},
                {"id": "U2", "name": "bob", "deleted": true},
                {"id": "B1", "name": "jetbot", "is_bot": true}
            ],
            "response_metadata": {"next_cursor": ""}
        });

        let page: UsersPage = parse_envelope("users.list", body).unwrap();
        assert_eq!(page.members.len(), 3);
        assert!(page.members[1].deleted);
        assert!(!page.members[2].deleted);
        assert!(page.response_metadata.cursor().is_none());
    }

    #[test]
    fn test_decode_history() {
        let body = json!({
            "ok": true,
            "has_more": false,
            "messages": [
                {
                    "type": "message",
                    "user": "U1",
                    "text": "yesterday / today / blockers",
                    "ts": "1512085950.000216",
                    "reactions": [{"name": "heavy_check_mark", "users": ["B1"], "count": 1}]
                },
                {"type": "message", "subtype": "channel_join", "ts": "1512085951.000100"}
            ]
        });

        let history: History = parse_envelope("conversations.history", body).unwrap();
        assert_eq!(history.messages.len(), 2);
        assert_eq!(history.messages[0].reactions[0].users, vec!["B1"]);
        assert!(history.messages[1].user.is_none());
    }

    #[test]
    fn test_unreachable_api_is_fatal() {
        let client = test_client("http://127.0.0.1:9");
        let result = tokio_test::block_on(client.list_users());
        assert!(result.is_err());
    }
}
