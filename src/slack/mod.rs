//! Chat service port and its Slack Web API adapter.
//!
//! The auditor only depends on the [`ChatService`] trait; [`SlackClient`]
//! is the production implementation.

pub mod client;

pub use client::{SlackClient, SlackClientConfig};

use crate::models::{Channel, History, HistoryParams, User};
use async_trait::async_trait;
use thiserror::Error;

/// Errors from talking to the chat service. Every variant is fatal to a run.
#[derive(Debug, Error)]
pub enum SlackError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {method} timed out after {seconds}s")]
    Timeout { method: String, seconds: u64 },

    #[error("cannot connect to Slack API at {url}")]
    Connect { url: String },

    #[error("request to {method} failed: {source}")]
    Http {
        method: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Slack API {method} returned HTTP {status}: {body}")]
    Status {
        method: String,
        status: u16,
        body: String,
    },

    #[error("Slack API {method} returned error: {error}")]
    Api { method: String, error: String },

    #[error("failed to decode {method} response: {source}")]
    Decode {
        method: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected {method} payload: {source}")]
    Payload {
        method: String,
        #[source]
        source: serde_json::Error,
    },
}

/// What the audit needs from a chat service.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// All private channels visible to the caller. Members may be left
    /// empty when the listing does not carry them.
    async fn list_private_channels(&self) -> Result<Vec<Channel>, SlackError>;

    /// Member identifiers of one channel, in service order.
    async fn channel_members(&self, channel_id: &str) -> Result<Vec<String>, SlackError>;

    /// All workspace users, including deleted ones.
    async fn list_users(&self) -> Result<Vec<User>, SlackError>;

    /// Recent messages of one channel, reactions included.
    async fn channel_history(
        &self,
        channel_id: &str,
        params: &HistoryParams,
    ) -> Result<History, SlackError>;
}
