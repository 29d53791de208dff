//! Slack Web API client used for channel listing, RTM handshakes and posting.

use std::{fmt, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::notifier::OutboundNotification;
use crate::slack_helpers::{
    backoff_delay, is_retryable_status, is_retryable_transport_error, retry_after_delay,
    truncate_for_error,
};

const PUBLIC_CHANNEL_TYPES: &str = "public_channel";

#[derive(Clone, PartialEq, Eq)]
/// Pre-issued bearer token. Never printed.
pub struct SlackToken(String);

impl SlackToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SlackToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SlackToken(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelSummary {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// One page of `conversations.list`. `next_cursor` is `None` on the last page.
pub struct ChannelPage {
    pub channels: Vec<ChannelSummary>,
    pub next_cursor: Option<String>,
}

#[async_trait]
/// The Slack Web API surface the watcher depends on.
pub trait SlackWebApi: Send + Sync {
    async fn list_public_channels(&self, cursor: Option<&str>, limit: usize)
        -> Result<ChannelPage>;

    /// Requests a one-time RTM websocket URL.
    async fn rtm_connect(&self) -> Result<String>;

    async fn post_message(&self, notification: &OutboundNotification) -> Result<()>;
}

#[derive(Debug, Clone, Deserialize)]
struct SlackResponseMetadata {
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackConversationsListResponse {
    ok: bool,
    #[serde(default)]
    channels: Vec<ChannelSummary>,
    #[serde(default)]
    response_metadata: Option<SlackResponseMetadata>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackRtmConnectResponse {
    ok: bool,
    url: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackChatMessageResponse {
    ok: bool,
    error: Option<String>,
}

#[derive(Clone)]
pub struct SlackApiClient {
    http: reqwest::Client,
    api_base: String,
    token: SlackToken,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl SlackApiClient {
    pub fn new(
        api_base: String,
        token: SlackToken,
        request_timeout_ms: u64,
        retry_max_attempts: usize,
        retry_base_delay_ms: u64,
    ) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("slackwatch"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create slack api client")?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
            retry_max_attempts: retry_max_attempts.max(1),
            retry_base_delay_ms: retry_base_delay_ms.max(1),
        })
    }

    async fn request_json<T, F>(
        &self,
        operation: &str,
        mut builder: F,
        max_attempts: usize,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = builder()
                .header(
                    "x-slackwatch-retry-attempt",
                    attempt.saturating_sub(1).to_string(),
                )
                .send()
                .await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let parsed = response
                            .json::<T>()
                            .await
                            .with_context(|| format!("failed to decode slack {operation}"))?;
                        return Ok(parsed);
                    }

                    let retry_after = retry_after_delay(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if attempt < max_attempts && is_retryable_status(status) {
                        tokio::time::sleep(backoff_delay(
                            self.retry_base_delay_ms,
                            attempt,
                            retry_after,
                        ))
                        .await;
                        continue;
                    }

                    bail!(
                        "slack api {operation} failed with status {}: {}",
                        status.as_u16(),
                        truncate_for_error(&body, 800)
                    );
                }
                Err(error) => {
                    if attempt < max_attempts && is_retryable_transport_error(&error) {
                        tokio::time::sleep(backoff_delay(self.retry_base_delay_ms, attempt, None))
                            .await;
                        continue;
                    }
                    return Err(error)
                        .with_context(|| format!("slack api {operation} request failed"));
                }
            }
        }
    }
}

#[async_trait]
impl SlackWebApi for SlackApiClient {
    async fn list_public_channels(
        &self,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<ChannelPage> {
        let limit = limit.max(1).to_string();
        let cursor = cursor.unwrap_or_default();
        let response: SlackConversationsListResponse = self
            .request_json(
                "conversations.list",
                || {
                    self.http
                        .get(format!("{}/conversations.list", self.api_base))
                        .bearer_auth(self.token.expose())
                        .query(&[
                            ("cursor", cursor),
                            ("limit", limit.as_str()),
                            ("types", PUBLIC_CHANNEL_TYPES),
                        ])
                },
                self.retry_max_attempts,
            )
            .await?;
        if !response.ok {
            bail!(
                "slack conversations.list failed: {}",
                response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }

        let next_cursor = response
            .response_metadata
            .and_then(|metadata| metadata.next_cursor)
            .filter(|value| !value.trim().is_empty());
        Ok(ChannelPage {
            channels: response.channels,
            next_cursor,
        })
    }

    async fn rtm_connect(&self) -> Result<String> {
        let response: SlackRtmConnectResponse = self
            .request_json(
                "rtm.connect",
                || {
                    self.http
                        .get(format!("{}/rtm.connect", self.api_base))
                        .bearer_auth(self.token.expose())
                },
                self.retry_max_attempts,
            )
            .await?;
        if !response.ok {
            bail!(
                "slack rtm.connect failed: {}",
                response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }
        response
            .url
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("slack rtm.connect did not return url"))
    }

    async fn post_message(&self, notification: &OutboundNotification) -> Result<()> {
        // Single attempt: notifications are fire-and-forget.
        let response: SlackChatMessageResponse = self
            .request_json(
                "chat.postMessage",
                || {
                    self.http
                        .post(format!("{}/chat.postMessage", self.api_base))
                        .bearer_auth(self.token.expose())
                        .json(notification)
                },
                1,
            )
            .await?;
        if !response.ok {
            bail!(
                "slack chat.postMessage failed: {}",
                response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }
        Ok(())
    }
}
