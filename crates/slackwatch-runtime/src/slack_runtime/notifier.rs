//! Outbound notification model and the publish path into `chat.postMessage`.

use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::slack_api_client::SlackWebApi;

pub const DEFAULT_ICON_EMOJI: &str = ":upside_down_face:";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Display name and icon a notification is posted under.
pub struct SenderIdentity {
    pub username: String,
    pub icon_emoji: String,
}

impl SenderIdentity {
    pub fn new(username: impl Into<String>, icon_emoji: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            icon_emoji: icon_emoji.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// One `chat.postMessage` payload. Field names match the Slack Web API.
pub struct OutboundNotification {
    pub channel: String,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Value>,
    pub username: String,
    pub icon_emoji: String,
}

impl OutboundNotification {
    pub fn text(channel: &str, text: impl Into<String>, sender: &SenderIdentity) -> Self {
        Self {
            channel: channel.to_string(),
            text: text.into(),
            blocks: Vec::new(),
            username: sender.username.clone(),
            icon_emoji: sender.icon_emoji.clone(),
        }
    }

    pub fn with_blocks(mut self, blocks: Vec<Value>) -> Self {
        self.blocks = blocks;
        self
    }

    pub fn is_rich(&self) -> bool {
        !self.blocks.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Destination channels and the fallback sender used for operations reports.
pub struct NotificationTargets {
    pub default_username: String,
    pub emoji_watch_channel: String,
    pub channel_watch_channel: String,
    pub debug_channel: String,
}

impl NotificationTargets {
    pub fn operations_notification(&self, text: impl Into<String>) -> OutboundNotification {
        OutboundNotification::text(
            &self.debug_channel,
            text,
            &SenderIdentity::new(self.default_username.clone(), DEFAULT_ICON_EMOJI),
        )
    }
}

#[derive(Clone)]
pub struct Notifier {
    api: Arc<dyn SlackWebApi>,
}

impl Notifier {
    pub fn new(api: Arc<dyn SlackWebApi>) -> Self {
        Self { api }
    }

    pub async fn publish(&self, notification: &OutboundNotification) -> Result<()> {
        self.api
            .post_message(notification)
            .await
            .with_context(|| format!("failed to publish notification to {}", notification.channel))
    }

    /// Publishes and swallows the failure after logging it. Returns whether it was delivered.
    pub async fn publish_logged(&self, notification: &OutboundNotification) -> bool {
        match self.publish(notification).await {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    channel = %notification.channel,
                    error = %format!("{error:#}"),
                    "notification publish failed"
                );
                false
            }
        }
    }

    /// Publishes every notification concurrently and returns the number that failed.
    pub async fn publish_all(&self, notifications: &[OutboundNotification]) -> usize {
        join_all(
            notifications
                .iter()
                .map(|notification| self.publish_logged(notification)),
        )
        .await
        .into_iter()
        .filter(|delivered| !delivered)
        .count()
    }
}
