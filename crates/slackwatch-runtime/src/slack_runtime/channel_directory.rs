//! In-memory channel id to name cache and its paginated resync.

use std::{collections::HashMap, time::Duration};

use anyhow::{Context, Result};
use tracing::debug;

use super::slack_api_client::SlackWebApi;

/// Name rendered when an event references a channel the directory never saw.
pub const UNKNOWN_CHANNEL_PLACEHOLDER: &str = "unknown-channel";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelDirectory {
    channels: HashMap<String, String>,
}

impl ChannelDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn contains(&self, channel_id: &str) -> bool {
        self.channels.contains_key(channel_id)
    }

    pub fn name(&self, channel_id: &str) -> Option<&str> {
        self.channels.get(channel_id).map(String::as_str)
    }

    /// Inserts or overwrites, returning the previous name.
    pub fn insert(
        &mut self,
        channel_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Option<String> {
        self.channels.insert(channel_id.into(), name.into())
    }

    pub fn remove(&mut self, channel_id: &str) -> Option<String> {
        self.channels.remove(channel_id)
    }

    /// Slack inline channel reference. Unknown ids render as a bare `<#id>`.
    pub fn link(&self, channel_id: &str) -> String {
        match self.name(channel_id) {
            Some(name) => format!("<#{channel_id}|{name}>"),
            None => format!("<#{channel_id}>"),
        }
    }

    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.channels
    }
}

impl FromIterator<(String, String)> for ChannelDirectory {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            channels: iter.into_iter().collect(),
        }
    }
}

/// Rebuilds the directory from every `conversations.list` page, sleeping
/// `page_delay` between pages.
pub async fn resync_channel_directory(
    api: &dyn SlackWebApi,
    page_size: usize,
    page_delay: Duration,
) -> Result<ChannelDirectory> {
    let mut directory = ChannelDirectory::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0_usize;
    loop {
        let page = api
            .list_public_channels(cursor.as_deref(), page_size)
            .await
            .with_context(|| format!("failed to list public channels (page {})", pages + 1))?;
        pages += 1;
        for channel in page.channels {
            directory.insert(channel.id, channel.name);
        }

        match page.next_cursor.filter(|value| !value.trim().is_empty()) {
            Some(next) => cursor = Some(next),
            None => break,
        }
        tokio::time::sleep(page_delay).await;
    }

    debug!(pages, channels = directory.len(), "channel directory resynced");
    Ok(directory)
}
