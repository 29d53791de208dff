//! Notifications for custom emoji additions, aliases and removals.

use serde_json::json;

use super::inbound_event::EmojiChange;
use super::notifier::{OutboundNotification, SenderIdentity, DEFAULT_ICON_EMOJI};

pub const EMOJI_BOT_USERNAME: &str = "emoji-bot";
pub const EMOJI_ALIAS_PREFIX: &str = "alias:";

pub fn emoji_notifications(
    change: &EmojiChange,
    target_channel: &str,
) -> Vec<OutboundNotification> {
    match change {
        EmojiChange::Added { name, value } => {
            let emoji = format!(":{name}:");
            let sender = SenderIdentity::new(EMOJI_BOT_USERNAME, emoji.clone());
            // Aliases carry no image url to preview.
            if value.starts_with(EMOJI_ALIAS_PREFIX) {
                let message = format!(":raising_hand: Alias added: {emoji} (*{name}*, {value})");
                return vec![OutboundNotification::text(target_channel, message, &sender)];
            }

            let message = format!(":raising_hand: Added: {emoji} (*{name}*)");
            let block = json!({
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": message,
                },
                "accessory": {
                    "type": "image",
                    "image_url": value,
                    "alt_text": emoji,
                },
            });
            vec![
                OutboundNotification::text(target_channel, message, &sender)
                    .with_blocks(vec![block]),
            ]
        }
        EmojiChange::Removed { names } => {
            let sender = SenderIdentity::new(EMOJI_BOT_USERNAME, DEFAULT_ICON_EMOJI);
            names
                .iter()
                .map(|name| {
                    OutboundNotification::text(
                        target_channel,
                        format!(":wave: Removed: :{name}: (*{name}*)"),
                        &sender,
                    )
                })
                .collect()
        }
    }
}
