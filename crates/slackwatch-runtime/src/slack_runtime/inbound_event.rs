//! Typed decoding of RTM text frames into watched events.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmojiChange {
    Added { name: String, value: String },
    Removed { names: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Archive { channel_id: String },
    Created { channel_id: String, name: String },
    Deleted { channel_id: String },
    Rename { channel_id: String, name: String },
    Unarchive { channel_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One decoded RTM frame. Frames outside the watched families are `Unknown`.
pub enum InboundEvent {
    Emoji(EmojiChange),
    Channel(ChannelEvent),
    Unknown { event_type: Option<String> },
}

#[derive(Debug, Error)]
pub enum FrameDecodeError {
    #[error("frame is not valid json: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("{event_type} frame has malformed fields: {source}")]
    InvalidEvent {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct EmojiAddedFields {
    name: String,
    value: String,
}

#[derive(Deserialize)]
struct EmojiRemovedFields {
    #[serde(default)]
    names: Vec<String>,
}

#[derive(Deserialize)]
struct ChannelIdFields {
    channel: String,
}

#[derive(Deserialize)]
struct ChannelObject {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct ChannelObjectFields {
    channel: ChannelObject,
}

pub fn decode_frame(raw: &str) -> Result<InboundEvent, FrameDecodeError> {
    let value: Value = serde_json::from_str(raw).map_err(FrameDecodeError::InvalidJson)?;
    let Some(event_type) = value.get("type").and_then(Value::as_str) else {
        return Ok(InboundEvent::Unknown { event_type: None });
    };
    let event_type = event_type.to_string();
    let invalid = |source| FrameDecodeError::InvalidEvent {
        event_type: event_type.clone(),
        source,
    };

    let event = match event_type.as_str() {
        "emoji_changed" => {
            let is_add = value.get("subtype").and_then(Value::as_str) == Some("add");
            if is_add {
                let fields: EmojiAddedFields = serde_json::from_value(value).map_err(invalid)?;
                InboundEvent::Emoji(EmojiChange::Added {
                    name: fields.name,
                    value: fields.value,
                })
            } else {
                let fields: EmojiRemovedFields =
                    serde_json::from_value(value).map_err(invalid)?;
                InboundEvent::Emoji(EmojiChange::Removed {
                    names: fields.names,
                })
            }
        }
        "channel_archive" => {
            let fields: ChannelIdFields = serde_json::from_value(value).map_err(invalid)?;
            InboundEvent::Channel(ChannelEvent::Archive {
                channel_id: fields.channel,
            })
        }
        "channel_unarchive" => {
            let fields: ChannelIdFields = serde_json::from_value(value).map_err(invalid)?;
            InboundEvent::Channel(ChannelEvent::Unarchive {
                channel_id: fields.channel,
            })
        }
        "channel_deleted" => {
            let fields: ChannelIdFields = serde_json::from_value(value).map_err(invalid)?;
            InboundEvent::Channel(ChannelEvent::Deleted {
                channel_id: fields.channel,
            })
        }
        "channel_created" => {
            let fields: ChannelObjectFields = serde_json::from_value(value).map_err(invalid)?;
            InboundEvent::Channel(ChannelEvent::Created {
                channel_id: fields.channel.id,
                name: fields.channel.name,
            })
        }
        "channel_rename" => {
            let fields: ChannelObjectFields = serde_json::from_value(value).map_err(invalid)?;
            InboundEvent::Channel(ChannelEvent::Rename {
                channel_id: fields.channel.id,
                name: fields.channel.name,
            })
        }
        _ => InboundEvent::Unknown {
            event_type: Some(event_type.clone()),
        },
    };
    Ok(event)
}
