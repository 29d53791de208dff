//! Routes decoded RTM frames to the emoji and channel watchers.

use tracing::{debug, warn};

use super::channel_directory::ChannelDirectory;
use super::channel_watch::apply_channel_event;
use super::emoji_watch::emoji_notifications;
use super::inbound_event::{decode_frame, InboundEvent};
use super::notifier::{NotificationTargets, Notifier};
use crate::slack_helpers::truncate_for_error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The frame could not be decoded and was dropped.
    Dropped,
    /// The frame decoded to an event outside the watched families.
    Ignored,
    Handled { published: usize, failed: usize },
}

#[derive(Clone)]
pub struct EventRouter {
    notifier: Notifier,
    targets: NotificationTargets,
}

impl EventRouter {
    pub fn new(notifier: Notifier, targets: NotificationTargets) -> Self {
        Self { notifier, targets }
    }

    pub async fn route_frame(
        &self,
        directory: &mut ChannelDirectory,
        frame: &str,
    ) -> RouteOutcome {
        match decode_frame(frame) {
            Ok(event) => self.route_event(directory, event).await,
            Err(error) => {
                warn!(
                    error = %error,
                    frame = %truncate_for_error(frame, 200),
                    "dropping malformed rtm frame"
                );
                RouteOutcome::Dropped
            }
        }
    }

    /// Directory mutation completes before any publish starts, and every
    /// publish is awaited before returning.
    pub async fn route_event(
        &self,
        directory: &mut ChannelDirectory,
        event: InboundEvent,
    ) -> RouteOutcome {
        let notifications = match &event {
            InboundEvent::Emoji(change) => {
                emoji_notifications(change, &self.targets.emoji_watch_channel)
            }
            InboundEvent::Channel(channel_event) => vec![apply_channel_event(
                directory,
                channel_event,
                &self.targets.channel_watch_channel,
            )],
            InboundEvent::Unknown { event_type } => {
                debug!(
                    event_type = event_type.as_deref().unwrap_or("<none>"),
                    "ignoring unwatched rtm frame"
                );
                return RouteOutcome::Ignored;
            }
        };

        let failed = self.notifier.publish_all(&notifications).await;
        RouteOutcome::Handled {
            published: notifications.len().saturating_sub(failed),
            failed,
        }
    }
}
