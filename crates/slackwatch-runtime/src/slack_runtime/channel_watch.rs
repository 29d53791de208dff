//! Channel lifecycle notifications and the directory mutations behind them.

use tracing::warn;

use super::channel_directory::{ChannelDirectory, UNKNOWN_CHANNEL_PLACEHOLDER};
use super::inbound_event::ChannelEvent;
use super::notifier::{OutboundNotification, SenderIdentity};

pub const CHANNEL_BOT_USERNAME: &str = "channel-bot";
pub const CHANNEL_BOT_ICON: &str = ":tokyo_tower:";

/// Applies `event` to `directory` and renders the resulting notification.
///
/// Ids missing from the directory never fail: links fall back to a bare
/// reference and captured names to [`UNKNOWN_CHANNEL_PLACEHOLDER`].
pub fn apply_channel_event(
    directory: &mut ChannelDirectory,
    event: &ChannelEvent,
    target_channel: &str,
) -> OutboundNotification {
    let text = match event {
        ChannelEvent::Archive { channel_id } => {
            format!(":ghost: Archived: {}", render_link(directory, channel_id))
        }
        ChannelEvent::Created { channel_id, name } => {
            directory.insert(channel_id.clone(), name.clone());
            format!(":hatching_chick: Created: {}", directory.link(channel_id))
        }
        ChannelEvent::Deleted { channel_id } => {
            let name = directory
                .remove(channel_id)
                .unwrap_or_else(|| missing_name(channel_id, "channel_deleted"));
            format!(":see_no_evil: Deleted: #{name}")
        }
        ChannelEvent::Rename { channel_id, name } => {
            let old_name = directory
                .insert(channel_id.clone(), name.clone())
                .unwrap_or_else(|| missing_name(channel_id, "channel_rename"));
            format!(
                ":ocean: Renamed: {} (#{old_name} :arrow_right: #{name})",
                directory.link(channel_id)
            )
        }
        ChannelEvent::Unarchive { channel_id } => {
            format!(":sushi: Unarchived: {}", render_link(directory, channel_id))
        }
    };

    OutboundNotification::text(
        target_channel,
        text,
        &SenderIdentity::new(CHANNEL_BOT_USERNAME, CHANNEL_BOT_ICON),
    )
}

fn render_link(directory: &ChannelDirectory, channel_id: &str) -> String {
    if !directory.contains(channel_id) {
        warn!(channel_id, "channel missing from directory, rendering bare link");
    }
    directory.link(channel_id)
}

fn missing_name(channel_id: &str, event_type: &str) -> String {
    warn!(
        channel_id,
        event_type, "channel missing from directory, using placeholder name"
    );
    UNKNOWN_CHANNEL_PLACEHOLDER.to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;

    use super::{apply_channel_event, CHANNEL_BOT_ICON, CHANNEL_BOT_USERNAME};
    use crate::slack_runtime::channel_directory::ChannelDirectory;
    use crate::slack_runtime::inbound_event::ChannelEvent;

    fn synced_directory() -> ChannelDirectory {
        [("C1".to_string(), "general".to_string())]
            .into_iter()
            .collect()
    }

    #[test]
    fn functional_created_inserts_then_links_with_new_name() {
        let mut directory = ChannelDirectory::new();
        let notification = apply_channel_event(
            &mut directory,
            &ChannelEvent::Created {
                channel_id: "C2".to_string(),
                name: "random".to_string(),
            },
            "CCHAN",
        );
        assert_eq!(notification.text, ":hatching_chick: Created: <#C2|random>");
        assert_eq!(notification.channel, "CCHAN");
        assert_eq!(notification.username, CHANNEL_BOT_USERNAME);
        assert_eq!(notification.icon_emoji, CHANNEL_BOT_ICON);
        assert_eq!(directory.name("C2"), Some("random"));
    }

    #[test]
    fn functional_deleted_removes_and_reports_captured_name() {
        let mut directory = synced_directory();
        let notification = apply_channel_event(
            &mut directory,
            &ChannelEvent::Deleted {
                channel_id: "C1".to_string(),
            },
            "CCHAN",
        );
        assert_eq!(notification.text, ":see_no_evil: Deleted: #general");
        assert!(directory.is_empty());
    }

    #[test]
    fn functional_rename_overwrites_and_shows_both_names() {
        let mut directory = synced_directory();
        let notification = apply_channel_event(
            &mut directory,
            &ChannelEvent::Rename {
                channel_id: "C1".to_string(),
                name: "general2".to_string(),
            },
            "CCHAN",
        );
        assert_eq!(
            notification.text,
            ":ocean: Renamed: <#C1|general2> (#general :arrow_right: #general2)"
        );
        assert_eq!(directory.name("C1"), Some("general2"));
    }

    #[test]
    fn functional_archive_and_unarchive_leave_directory_untouched() {
        let mut directory = synced_directory();
        let archived = apply_channel_event(
            &mut directory,
            &ChannelEvent::Archive {
                channel_id: "C1".to_string(),
            },
            "CCHAN",
        );
        let unarchived = apply_channel_event(
            &mut directory,
            &ChannelEvent::Unarchive {
                channel_id: "C1".to_string(),
            },
            "CCHAN",
        );
        assert_eq!(archived.text, ":ghost: Archived: <#C1|general>");
        assert_eq!(unarchived.text, ":sushi: Unarchived: <#C1|general>");
        assert_eq!(directory, synced_directory());
    }

    #[test]
    fn regression_rename_of_unknown_channel_uses_placeholder_and_inserts_new_name() {
        let mut directory = synced_directory();
        let notification = apply_channel_event(
            &mut directory,
            &ChannelEvent::Rename {
                channel_id: "C9".to_string(),
                name: "late".to_string(),
            },
            "CCHAN",
        );
        assert_eq!(
            notification.text,
            ":ocean: Renamed: <#C9|late> (#unknown-channel :arrow_right: #late)"
        );
        assert_eq!(directory.name("C9"), Some("late"));
    }

    #[test]
    fn regression_delete_and_archive_of_unknown_channel_fail_soft() {
        let mut directory = synced_directory();
        let deleted = apply_channel_event(
            &mut directory,
            &ChannelEvent::Deleted {
                channel_id: "C9".to_string(),
            },
            "CCHAN",
        );
        let archived = apply_channel_event(
            &mut directory,
            &ChannelEvent::Archive {
                channel_id: "C9".to_string(),
            },
            "CCHAN",
        );
        assert_eq!(deleted.text, ":see_no_evil: Deleted: #unknown-channel");
        assert_eq!(archived.text, ":ghost: Archived: <#C9>");
        assert_eq!(directory, synced_directory());
    }

    fn channel_event_strategy() -> impl Strategy<Value = ChannelEvent> {
        let id = "C[1-6]";
        let name = "[a-z]{1,6}";
        prop_oneof![
            (id, name).prop_map(|(channel_id, name)| ChannelEvent::Created { channel_id, name }),
            id.prop_map(|channel_id| ChannelEvent::Deleted { channel_id }),
            (id, name).prop_map(|(channel_id, name)| ChannelEvent::Rename { channel_id, name }),
        ]
    }

    proptest! {
        #[test]
        fn property_directory_matches_reference_model_for_any_lifecycle_sequence(
            events in proptest::collection::vec(channel_event_strategy(), 0..64)
        ) {
            let mut directory = synced_directory();
            let mut model = HashMap::from([("C1".to_string(), "general".to_string())]);

            for event in &events {
                apply_channel_event(&mut directory, event, "CCHAN");
                match event {
                    ChannelEvent::Created { channel_id, name }
                    | ChannelEvent::Rename { channel_id, name } => {
                        model.insert(channel_id.clone(), name.clone());
                    }
                    ChannelEvent::Deleted { channel_id } => {
                        model.remove(channel_id);
                    }
                    ChannelEvent::Archive { .. } | ChannelEvent::Unarchive { .. } => {}
                }
            }
            prop_assert_eq!(directory.as_map(), &model);
        }
    }
}
