use std::time::Duration;

use anyhow::{bail, Result};
use slackwatch_runtime::slack_runtime::{NotificationTargets, SlackToken};
use slackwatch_runtime::SlackWatchRuntimeConfig;

use crate::cli_args::Cli;

pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
    if cli.token.trim().is_empty() {
        bail!("--token cannot be empty");
    }
    if cli.default_username.trim().is_empty() {
        bail!("--default-username cannot be empty");
    }
    for (flag, channel) in [
        ("--emoji-watch-channel", &cli.emoji_watch_channel),
        ("--channel-watch-channel", &cli.channel_watch_channel),
        ("--debug-channel", &cli.debug_channel),
    ] {
        if channel.trim().is_empty() {
            bail!("{flag} cannot be empty");
        }
    }
    if cli.api_base.trim().is_empty() {
        bail!("--api-base cannot be empty");
    }
    if cli.request_timeout_ms == 0 {
        bail!("--request-timeout-ms must be greater than 0");
    }
    if cli.reconnect_delay_ms == 0 {
        bail!("--reconnect-delay-ms must be greater than 0");
    }
    Ok(())
}

pub(crate) fn build_runtime_config(cli: &Cli) -> SlackWatchRuntimeConfig {
    SlackWatchRuntimeConfig {
        api_base: cli.api_base.trim().to_string(),
        token: SlackToken::new(cli.token.as_str()),
        targets: NotificationTargets {
            default_username: cli.default_username.trim().to_string(),
            emoji_watch_channel: cli.emoji_watch_channel.trim().to_string(),
            channel_watch_channel: cli.channel_watch_channel.trim().to_string(),
            debug_channel: cli.debug_channel.trim().to_string(),
        },
        reconnect_delay: Duration::from_millis(cli.reconnect_delay_ms),
        channel_page_delay: Duration::from_millis(cli.channel_page_delay_ms),
        channel_page_size: cli.channel_page_size,
        request_timeout_ms: cli.request_timeout_ms,
        retry_max_attempts: cli.retry_max_attempts,
        retry_base_delay_ms: cli.retry_base_delay_ms,
    }
}
