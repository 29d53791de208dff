use clap::Parser;

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "slackwatch",
    about = "Watch Slack custom emoji and public channel changes and announce them",
    version
)]
pub(crate) struct Cli {
    #[arg(
        long = "token",
        env = "SLACK_CLIENT_TOKEN",
        hide_env_values = true,
        help = "Slack token used for conversations.list, rtm.connect and chat.postMessage"
    )]
    pub token: String,

    #[arg(
        long = "default-username",
        env = "SLACK_CLIENT_DEFAULT_USERNAME",
        help = "Sender name used for connection and error reports"
    )]
    pub default_username: String,

    #[arg(
        long = "emoji-watch-channel",
        env = "SLACK_CLIENT_EMOJI_WATCH_CHANNEL",
        help = "Channel receiving custom emoji notifications"
    )]
    pub emoji_watch_channel: String,

    #[arg(
        long = "channel-watch-channel",
        env = "SLACK_CLIENT_CHANNEL_WATCH_CHANNEL",
        help = "Channel receiving public channel lifecycle notifications"
    )]
    pub channel_watch_channel: String,

    #[arg(
        long = "debug-channel",
        env = "SLACK_CLIENT_DEBUG_CHANNEL",
        help = "Operations channel receiving connection and error reports"
    )]
    pub debug_channel: String,

    #[arg(
        long = "api-base",
        env = "SLACK_CLIENT_API_BASE",
        default_value = "https://slack.com/api",
        help = "Slack Web API base URL"
    )]
    pub api_base: String,

    #[arg(
        long = "reconnect-delay-ms",
        env = "SLACK_CLIENT_RECONNECT_DELAY_MS",
        default_value_t = 2_000,
        help = "Delay in milliseconds before reconnecting after the stream closes"
    )]
    pub reconnect_delay_ms: u64,

    #[arg(
        long = "channel-page-delay-ms",
        env = "SLACK_CLIENT_CHANNEL_PAGE_DELAY_MS",
        default_value_t = 2_000,
        help = "Delay in milliseconds between conversations.list pages"
    )]
    pub channel_page_delay_ms: u64,

    #[arg(
        long = "channel-page-size",
        env = "SLACK_CLIENT_CHANNEL_PAGE_SIZE",
        default_value_t = 1_000,
        value_parser = parse_positive_usize,
        help = "Page size requested from conversations.list"
    )]
    pub channel_page_size: usize,

    #[arg(
        long = "request-timeout-ms",
        env = "SLACK_CLIENT_REQUEST_TIMEOUT_MS",
        default_value_t = 10_000,
        help = "HTTP timeout in milliseconds for Slack Web API calls"
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long = "retry-max-attempts",
        env = "SLACK_CLIENT_RETRY_MAX_ATTEMPTS",
        default_value_t = 3,
        value_parser = parse_positive_usize,
        help = "Maximum attempts for retryable channel listing and rtm.connect failures"
    )]
    pub retry_max_attempts: usize,

    #[arg(
        long = "retry-base-delay-ms",
        env = "SLACK_CLIENT_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        help = "Base backoff delay in milliseconds for Slack Web API retries"
    )]
    pub retry_base_delay_ms: u64,
}
