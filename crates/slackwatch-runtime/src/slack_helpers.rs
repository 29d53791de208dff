//! Retry timing and error shaping shared by the Slack Web API calls.

use std::time::Duration;

use reqwest::{header::HeaderMap, StatusCode};

/// Upper bound on the doubling applied to the base retry delay.
const MAX_BACKOFF_DOUBLINGS: u32 = 6;

/// Slack sends `Retry-After` in whole seconds on rate-limited responses.
pub(crate) fn retry_after_delay(headers: &HeaderMap) -> Option<Duration> {
    let seconds = headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()?;
    Some(Duration::from_secs(seconds))
}

/// Delay before retry number `attempt` (1-based). A server-provided
/// `Retry-After` wins over exponential backoff.
pub(crate) fn backoff_delay(
    base_delay_ms: u64,
    attempt: usize,
    retry_after: Option<Duration>,
) -> Duration {
    if let Some(delay) = retry_after {
        return delay;
    }
    let doublings = u32::try_from(attempt.saturating_sub(1))
        .unwrap_or(MAX_BACKOFF_DOUBLINGS)
        .min(MAX_BACKOFF_DOUBLINGS);
    Duration::from_millis(base_delay_ms.max(1).saturating_mul(1_u64 << doublings))
}

pub(crate) fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

pub(crate) fn is_retryable_transport_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request() || error.is_body()
}

/// Shortens a response body to `max_chars` characters for embedding in errors.
pub(crate) fn truncate_for_error(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &value[..cut]),
        None => value.to_string(),
    }
}
