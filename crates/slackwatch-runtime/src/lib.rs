//! Slack RTM watcher that republishes custom emoji and public channel
//! lifecycle changes into notification channels.

mod slack_helpers;
pub mod slack_runtime;

pub use slack_runtime::{
    run_slack_watch, ConnectionSupervisor, SessionReport, ShutdownSignal, SlackWatchRuntimeConfig,
    SupervisorPhase,
};
