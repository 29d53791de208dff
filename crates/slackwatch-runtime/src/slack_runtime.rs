//! Slack RTM watch runtime: keeps one event stream alive and republishes
//! emoji and channel lifecycle changes as notifications.

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

mod channel_directory;
mod channel_watch;
mod emoji_watch;
mod event_router;
mod inbound_event;
mod notifier;
mod slack_api_client;
mod stream_transport;

pub use channel_directory::{
    resync_channel_directory, ChannelDirectory, UNKNOWN_CHANNEL_PLACEHOLDER,
};
pub use channel_watch::{apply_channel_event, CHANNEL_BOT_ICON, CHANNEL_BOT_USERNAME};
pub use emoji_watch::{emoji_notifications, EMOJI_ALIAS_PREFIX, EMOJI_BOT_USERNAME};
pub use event_router::{EventRouter, RouteOutcome};
pub use inbound_event::{decode_frame, ChannelEvent, EmojiChange, FrameDecodeError, InboundEvent};
pub use notifier::{
    NotificationTargets, Notifier, OutboundNotification, SenderIdentity, DEFAULT_ICON_EMOJI,
};
pub use slack_api_client::{ChannelPage, ChannelSummary, SlackApiClient, SlackToken, SlackWebApi};
pub use stream_transport::{EventStream, StreamConnector, WebSocketConnector};

pub const CONNECTION_OPENED_MESSAGE: &str = "Connection opened!";
pub const CONNECTION_CLOSED_MESSAGE: &str = "Connection closed!";
const CHANNEL_LIST_FAILURE_LABEL: &str = "Failed to get channel list";
const HANDSHAKE_FAILURE_LABEL: &str = "Failed to create websocket";

#[derive(Debug, Clone)]
/// Runtime configuration for the watch supervisor.
pub struct SlackWatchRuntimeConfig {
    pub api_base: String,
    pub token: SlackToken,
    pub targets: NotificationTargets,
    pub reconnect_delay: Duration,
    pub channel_page_delay: Duration,
    pub channel_page_size: usize,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
}

#[derive(Debug, Clone)]
/// Cooperative shutdown flag shared between the binary and the supervisor.
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }

    pub fn channel() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self::new(rx))
    }

    pub fn is_requested(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown is requested. Never resolves if the sender is gone.
    pub async fn requested(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorPhase {
    Resyncing,
    Handshaking,
    Streaming,
    Backoff,
}

impl SupervisorPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resyncing => "resyncing",
            Self::Handshaking => "handshaking",
            Self::Streaming => "streaming",
            Self::Backoff => "backoff",
        }
    }
}

enum SupervisorState {
    Resyncing,
    Handshaking {
        directory: ChannelDirectory,
    },
    Streaming {
        directory: ChannelDirectory,
        stream_url: String,
    },
    Backoff,
}

impl SupervisorState {
    fn phase(&self) -> SupervisorPhase {
        match self {
            Self::Resyncing => SupervisorPhase::Resyncing,
            Self::Handshaking { .. } => SupervisorPhase::Handshaking,
            Self::Streaming { .. } => SupervisorPhase::Streaming,
            Self::Backoff => SupervisorPhase::Backoff,
        }
    }
}

enum Transition {
    Next(SupervisorState),
    Shutdown,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
/// Counters for one stream session, logged when the session ends.
pub struct SessionReport {
    pub opened: bool,
    pub frames_received: usize,
    pub events_handled: usize,
    pub events_ignored: usize,
    pub frames_dropped: usize,
    pub notifications_published: usize,
    pub notifications_failed: usize,
    pub close_reason: Option<String>,
}

impl SessionReport {
    fn record(&mut self, outcome: RouteOutcome) {
        match outcome {
            RouteOutcome::Dropped => self.frames_dropped += 1,
            RouteOutcome::Ignored => self.events_ignored += 1,
            RouteOutcome::Handled { published, failed } => {
                self.events_handled += 1;
                self.notifications_published += published;
                self.notifications_failed += failed;
            }
        }
    }
}

/// Runs the watch supervisor against the live Slack API until shutdown or a
/// fatal setup failure.
pub async fn run_slack_watch(
    config: SlackWatchRuntimeConfig,
    shutdown: ShutdownSignal,
) -> Result<()> {
    let api = SlackApiClient::new(
        config.api_base.clone(),
        config.token.clone(),
        config.request_timeout_ms,
        config.retry_max_attempts,
        config.retry_base_delay_ms,
    )?;
    let mut supervisor =
        ConnectionSupervisor::new(config, Arc::new(api), Arc::new(WebSocketConnector));
    supervisor.run(shutdown).await
}

pub struct ConnectionSupervisor {
    config: SlackWatchRuntimeConfig,
    api: Arc<dyn SlackWebApi>,
    connector: Arc<dyn StreamConnector>,
    notifier: Notifier,
    router: EventRouter,
    phase: SupervisorPhase,
    sessions_started: usize,
    failure_streak: usize,
    last_session: Option<SessionReport>,
}

impl ConnectionSupervisor {
    pub fn new(
        config: SlackWatchRuntimeConfig,
        api: Arc<dyn SlackWebApi>,
        connector: Arc<dyn StreamConnector>,
    ) -> Self {
        let notifier = Notifier::new(api.clone());
        let router = EventRouter::new(notifier.clone(), config.targets.clone());
        Self {
            config,
            api,
            connector,
            notifier,
            router,
            phase: SupervisorPhase::Resyncing,
            sessions_started: 0,
            failure_streak: 0,
            last_session: None,
        }
    }

    pub fn phase(&self) -> SupervisorPhase {
        self.phase
    }

    pub fn sessions_started(&self) -> usize {
        self.sessions_started
    }

    /// Consecutive sessions that ended without receiving a single frame.
    pub fn failure_streak(&self) -> usize {
        self.failure_streak
    }

    pub fn last_session(&self) -> Option<&SessionReport> {
        self.last_session.as_ref()
    }

    /// Returns `Ok(())` on shutdown and `Err` on a fatal resync or handshake failure.
    pub async fn run(&mut self, mut shutdown: ShutdownSignal) -> Result<()> {
        let mut state = SupervisorState::Resyncing;
        loop {
            if shutdown.is_requested() {
                info!("slack watch shutdown requested");
                return Ok(());
            }
            self.phase = state.phase();
            debug!(phase = self.phase.as_str(), "slack watch supervisor transition");
            state = match self.step(state, &mut shutdown).await? {
                Transition::Next(next) => next,
                Transition::Shutdown => {
                    info!(phase = self.phase.as_str(), "slack watch shutdown requested");
                    return Ok(());
                }
            };
        }
    }

    async fn step(
        &mut self,
        state: SupervisorState,
        shutdown: &mut ShutdownSignal,
    ) -> Result<Transition> {
        match state {
            SupervisorState::Resyncing => {
                let resync = resync_channel_directory(
                    self.api.as_ref(),
                    self.config.channel_page_size,
                    self.config.channel_page_delay,
                );
                let result = tokio::select! {
                    _ = shutdown.requested() => return Ok(Transition::Shutdown),
                    result = resync => result,
                };
                match result {
                    Ok(directory) => {
                        info!(channels = directory.len(), "channel directory resynced");
                        Ok(Transition::Next(SupervisorState::Handshaking { directory }))
                    }
                    Err(error) => Err(self.report_fatal(CHANNEL_LIST_FAILURE_LABEL, error).await),
                }
            }
            SupervisorState::Handshaking { directory } => {
                let result = tokio::select! {
                    _ = shutdown.requested() => return Ok(Transition::Shutdown),
                    result = self.api.rtm_connect() => result,
                };
                match result {
                    Ok(stream_url) => Ok(Transition::Next(SupervisorState::Streaming {
                        directory,
                        stream_url,
                    })),
                    Err(error) => Err(self.report_fatal(HANDSHAKE_FAILURE_LABEL, error).await),
                }
            }
            SupervisorState::Streaming {
                mut directory,
                stream_url,
            } => {
                self.sessions_started += 1;
                let report = tokio::select! {
                    _ = shutdown.requested() => return Ok(Transition::Shutdown),
                    report = self.run_session(&stream_url, &mut directory) => report,
                };
                self.finish_session(report);
                tokio::select! {
                    _ = shutdown.requested() => return Ok(Transition::Shutdown),
                    _ = self.notify_operations(CONNECTION_CLOSED_MESSAGE) => {}
                }
                Ok(Transition::Next(SupervisorState::Backoff))
            }
            SupervisorState::Backoff => {
                tokio::select! {
                    _ = shutdown.requested() => Ok(Transition::Shutdown),
                    _ = tokio::time::sleep(self.config.reconnect_delay) => {
                        Ok(Transition::Next(SupervisorState::Resyncing))
                    }
                }
            }
        }
    }

    /// Routes frames strictly one at a time until the stream closes or errors.
    async fn run_session(
        &self,
        stream_url: &str,
        directory: &mut ChannelDirectory,
    ) -> SessionReport {
        let mut report = SessionReport::default();
        let mut stream = match self.connector.connect(stream_url).await {
            Ok(stream) => stream,
            Err(error) => {
                report.close_reason = Some(format!("{error:#}"));
                return report;
            }
        };

        report.opened = true;
        info!(session = self.sessions_started, "slack rtm stream opened");
        self.notify_operations(CONNECTION_OPENED_MESSAGE).await;

        while let Some(frame) = stream.next_frame().await {
            match frame {
                Ok(frame) => {
                    report.frames_received += 1;
                    let outcome = self.router.route_frame(directory, &frame).await;
                    report.record(outcome);
                }
                Err(error) => {
                    report.close_reason = Some(format!("{error:#}"));
                    break;
                }
            }
        }
        report
    }

    /// Records the ended session. The closed report is posted by the caller.
    fn finish_session(&mut self, report: SessionReport) {
        if report.frames_received == 0 {
            self.failure_streak = self.failure_streak.saturating_add(1);
        } else {
            self.failure_streak = 0;
        }

        match report.close_reason.as_deref() {
            Some(reason) => warn!(
                session = self.sessions_started,
                opened = report.opened,
                reason,
                "slack rtm stream failed"
            ),
            None => info!(session = self.sessions_started, "slack rtm stream closed"),
        }
        info!(
            "slack watch session: frames={} handled={} ignored={} dropped={} published={} publish_failures={} failure_streak={}",
            report.frames_received,
            report.events_handled,
            report.events_ignored,
            report.frames_dropped,
            report.notifications_published,
            report.notifications_failed,
            self.failure_streak,
        );
        self.last_session = Some(report);
    }

    async fn report_fatal(&self, label: &str, error: anyhow::Error) -> anyhow::Error {
        error!(error = %format!("{error:#}"), "{label}");
        self.notify_operations(&format!("{label}: {error:#}")).await;
        error.context(label.to_string())
    }

    async fn notify_operations(&self, text: &str) {
        let notification = self.config.targets.operations_notification(text);
        self.notifier.publish_logged(&notification).await;
    }
}
