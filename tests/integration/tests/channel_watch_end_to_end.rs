use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::Result;
use async_trait::async_trait;
use httpmock::prelude::*;
use serde_json::json;
use slackwatch_runtime::slack_runtime::{
    ChannelDirectory, EventRouter, EventStream, NotificationTargets, Notifier, RouteOutcome,
    SlackApiClient, SlackToken, StreamConnector,
};
use slackwatch_runtime::{ConnectionSupervisor, ShutdownSignal, SlackWatchRuntimeConfig};
use tokio::sync::watch;

const CREATED_FRAME: &str = r#"{"type":"channel_created","channel":{"id":"C1","name":"general"}}"#;
const RENAMED_FRAME: &str = r#"{"type":"channel_rename","channel":{"id":"C1","name":"general2"}}"#;

fn targets() -> NotificationTargets {
    NotificationTargets {
        default_username: "watcher".to_string(),
        emoji_watch_channel: "CEMOJI".to_string(),
        channel_watch_channel: "CCHAN".to_string(),
        debug_channel: "CDEBUG".to_string(),
    }
}

fn client(server: &MockServer) -> SlackApiClient {
    SlackApiClient::new(server.base_url(), SlackToken::new("xoxb-test"), 2_000, 1, 1)
        .expect("client")
}

struct ScriptedStream {
    frames: VecDeque<String>,
}

#[async_trait]
impl EventStream for ScriptedStream {
    async fn next_frame(&mut self) -> Option<Result<String>> {
        self.frames.pop_front().map(Ok)
    }
}

/// Requests shutdown on the first read, then never yields a frame.
struct HangingStream {
    shutdown_tx: Arc<watch::Sender<bool>>,
}

#[async_trait]
impl EventStream for HangingStream {
    async fn next_frame(&mut self) -> Option<Result<String>> {
        let _ = self.shutdown_tx.send(true);
        std::future::pending().await
    }
}

/// First connect replays the scripted frames; the next one hangs until shutdown.
struct OneSessionConnector {
    frames: Mutex<Option<Vec<String>>>,
    connects: AtomicUsize,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

#[async_trait]
impl StreamConnector for OneSessionConnector {
    async fn connect(&self, _url: &str) -> Result<Box<dyn EventStream>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        match self.frames.lock().expect("frames lock").take() {
            Some(frames) => Ok(Box::new(ScriptedStream {
                frames: frames.into(),
            })),
            None => Ok(Box::new(HangingStream {
                shutdown_tx: self.shutdown_tx.clone(),
            })),
        }
    }
}

#[tokio::test]
async fn integration_router_applies_create_then_rename_against_slack_api() {
    let server = MockServer::start();
    let created = server.mock(|when, then| {
        when.method(POST)
            .path("/chat.postMessage")
            .body_includes("\"channel\":\"CCHAN\"")
            .body_includes(":hatching_chick: Created: <#C1|general>");
        then.status(200).json_body(json!({"ok": true}));
    });
    let renamed = server.mock(|when, then| {
        when.method(POST)
            .path("/chat.postMessage")
            .body_includes("\"channel\":\"CCHAN\"")
            .body_includes("(#general :arrow_right: #general2)");
        then.status(200).json_body(json!({"ok": true}));
    });

    let router = EventRouter::new(Notifier::new(Arc::new(client(&server))), targets());
    let mut directory = ChannelDirectory::new();
    let first = router.route_frame(&mut directory, CREATED_FRAME).await;
    let second = router.route_frame(&mut directory, RENAMED_FRAME).await;

    let handled = RouteOutcome::Handled {
        published: 1,
        failed: 0,
    };
    assert_eq!(first, handled);
    assert_eq!(second, handled);
    created.assert_calls(1);
    renamed.assert_calls(1);
    assert_eq!(
        directory.as_map(),
        &HashMap::from([("C1".to_string(), "general2".to_string())])
    );
}

#[tokio::test]
async fn integration_supervisor_streams_frames_and_reconnects_against_slack_api() {
    let server = MockServer::start();
    let listing = server.mock(|when, then| {
        when.method(GET).path("/conversations.list");
        then.status(200).json_body(json!({
            "ok": true,
            "channels": [],
            "response_metadata": {"next_cursor": ""}
        }));
    });
    let handshake = server.mock(|when, then| {
        when.method(GET).path("/rtm.connect");
        then.status(200)
            .json_body(json!({"ok": true, "url": "wss://rtm.example/websocket"}));
    });
    let operations = server.mock(|when, then| {
        when.method(POST)
            .path("/chat.postMessage")
            .body_includes("\"channel\":\"CDEBUG\"");
        then.status(200).json_body(json!({"ok": true}));
    });
    let created = server.mock(|when, then| {
        when.method(POST)
            .path("/chat.postMessage")
            .body_includes("Created: <#C1|general>");
        then.status(200).json_body(json!({"ok": true}));
    });
    let renamed = server.mock(|when, then| {
        when.method(POST)
            .path("/chat.postMessage")
            .body_includes("Renamed: <#C1|general2> (#general :arrow_right: #general2)");
        then.status(200).json_body(json!({"ok": true}));
    });

    let (shutdown_tx, shutdown) = ShutdownSignal::channel();
    let connector = Arc::new(OneSessionConnector {
        frames: Mutex::new(Some(vec![
            CREATED_FRAME.to_string(),
            RENAMED_FRAME.to_string(),
        ])),
        connects: AtomicUsize::new(0),
        shutdown_tx: Arc::new(shutdown_tx),
    });
    let config = SlackWatchRuntimeConfig {
        api_base: server.base_url(),
        token: SlackToken::new("xoxb-test"),
        targets: targets(),
        reconnect_delay: Duration::from_millis(10),
        channel_page_delay: Duration::from_millis(1),
        channel_page_size: 1_000,
        request_timeout_ms: 2_000,
        retry_max_attempts: 1,
        retry_base_delay_ms: 1,
    };
    let mut supervisor =
        ConnectionSupervisor::new(config, Arc::new(client(&server)), connector.clone());

    tokio::time::timeout(Duration::from_secs(10), supervisor.run(shutdown))
        .await
        .expect("supervisor should stop on shutdown")
        .expect("no fatal error");

    assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
    listing.assert_calls(2);
    handshake.assert_calls(2);
    created.assert_calls(1);
    renamed.assert_calls(1);
    // opened + closed for the first session, opened for the second.
    operations.assert_calls(3);
    let report = supervisor.last_session().expect("first session report");
    assert_eq!(report.events_handled, 2);
    assert_eq!(report.notifications_published, 2);
}
