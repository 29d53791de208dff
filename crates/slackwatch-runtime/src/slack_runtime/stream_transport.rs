//! RTM websocket transport behind a small receive-only trait seam.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};

#[async_trait]
/// One live stream session. `None` means the peer closed the stream.
pub trait EventStream: Send {
    async fn next_frame(&mut self) -> Option<Result<String>>;
}

#[async_trait]
pub trait StreamConnector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn EventStream>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl StreamConnector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn EventStream>> {
        let (stream, _response) = connect_async(url)
            .await
            .with_context(|| "failed to connect slack rtm websocket")?;
        Ok(Box::new(WebSocketEventStream { inner: stream }))
    }
}

struct WebSocketEventStream {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl EventStream for WebSocketEventStream {
    async fn next_frame(&mut self) -> Option<Result<String>> {
        loop {
            let message = match self.inner.next().await? {
                Ok(message) => message,
                Err(error) => {
                    return Some(Err(error).context("failed reading slack rtm websocket message"))
                }
            };
            match frame_text(message) {
                FrameText::Text(text) => return Some(Ok(text)),
                FrameText::Closed => return None,
                FrameText::Control => continue,
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum FrameText {
    Text(String),
    Closed,
    Control,
}

fn frame_text(message: WsMessage) -> FrameText {
    match message {
        WsMessage::Text(text) => FrameText::Text(text.as_str().to_string()),
        WsMessage::Binary(bytes) => FrameText::Text(String::from_utf8_lossy(&bytes).into_owned()),
        WsMessage::Close(_) => FrameText::Closed,
        WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => FrameText::Control,
    }
}
