use crate::core::errors::UpbitError;
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream};
use tracing::{instrument, warn};

type Stream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket session trait - pure transport layer
///
/// A session can be connected again after it was closed or dropped by the peer;
/// the streaming manager relies on that to reconnect.
#[async_trait]
pub trait WsSession: Send + 'static {
    /// Open the connection, sending `headers` with the upgrade request
    async fn connect(&mut self, headers: &[(String, String)]) -> Result<(), UpbitError>;

    /// Send a raw message
    async fn send_raw(&mut self, msg: Message) -> Result<(), UpbitError>;

    /// Receive the next data message; `None` once the peer closed the connection
    async fn next_raw(&mut self) -> Option<Result<Message, UpbitError>>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), UpbitError>;

    /// Check if the connection is alive
    fn is_connected(&self) -> bool;
}

/// Tungstenite-based WebSocket implementation
pub struct TungsteniteWs {
    url: String,
    connect_timeout: Duration,
    write: Option<SplitSink<Stream, Message>>,
    read: Option<SplitStream<Stream>>,
    connected: bool,
    connections: u32,
}

impl TungsteniteWs {
    pub fn new(url: String) -> Self {
        Self {
            url,
            connect_timeout: Duration::from_secs(10),
            write: None,
            read: None,
            connected: false,
            connections: 0,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Number of successful connects so far
    pub fn connections(&self) -> u32 {
        self.connections
    }

    fn drop_stream(&mut self) {
        self.connected = false;
        self.write = None;
        self.read = None;
    }
}

#[async_trait]
impl WsSession for TungsteniteWs {
    #[instrument(skip(self, headers), fields(exchange = "upbit", url = %self.url))]
    async fn connect(&mut self, headers: &[(String, String)]) -> Result<(), UpbitError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| UpbitError::WebSocket(format!("Invalid WebSocket URL: {}", e)))?;

        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| UpbitError::WebSocket(format!("Invalid header name: {}", e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| UpbitError::WebSocket(format!("Invalid header value: {}", e)))?;
            request.headers_mut().insert(name, value);
        }

        let (stream, _) = tokio::time::timeout(self.connect_timeout, connect_async(request))
            .await
            .map_err(|_| UpbitError::Network("WebSocket connection timeout".to_string()))?
            .map_err(|e| UpbitError::WebSocket(format!("WebSocket connection failed: {}", e)))?;

        let (write, read) = stream.split();
        self.write = Some(write);
        self.read = Some(read);
        self.connected = true;
        self.connections += 1;
        Ok(())
    }

    async fn send_raw(&mut self, msg: Message) -> Result<(), UpbitError> {
        let write = match self.write.as_mut() {
            Some(write) if self.connected => write,
            _ => return Err(UpbitError::WebSocket("WebSocket not connected".to_string())),
        };

        if let Err(e) = write.send(msg).await {
            self.drop_stream();
            return Err(UpbitError::WebSocket(format!(
                "Failed to send WebSocket message: {}",
                e
            )));
        }
        Ok(())
    }

    async fn next_raw(&mut self) -> Option<Result<Message, UpbitError>> {
        loop {
            let read = self.read.as_mut()?;

            match read.next().await {
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = self.send_raw(Message::Pong(data)).await {
                        warn!("Failed to send pong response: {}", e);
                    }
                }
                Some(Ok(Message::Pong(_) | Message::Frame(_))) => {}
                Some(Ok(Message::Close(_))) | None => {
                    self.drop_stream();
                    return None;
                }
                Some(Ok(message)) => return Some(Ok(message)),
                Some(Err(e)) => {
                    self.drop_stream();
                    return Some(Err(UpbitError::WebSocket(format!("WebSocket error: {}", e))));
                }
            }
        }
    }

    #[instrument(skip(self), fields(exchange = "upbit", url = %self.url))]
    async fn close(&mut self) -> Result<(), UpbitError> {
        if let Some(write) = self.write.as_mut() {
            let _ = write.send(Message::Close(None)).await;
        }
        self.drop_stream();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
