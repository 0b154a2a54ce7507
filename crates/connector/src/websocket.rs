//! WebSocket transport for the ticker feed
//!
//! No authentication or subscribe handshake: the stream is selected by URL.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::ConnectorError;
use crate::traits::{Connector, Session};

/// Opens `tokio-tungstenite` sessions
#[derive(Debug, Default, Clone)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Session>, ConnectorError> {
        match url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(ConnectorError::InvalidUrl(format!(
                    "unsupported scheme {} in {}",
                    other, url
                )))
            }
        }

        let (ws, response) = connect_async(url.as_str())
            .await
            .map_err(|e| ConnectorError::ConnectionFailed(e.to_string()))?;

        debug!(url = %url, status = ?response.status(), "WebSocket handshake complete");

        Ok(Box::new(WebSocketSession { ws }))
    }
}

/// One live WebSocket connection
pub struct WebSocketSession {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Session for WebSocketSession {
    async fn recv(&mut self) -> Result<String, ConnectorError> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text),
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                    Ok(text) => return Ok(text),
                    Err(e) => {
                        // Frame-level problem, the connection itself is fine
                        warn!(error = %e, "Dropping non UTF-8 binary frame");
                        continue;
                    }
                },
                Some(Ok(Message::Ping(data))) => {
                    trace!("Received WS ping, sending pong");
                    self.ws.send(Message::Pong(data)).await?;
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(frame = ?frame, "WebSocket close frame received");
                    return Err(ConnectorError::ConnectionClosed);
                }
                Some(Ok(_)) => continue,
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                    return Err(ConnectorError::ConnectionClosed);
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Err(ConnectorError::ConnectionClosed),
            }
        }
    }

    async fn close(&mut self) -> Result<(), ConnectorError> {
        self.ws.close(None).await?;
        Ok(())
    }
}
