//! Resilient single-connection stream client
//!
//! Drives `Disconnected -> Connecting -> Connected -> Disconnected` forever.
//! A refused connect, a read error and a peer close all end up in the same
//! place: wait the fixed reconnect delay, then connect again. There is no
//! backoff growth and no retry cap. The loop only ends on shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tokio::sync::watch;
use tracing::{error, info, warn};
use url::Url;

use tickcap_metadata::FeedConfig;

use crate::bus::EventBus;
use crate::error::ConnectorError;
use crate::metrics::StreamMetrics;
use crate::traits::{Connector, Session};

/// Fixed delay between connection attempts
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Why a session's receive loop ended
enum SessionEnd {
    Shutdown,
    Closed,
    Failed(ConnectorError),
}

/// Resolves once shutdown is requested. Never resolves if the sender is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

pub struct StreamClient<C: Connector> {
    feed_name: String,
    symbol: String,
    url: Url,
    connector: C,
    bus: EventBus,
    reconnect_delay: Duration,
    state: ConnectionState,
    connected: Arc<AtomicBool>,
    metrics: StreamMetrics,
}

impl<C: Connector> StreamClient<C> {
    /// Client for the feed's stream URL with the configured reconnect delay
    pub fn new(config: &FeedConfig, connector: C) -> Result<Self, ConnectorError> {
        let url = config
            .stream_url()
            .map_err(|e| ConnectorError::InvalidUrl(e.to_string()))?;
        Ok(Self::with_url(
            config.name.clone(),
            config.symbol.clone(),
            url,
            connector,
            config.reconnect_delay(),
        ))
    }

    pub fn with_url(
        feed_name: impl Into<String>,
        symbol: impl Into<String>,
        url: Url,
        connector: C,
        reconnect_delay: Duration,
    ) -> Self {
        let feed_name = feed_name.into();
        let symbol = symbol.into();
        Self {
            metrics: StreamMetrics::new(feed_name.clone(), symbol.clone()),
            feed_name,
            symbol,
            url,
            connector,
            bus: EventBus::new(),
            reconnect_delay,
            state: ConnectionState::Disconnected,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// Returns a handle to the connected status
    pub fn connected_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.connected)
    }

    fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
        let connected = state == ConnectionState::Connected;
        self.connected.store(connected, Ordering::SeqCst);
        if connected {
            self.metrics.set_connected();
        } else {
            self.metrics.set_disconnected();
        }
    }

    /// Connect and keep reconnecting until `shutdown` turns true
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), ConnectorError> {
        loop {
            if *shutdown.borrow() {
                break;
            }

            self.set_state(ConnectionState::Connecting);
            self.metrics.inc_connect_attempts();
            info!(feed = %self.feed_name, url = %self.url, "Connecting");

            let attempt = select! {
                _ = shutdown_requested(&mut shutdown) => break,
                result = self.connector.connect(&self.url) => result,
            };

            match attempt {
                Ok(mut session) => {
                    self.set_state(ConnectionState::Connected);
                    info!(feed = %self.feed_name, symbol = %self.symbol, "WebSocket connection opened");

                    let end = self.receive(session.as_mut(), &mut shutdown).await;
                    self.set_state(ConnectionState::Disconnected);

                    match end {
                        SessionEnd::Shutdown => {
                            if let Err(e) = session.close().await {
                                warn!(error = %e, "Error closing WebSocket");
                            }
                            break;
                        }
                        SessionEnd::Closed => {
                            warn!(feed = %self.feed_name, symbol = %self.symbol, "WebSocket connection closed unexpectedly");
                        }
                        SessionEnd::Failed(e) => {
                            error!(feed = %self.feed_name, symbol = %self.symbol, error = %e, "WebSocket error");
                            session.close().await.ok();
                        }
                    }
                }
                Err(e) => {
                    self.set_state(ConnectionState::Disconnected);
                    error!(feed = %self.feed_name, url = %self.url, error = %e, "Connection attempt failed");
                }
            }

            info!(
                delay_secs = self.reconnect_delay.as_secs_f64(),
                "Attempting to reconnect"
            );
            select! {
                _ = shutdown_requested(&mut shutdown) => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        self.set_state(ConnectionState::Disconnected);
        info!(feed = %self.feed_name, symbol = %self.symbol, "Stream client stopped");
        Ok(())
    }

    /// Forward every frame to the bus until the session ends.
    /// A subscriber failure drops that frame only.
    async fn receive(
        &self,
        session: &mut dyn Session,
        shutdown: &mut watch::Receiver<bool>,
    ) -> SessionEnd {
        loop {
            let frame = select! {
                _ = shutdown_requested(shutdown) => return SessionEnd::Shutdown,
                frame = session.recv() => frame,
            };

            match frame {
                Ok(text) => {
                    self.metrics.inc_frames();
                    if let Err(e) = self.bus.notify(&text) {
                        self.metrics.inc_rejected();
                        warn!(symbol = %self.symbol, error = %e, "Dropping frame a subscriber could not handle");
                    }
                }
                Err(ConnectorError::ConnectionClosed) => return SessionEnd::Closed,
                Err(e) => return SessionEnd::Failed(e),
            }
        }
    }
}
