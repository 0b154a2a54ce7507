use async_trait::async_trait;
use url::Url;

use crate::error::{ConnectorError, SinkError, SubscriberError};
use crate::record::TickerRecord;

/// Receives every raw frame forwarded by an [`EventBus`](crate::bus::EventBus).
///
/// Called synchronously on the feed reader's task, so a slow subscriber
/// stalls the feed.
pub trait Subscriber: Send + Sync {
    /// Handle one raw UTF-8 message
    fn update(&self, message: &str) -> Result<(), SubscriberError>;

    /// Name used in attach/detach logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Opens sessions to the ticker feed (WebSocket in production, scripted in tests)
#[async_trait]
pub trait Connector: Send + Sync {
    /// Perform the handshake and return a live session
    async fn connect(&self, url: &Url) -> Result<Box<dyn Session>, ConnectorError>;
}

/// One live connection, from successful handshake to close or failure
#[async_trait]
pub trait Session: Send {
    /// Wait for the next text payload.
    /// Returns `ConnectorError::ConnectionClosed` when the peer closes.
    async fn recv(&mut self) -> Result<String, ConnectorError>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), ConnectorError>;
}

/// Persistent destination for a symbol's full record batch
pub trait BatchSink: Send {
    /// Replace whatever the sink holds for `symbol` with `records`
    fn write_batch(&mut self, symbol: &str, records: &[TickerRecord]) -> Result<(), SinkError>;
}
