//! tickcap-connector: Ticker capture runtime components
//!
//! A stream client holds one WebSocket connection per symbol and pushes every
//! raw frame through an event bus. The record processor subscribes to the bus,
//! turns frames into ticker records and persists the growing batch.

pub mod binance;
pub mod bus;
pub mod client;
pub mod error;
pub mod metrics;
pub mod processor;
pub mod record;
pub mod server;
pub mod sink;
pub mod traits;
pub mod websocket;

pub use bus::EventBus;
pub use client::{ConnectionState, StreamClient, RECONNECT_DELAY};
pub use error::{ConnectorError, ParseError, SinkError, SubscriberError};
pub use processor::{BatchStatus, RecordProcessor, DEFAULT_FLUSH_EVERY};
pub use record::{TickerRecord, COLUMNS};
pub use server::{create_router, run_server, CaptureStatus, ServerState};
pub use sink::CsvSink;
pub use traits::{BatchSink, Connector, Session, Subscriber};
pub use websocket::{WebSocketConnector, WebSocketSession};
