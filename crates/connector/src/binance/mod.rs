//! Binance spot ticker stream
//!
//! Public `<symbol>@ticker` streams need no authentication or subscribe
//! command: the stream is selected by the URL.

pub mod messages;

pub use messages::TickerFrame;
