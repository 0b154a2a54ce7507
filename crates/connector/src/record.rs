//! Structured ticker snapshot derived from one raw frame

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::binance::TickerFrame;
use crate::error::ParseError;

/// Column headers in record field order
pub const COLUMNS: [&str; 23] = [
    "Event Time",
    "Symbol",
    "Price Change",
    "Price Change Percent",
    "Weighted Average Price",
    "First Trade Price",
    "Last Price",
    "Last Quantity",
    "Best Bid Price",
    "Best Bid Quantity",
    "Best Ask Price",
    "Best Ask Quantity",
    "Open Price",
    "High Price",
    "Low Price",
    "Total Traded Base Asset Volume",
    "Total Traded Quote Asset Volume",
    "Statistics Open Time",
    "Statistics Close Time",
    "First Trade ID",
    "Last Trade ID",
    "Total Number of Trades",
    "Latency",
];

const EVENT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
const STATS_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub struct TickerRecord {
    pub event_time: DateTime<Utc>,
    pub symbol: String,
    pub price_change: Decimal,
    pub price_change_percent: Decimal,
    pub weighted_avg_price: Decimal,
    pub first_trade_price: Decimal,
    pub last_price: Decimal,
    pub last_quantity: Decimal,
    pub best_bid_price: Decimal,
    pub best_bid_quantity: Decimal,
    pub best_ask_price: Decimal,
    pub best_ask_quantity: Decimal,
    pub open_price: Decimal,
    pub high_price: Decimal,
    pub low_price: Decimal,
    pub base_asset_volume: Decimal,
    pub quote_asset_volume: Decimal,
    pub stats_open_time: DateTime<Utc>,
    pub stats_close_time: DateTime<Utc>,
    pub first_trade_id: i64,
    pub last_trade_id: i64,
    pub trade_count: i64,
    /// Processing time minus event time. Negative under clock skew.
    pub ingestion_latency_ms: i64,
}

fn millis_to_utc(ms: i64) -> Result<DateTime<Utc>, ParseError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or(ParseError::Timestamp(ms))
}

impl TickerRecord {
    /// Parse a raw frame, stamping latency against the current wall clock
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let frame = TickerFrame::parse(raw)?;
        Self::from_frame(frame, Utc::now().timestamp_millis())
    }

    /// Build a record from a decoded frame processed at `now_ms`
    pub fn from_frame(frame: TickerFrame, now_ms: i64) -> Result<Self, ParseError> {
        Ok(Self {
            event_time: millis_to_utc(frame.event_time)?,
            ingestion_latency_ms: now_ms - frame.event_time,
            stats_open_time: millis_to_utc(frame.stats_open_time)?,
            stats_close_time: millis_to_utc(frame.stats_close_time)?,
            symbol: frame.symbol,
            price_change: frame.price_change,
            price_change_percent: frame.price_change_percent,
            weighted_avg_price: frame.weighted_avg_price,
            first_trade_price: frame.first_trade_price,
            last_price: frame.last_price,
            last_quantity: frame.last_quantity,
            best_bid_price: frame.best_bid_price,
            best_bid_quantity: frame.best_bid_quantity,
            best_ask_price: frame.best_ask_price,
            best_ask_quantity: frame.best_ask_quantity,
            open_price: frame.open_price,
            high_price: frame.high_price,
            low_price: frame.low_price,
            base_asset_volume: frame.base_asset_volume,
            quote_asset_volume: frame.quote_asset_volume,
            first_trade_id: frame.first_trade_id,
            last_trade_id: frame.last_trade_id,
            trade_count: frame.trade_count,
        })
    }

    /// Render as one output row, in [`COLUMNS`] order
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.event_time.format(EVENT_TIME_FORMAT).to_string(),
            self.symbol.clone(),
            self.price_change.to_string(),
            self.price_change_percent.to_string(),
            self.weighted_avg_price.to_string(),
            self.first_trade_price.to_string(),
            self.last_price.to_string(),
            self.last_quantity.to_string(),
            self.best_bid_price.to_string(),
            self.best_bid_quantity.to_string(),
            self.best_ask_price.to_string(),
            self.best_ask_quantity.to_string(),
            self.open_price.to_string(),
            self.high_price.to_string(),
            self.low_price.to_string(),
            self.base_asset_volume.to_string(),
            self.quote_asset_volume.to_string(),
            self.stats_open_time.format(STATS_TIME_FORMAT).to_string(),
            self.stats_close_time.format(STATS_TIME_FORMAT).to_string(),
            self.first_trade_id.to_string(),
            self.last_trade_id.to_string(),
            self.trade_count.to_string(),
            self.ingestion_latency_ms.to_string(),
        ]
    }
}
