//! Binance 24hr ticker stream frame
//!
//! Field names follow Binance's single-letter keys. Prices and quantities
//! arrive as numeric strings and are kept exact as `Decimal`. Times and ids
//! are integers, but are also accepted as numeric strings.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

/// Accept `123` or `"123"`
fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(i64),
        Str(String),
    }

    match IntOrString::deserialize(deserializer)? {
        IntOrString::Int(v) => Ok(v),
        IntOrString::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// One `<symbol>@ticker` update. Unknown keys are ignored.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TickerFrame {
    /// Event time, epoch ms
    #[serde(rename = "E", deserialize_with = "lenient_i64")]
    pub event_time: i64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "p")]
    pub price_change: Decimal,
    #[serde(rename = "P")]
    pub price_change_percent: Decimal,
    #[serde(rename = "w")]
    pub weighted_avg_price: Decimal,
    #[serde(rename = "x")]
    pub first_trade_price: Decimal,
    #[serde(rename = "c")]
    pub last_price: Decimal,
    #[serde(rename = "Q")]
    pub last_quantity: Decimal,
    #[serde(rename = "b")]
    pub best_bid_price: Decimal,
    #[serde(rename = "B")]
    pub best_bid_quantity: Decimal,
    #[serde(rename = "a")]
    pub best_ask_price: Decimal,
    #[serde(rename = "A")]
    pub best_ask_quantity: Decimal,
    #[serde(rename = "o")]
    pub open_price: Decimal,
    #[serde(rename = "h")]
    pub high_price: Decimal,
    #[serde(rename = "l")]
    pub low_price: Decimal,
    #[serde(rename = "v")]
    pub base_asset_volume: Decimal,
    #[serde(rename = "q")]
    pub quote_asset_volume: Decimal,
    /// Statistics window open, epoch ms
    #[serde(rename = "O", deserialize_with = "lenient_i64")]
    pub stats_open_time: i64,
    /// Statistics window close, epoch ms
    #[serde(rename = "C", deserialize_with = "lenient_i64")]
    pub stats_close_time: i64,
    #[serde(rename = "F", deserialize_with = "lenient_i64")]
    pub first_trade_id: i64,
    #[serde(rename = "L", deserialize_with = "lenient_i64")]
    pub last_trade_id: i64,
    #[serde(rename = "n", deserialize_with = "lenient_i64")]
    pub trade_count: i64,
}

impl TickerFrame {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::str::FromStr;

    /// Real-shaped Binance frame (ids as integers, extra keys present)
    pub(crate) const TICKER_FRAME: &str = r#"{"e":"24hrTicker","E":1700000000000,"s":"BTCUSDT","p":"0.001","P":"0.1","w":"45000.0","x":"44999.0","c":"45001.0","Q":"0.2","b":"45000.5","B":"0.1","a":"45001.5","A":"0.1","o":"44000.0","h":"46000.0","l":"43000.0","v":"1000.0","q":"45000000.0","O":1699913600000,"C":1700000000000,"F":100,"L":200,"n":150}"#;

    #[test]
    fn test_parse_ticker_frame() {
        let frame = TickerFrame::parse(TICKER_FRAME).unwrap();

        assert_eq!(frame.event_time, 1_700_000_000_000);
        assert_eq!(frame.symbol, "BTCUSDT");
        assert_eq!(frame.price_change, Decimal::from_str("0.001").unwrap());
        assert_eq!(frame.price_change_percent, Decimal::from_str("0.1").unwrap());
        assert_eq!(frame.last_price, Decimal::from_str("45001.0").unwrap());
        assert_eq!(frame.best_ask_price, Decimal::from_str("45001.5").unwrap());
        assert_eq!(frame.quote_asset_volume, Decimal::from_str("45000000.0").unwrap());
        assert_eq!(frame.stats_open_time, 1_699_913_600_000);
        assert_eq!(frame.first_trade_id, 100);
        assert_eq!(frame.last_trade_id, 200);
        assert_eq!(frame.trade_count, 150);
    }

    #[test]
    fn test_ids_as_numeric_strings() {
        let raw = TICKER_FRAME
            .replace(r#""F":100"#, r#""F":"100""#)
            .replace(r#""L":200"#, r#""L":"200""#)
            .replace(r#""n":150"#, r#""n":"150""#);
        let frame = TickerFrame::parse(&raw).unwrap();

        assert_eq!(frame.first_trade_id, 100);
        assert_eq!(frame.last_trade_id, 200);
        assert_eq!(frame.trade_count, 150);
    }

    #[test]
    fn test_missing_key_fails() {
        let raw = TICKER_FRAME.replace(r#""s":"BTCUSDT","#, "");
        assert!(TickerFrame::parse(&raw).is_err());
    }

    #[test]
    fn test_malformed_number_fails() {
        let raw = TICKER_FRAME.replace(r#""c":"45001.0""#, r#""c":"not-a-price""#);
        assert!(TickerFrame::parse(&raw).is_err());

        let raw = TICKER_FRAME.replace(r#""n":150"#, r#""n":"many""#);
        assert!(TickerFrame::parse(&raw).is_err());
    }

    #[test]
    fn test_not_json_fails() {
        assert!(TickerFrame::parse("message").is_err());
    }
}
