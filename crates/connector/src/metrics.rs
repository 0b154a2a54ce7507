//! Prometheus metrics for the connector
//!
//! Per-feed metrics for the stream connection and the record batch.

use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter_vec, register_int_gauge_vec, Encoder, IntCounterVec, IntGaugeVec,
    TextEncoder,
};

const LABEL_FEED: &str = "feed";
const LABEL_SYMBOL: &str = "symbol";

static FRAMES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "tickcap_frames_total",
        "Frames received from the feed",
        &[LABEL_FEED, LABEL_SYMBOL]
    )
    .expect("Failed to register frames_total metric")
});

static FRAMES_REJECTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "tickcap_frames_rejected_total",
        "Frames a subscriber failed to handle",
        &[LABEL_FEED, LABEL_SYMBOL]
    )
    .expect("Failed to register frames_rejected_total metric")
});

static CONNECT_ATTEMPTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "tickcap_connect_attempts_total",
        "Connection attempts to the feed",
        &[LABEL_FEED, LABEL_SYMBOL]
    )
    .expect("Failed to register connect_attempts_total metric")
});

/// 1 = connected, 0 = disconnected
static CONNECTED: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "tickcap_websocket_connected",
        "WebSocket connection status (1=connected, 0=disconnected)",
        &[LABEL_FEED, LABEL_SYMBOL]
    )
    .expect("Failed to register websocket_connected metric")
});

static RECORDS_BUFFERED: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "tickcap_records_buffered",
        "Records held in the in-memory batch",
        &[LABEL_SYMBOL]
    )
    .expect("Failed to register records_buffered metric")
});

static FLUSHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "tickcap_flushes_total",
        "Successful batch flushes",
        &[LABEL_SYMBOL]
    )
    .expect("Failed to register flushes_total metric")
});

static FLUSH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "tickcap_flush_failures_total",
        "Batch flushes that failed to write",
        &[LABEL_SYMBOL]
    )
    .expect("Failed to register flush_failures_total metric")
});

/// Handle for recording stream metrics for one feed/symbol
#[derive(Clone)]
pub struct StreamMetrics {
    feed: String,
    symbol: String,
}

impl StreamMetrics {
    pub fn new(feed: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            feed: feed.into(),
            symbol: symbol.into(),
        }
    }

    fn labels(&self) -> [&str; 2] {
        [self.feed.as_str(), self.symbol.as_str()]
    }

    pub fn inc_frames(&self) {
        FRAMES_TOTAL.with_label_values(&self.labels()).inc();
    }

    pub fn inc_rejected(&self) {
        FRAMES_REJECTED_TOTAL.with_label_values(&self.labels()).inc();
    }

    pub fn inc_connect_attempts(&self) {
        CONNECT_ATTEMPTS_TOTAL.with_label_values(&self.labels()).inc();
    }

    pub fn set_connected(&self) {
        CONNECTED.with_label_values(&self.labels()).set(1);
    }

    pub fn set_disconnected(&self) {
        CONNECTED.with_label_values(&self.labels()).set(0);
    }
}

/// Handle for recording batch metrics for one symbol
#[derive(Clone)]
pub struct BatchMetrics {
    symbol: String,
}

impl BatchMetrics {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
        }
    }

    pub fn set_buffered(&self, count: usize) {
        RECORDS_BUFFERED
            .with_label_values(&[&self.symbol])
            .set(count as i64);
    }

    pub fn inc_flushes(&self) {
        FLUSHES_TOTAL.with_label_values(&[&self.symbol]).inc();
    }

    pub fn inc_flush_failures(&self) {
        FLUSH_FAILURES_TOTAL.with_label_values(&[&self.symbol]).inc();
    }
}

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| {
        prometheus::Error::Msg(format!("Failed to encode metrics as UTF-8: {}", e))
    })
}
