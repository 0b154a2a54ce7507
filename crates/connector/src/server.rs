//! Health server for the capture process
//!
//! `/health` reports connection and batch progress, `/ready` gates on the
//! stream being connected, `/metrics` serves Prometheus text.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::metrics::encode_metrics;
use crate::processor::BatchStatus;

/// Snapshot of one symbol's capture
#[derive(Debug, Serialize)]
pub struct CaptureStatus {
    pub status: &'static str,
    pub feed: String,
    pub symbol: String,
    pub connected: bool,
    pub records_buffered: usize,
    pub records_flushed: usize,
    pub last_flush_ok: bool,
}

/// Handles the server reads from the client and the processor
#[derive(Clone)]
pub struct ServerState {
    pub feed_name: String,
    pub symbol: String,
    pub connected: Arc<AtomicBool>,
    pub batch: Arc<BatchStatus>,
}

impl ServerState {
    pub fn new(
        feed_name: impl Into<String>,
        symbol: impl Into<String>,
        connected: Arc<AtomicBool>,
        batch: Arc<BatchStatus>,
    ) -> Self {
        Self {
            feed_name: feed_name.into(),
            symbol: symbol.into(),
            connected,
            batch,
        }
    }

    fn snapshot(&self, status: &'static str) -> CaptureStatus {
        CaptureStatus {
            status,
            feed: self.feed_name.clone(),
            symbol: self.symbol.clone(),
            connected: self.connected.load(Ordering::SeqCst),
            records_buffered: self.batch.buffered(),
            records_flushed: self.batch.flushed(),
            last_flush_ok: !self.batch.last_flush_failed(),
        }
    }
}

/// Always 200; `degraded` when the last flush failed
async fn health(State(state): State<ServerState>) -> Json<CaptureStatus> {
    let status = if state.batch.last_flush_failed() {
        "degraded"
    } else {
        "ok"
    };
    Json(state.snapshot(status))
}

async fn ready(State(state): State<ServerState>) -> (StatusCode, Json<CaptureStatus>) {
    if state.connected.load(Ordering::SeqCst) {
        (StatusCode::OK, Json(state.snapshot("ready")))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(state.snapshot("not_ready")),
        )
    }
}

async fn metrics() -> impl IntoResponse {
    match encode_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain")],
            e.to_string(),
        ),
    }
}

pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics))
        .with_state(state)
}

pub async fn run_server(addr: SocketAddr, state: ServerState) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, create_router(state)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binance::messages::tests::TICKER_FRAME;
    use crate::error::SinkError;
    use crate::processor::RecordProcessor;
    use crate::record::TickerRecord;
    use crate::traits::{BatchSink, Subscriber};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    struct NullSink {
        fail: bool,
    }

    impl BatchSink for NullSink {
        fn write_batch(&mut self, _symbol: &str, _records: &[TickerRecord]) -> Result<(), SinkError> {
            if self.fail {
                Err(SinkError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )))
            } else {
                Ok(())
            }
        }
    }

    /// Processor with `records` frames pushed, flushing every 2
    fn processor(records: usize, fail: bool) -> RecordProcessor<NullSink> {
        let processor = RecordProcessor::new("btcusdt", NullSink { fail }, 2);
        for _ in 0..records {
            processor.update(TICKER_FRAME).unwrap();
        }
        processor
    }

    fn state(connected: bool, processor: &RecordProcessor<NullSink>) -> ServerState {
        ServerState::new(
            "binance",
            processor.symbol(),
            Arc::new(AtomicBool::new(connected)),
            processor.status_handle(),
        )
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_reports_batch_progress() {
        let processor = processor(3, false);
        let (status, body) = get_json(create_router(state(false, &processor)), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["feed"], "binance");
        assert_eq!(body["symbol"], "btcusdt");
        assert_eq!(body["connected"], false);
        assert_eq!(body["records_buffered"], 3);
        assert_eq!(body["records_flushed"], 2);
        assert_eq!(body["last_flush_ok"], true);
    }

    #[tokio::test]
    async fn test_health_degraded_after_failed_flush() {
        let processor = processor(2, true);
        let (status, body) = get_json(create_router(state(true, &processor)), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["records_buffered"], 2);
        assert_eq!(body["records_flushed"], 0);
        assert_eq!(body["last_flush_ok"], false);
    }

    #[tokio::test]
    async fn test_ready_follows_connection() {
        let processor = processor(0, false);
        let connected = Arc::new(AtomicBool::new(false));
        let state = ServerState::new(
            "binance",
            "btcusdt",
            Arc::clone(&connected),
            processor.status_handle(),
        );
        let app = create_router(state);

        let (status, body) = get_json(app.clone(), "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "not_ready");

        connected.store(true, Ordering::SeqCst);
        let (status, body) = get_json(app, "/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let processor = processor(2, false);
        let app = create_router(state(true, &processor));

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("tickcap_flushes_total"));
    }
}
