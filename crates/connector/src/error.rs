use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("timestamp out of range: {0}")]
    Timestamp(i64),
}

/// Returned by a subscriber that could not handle a message
#[derive(Error, Debug)]
pub enum SubscriberError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("subscriber failed: {0}")]
    Failed(String),
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}
