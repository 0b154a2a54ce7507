//! tickcap-connector: Ticker capture binary
//!
//! Streams one symbol's 24hr ticker, buffers parsed records and rewrites
//! the symbol's CSV every time the batch crosses the flush threshold.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tickcap_connector_lib::{
    run_server, CsvSink, RecordProcessor, ServerState, StreamClient, WebSocketConnector,
};
use tickcap_metadata::FeedConfig;

#[derive(Parser, Debug)]
#[command(name = "tickcap-connector")]
#[command(about = "Binance ticker capture to CSV")]
struct Args {
    /// Path to feed configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Trading pair, e.g. btcusdt (ignored when --config is given)
    #[arg(short, long, env = "TICKCAP_SYMBOL", default_value = "btcusdt")]
    symbol: String,

    /// Override the output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Health server bind address, e.g. 0.0.0.0:8080
    #[arg(long)]
    health_addr: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match args.config {
        Some(ref path) => {
            let config = FeedConfig::load(path)?;
            info!(path = %path.display(), feed = %config.name, "Loaded feed configuration");
            config
        }
        None => FeedConfig::for_symbol(args.symbol.clone()),
    };
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    config.validate()?;

    let processor = Arc::new(RecordProcessor::new(
        config.symbol.to_lowercase(),
        CsvSink::new(config.output_dir.clone()),
        config.flush_every,
    ));

    let mut client = StreamClient::new(&config, WebSocketConnector::new())?;
    client.bus_mut().attach(processor.clone());

    if let Some(addr) = args.health_addr {
        let state = ServerState::new(
            config.name.clone(),
            processor.symbol(),
            client.connected_handle(),
            processor.status_handle(),
        );
        tokio::spawn(async move {
            if let Err(e) = run_server(addr, state).await {
                error!(error = %e, "Health server failed");
            }
        });
        info!(addr = %addr, "Health server started");
    }

    // Setup shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_tx.send(true).ok();
    });

    info!(
        feed = %config.name,
        symbol = %config.symbol,
        url = %client.url(),
        output_dir = %config.output_dir.display(),
        "Starting ticker capture"
    );
    client.run(shutdown_rx).await?;

    // Persist records received since the last threshold flush
    if !processor.flush() {
        error!("Final flush failed");
    }
    info!(records = processor.len(), "Shutdown complete");
    Ok(())
}
