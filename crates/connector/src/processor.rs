//! Bus subscriber that turns raw ticker frames into records and persists them
//!
//! The batch only grows. Every `flush_every` records the whole batch is
//! handed to the sink, which replaces its previous contents, so the sink
//! always holds the complete history up to the last flush.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info};

use crate::error::SubscriberError;
use crate::metrics::BatchMetrics;
use crate::record::TickerRecord;
use crate::traits::{BatchSink, Subscriber};

/// Default flush threshold in records
pub const DEFAULT_FLUSH_EVERY: usize = 10;

/// Batch progress shared with the health server
#[derive(Debug, Default)]
pub struct BatchStatus {
    buffered: AtomicUsize,
    flushed: AtomicUsize,
    last_flush_failed: AtomicBool,
}

impl BatchStatus {
    /// Records held in memory
    pub fn buffered(&self) -> usize {
        self.buffered.load(Ordering::SeqCst)
    }

    /// Records in the sink as of the last successful flush
    pub fn flushed(&self) -> usize {
        self.flushed.load(Ordering::SeqCst)
    }

    pub fn last_flush_failed(&self) -> bool {
        self.last_flush_failed.load(Ordering::SeqCst)
    }
}

pub struct RecordProcessor<S: BatchSink> {
    symbol: String,
    flush_every: usize,
    inner: Mutex<ProcessorInner<S>>,
    metrics: BatchMetrics,
    status: Arc<BatchStatus>,
}

struct ProcessorInner<S> {
    batch: Vec<TickerRecord>,
    sink: S,
}

impl<S: BatchSink> ProcessorInner<S> {
    /// Write the full batch; failures are logged and the batch is kept
    fn flush(&mut self, symbol: &str, metrics: &BatchMetrics, status: &BatchStatus) -> bool {
        match self.sink.write_batch(symbol, &self.batch) {
            Ok(()) => {
                metrics.inc_flushes();
                status.flushed.store(self.batch.len(), Ordering::SeqCst);
                status.last_flush_failed.store(false, Ordering::SeqCst);
                true
            }
            Err(e) => {
                metrics.inc_flush_failures();
                status.last_flush_failed.store(true, Ordering::SeqCst);
                error!(symbol = %symbol, records = self.batch.len(), error = %e, "Failed to flush batch");
                false
            }
        }
    }
}

impl<S: BatchSink> RecordProcessor<S> {
    /// `flush_every` of 0 is treated as 1
    pub fn new(symbol: impl Into<String>, sink: S, flush_every: usize) -> Self {
        let symbol = symbol.into();
        Self {
            metrics: BatchMetrics::new(symbol.clone()),
            symbol,
            flush_every: flush_every.max(1),
            status: Arc::new(BatchStatus::default()),
            inner: Mutex::new(ProcessorInner {
                batch: Vec::new(),
                sink,
            }),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Get a handle to the batch status
    pub fn status_handle(&self) -> Arc<BatchStatus> {
        Arc::clone(&self.status)
    }

    // A poisoned lock only means a panic elsewhere mid-append; the batch is still usable.
    fn lock(&self) -> MutexGuard<'_, ProcessorInner<S>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Records accumulated since start
    pub fn len(&self) -> usize {
        self.lock().batch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current batch
    pub fn records(&self) -> Vec<TickerRecord> {
        self.lock().batch.clone()
    }

    /// Append one parsed record, flushing on every threshold multiple
    pub fn push(&self, record: TickerRecord) {
        let mut inner = self.lock();
        debug!(symbol = %self.symbol, record = ?record, "New data processed");
        inner.batch.push(record);

        let len = inner.batch.len();
        self.metrics.set_buffered(len);
        self.status.buffered.store(len, Ordering::SeqCst);
        if len % self.flush_every == 0 {
            info!(symbol = %self.symbol, records = len, "Flush threshold reached");
            inner.flush(&self.symbol, &self.metrics, &self.status);
        }
    }

    /// Write the whole batch now. Returns false if the sink failed.
    pub fn flush(&self) -> bool {
        let mut inner = self.lock();
        if inner.batch.is_empty() {
            return true;
        }
        inner.flush(&self.symbol, &self.metrics, &self.status)
    }
}

impl<S: BatchSink> Subscriber for RecordProcessor<S> {
    fn update(&self, message: &str) -> Result<(), SubscriberError> {
        let record = TickerRecord::parse(message)?;
        self.push(record);
        Ok(())
    }

    fn name(&self) -> &str {
        "record-processor"
    }
}
