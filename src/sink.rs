//! Sink facade: construction, emit, flush, shutdown
//!
//! `SqliteSink` is what the host logging pipeline holds. Emission is
//! fire-and-forget: producers deposit events into the bounded channel and
//! never wait on disk I/O; everything downstream happens on the writer
//! thread. Shutdown is a one-directional state machine
//! (`Running → Draining → Closed`) with the writer responsible for the
//! final drain.

use crate::config::SqliteSinkOptions;
use crate::error::SinkError;
use crate::events::{Level, LogEvent};
use crate::schema;
use crate::writer::{Writer, WriterCommand};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

const STATE_RUNNING: u8 = 0;
const STATE_DRAINING: u8 = 1;
const STATE_CLOSED: u8 = 2;

/// Counters for observing the sink itself. These describe the sink's own
/// health, not the log stream: losses recorded here are also reported on
/// the `tracing` self-log.
#[derive(Debug, Default)]
pub(crate) struct SinkMetrics {
    /// Events committed to the database.
    pub events_stored: AtomicU64,
    /// Events dropped at admission (buffer full).
    pub events_dropped: AtomicU64,
    /// Events lost to failed batches (write errors, full database).
    pub events_lost: AtomicU64,
    /// Current pending-batch size.
    pub batch_pending: AtomicU64,
    /// Committed batches.
    pub flush_count: AtomicU64,
    /// Completed rollovers.
    pub rollover_count: AtomicU64,
    /// Retention sweeps attempted.
    pub retention_runs: AtomicU64,
    /// Total commit latency, for averaging.
    pub write_latency_us: AtomicU64,
}

impl SinkMetrics {
    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        let flushes = self.flush_count.load(Ordering::Relaxed);
        MetricsSnapshot {
            events_stored: self.events_stored.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            events_lost: self.events_lost.load(Ordering::Relaxed),
            batch_pending: self.batch_pending.load(Ordering::Relaxed),
            flush_count: flushes,
            rollover_count: self.rollover_count.load(Ordering::Relaxed),
            retention_runs: self.retention_runs.load(Ordering::Relaxed),
            avg_write_latency_us: {
                let total = self.write_latency_us.load(Ordering::Relaxed);
                if flushes > 0 {
                    total / flushes
                } else {
                    0
                }
            },
        }
    }
}

/// Point-in-time copy of the sink's counters.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub events_stored: u64,
    pub events_dropped: u64,
    pub events_lost: u64,
    pub batch_pending: u64,
    pub flush_count: u64,
    pub rollover_count: u64,
    pub retention_runs: u64,
    pub avg_write_latency_us: u64,
}

/// A durable, batched log-event sink backed by a single SQLite file.
///
/// One instance owns one database file and one writer thread. Instances
/// are independent; two sinks over distinct files never share state.
pub struct SqliteSink {
    tx: SyncSender<WriterCommand>,
    writer_handle: Option<JoinHandle<()>>,
    metrics: Arc<SinkMetrics>,
    min_level: Level,
    state: AtomicU8,
}

impl SqliteSink {
    /// Open (or create) the database and start the writer thread.
    ///
    /// Parent directories are created, the connection is configured, and
    /// the log table is bootstrapped before this returns, so every
    /// configuration or bootstrap problem surfaces here rather than being
    /// logged from the write path later.
    pub fn new(options: SqliteSinkOptions) -> Result<Self, SinkError> {
        let cfg = options.into_effective()?;

        if let Some(parent) = cfg.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| SinkError::CreateDirectory {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        // Bootstrap on the caller's thread; the connection then moves into
        // the writer thread, which owns it exclusively from here on.
        let conn = schema::open_database(&cfg)?;

        let (tx, rx) = mpsc::sync_channel::<WriterCommand>(cfg.max_buffer_size);
        let metrics = Arc::new(SinkMetrics::default());
        let min_level = cfg.min_level;

        let writer = Writer::new(conn, cfg, metrics.clone());
        let writer_handle = thread::Builder::new()
            .name("sqlog-writer".into())
            .spawn(move || writer.run(rx))
            .map_err(SinkError::WriterSpawn)?;

        tracing::debug!("sink started");

        Ok(Self {
            tx,
            writer_handle: Some(writer_handle),
            metrics,
            min_level,
            state: AtomicU8::new(STATE_RUNNING),
        })
    }

    /// Queue one event for persistence (fire-and-forget).
    ///
    /// Never blocks and never returns an error to the logging call: events
    /// below the configured minimum level are ignored, and events arriving
    /// while the buffer is full or after [`close`](Self::close) are dropped
    /// and accounted for in the metrics.
    pub fn emit(&self, event: LogEvent) {
        if self.state.load(Ordering::Acquire) != STATE_RUNNING {
            return;
        }
        if event.level < self.min_level {
            return;
        }
        match self.tx.try_send(WriterCommand::Emit(Box::new(event))) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.metrics.events_dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    "buffer full: dropped event (total dropped: {})",
                    self.metrics.events_dropped.load(Ordering::Relaxed)
                );
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::error!("writer thread disconnected; event discarded");
            }
        }
    }

    /// Block until every event queued so far has been offered to the
    /// database, establishing a durability point without closing the sink.
    pub fn flush(&self) {
        if self.state.load(Ordering::Acquire) != STATE_RUNNING {
            return;
        }
        let (ack_tx, ack_rx) = mpsc::sync_channel(1);
        if self.tx.send(WriterCommand::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }

    /// Stop accepting events, drain the buffer, commit the final batch,
    /// and close the connection. Idempotent; also runs on drop.
    pub fn close(&mut self) {
        if self
            .state
            .compare_exchange(
                STATE_RUNNING,
                STATE_DRAINING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return;
        }

        let _ = self.tx.send(WriterCommand::Shutdown);
        if let Some(handle) = self.writer_handle.take() {
            if handle.join().is_err() {
                tracing::error!("writer thread panicked during shutdown");
            }
        }

        self.state.store(STATE_CLOSED, Ordering::Release);
        tracing::debug!("sink closed");
    }

    /// Current counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl Drop for SqliteSink {
    fn drop(&mut self) {
        self.close();
    }
}
