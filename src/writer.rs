//! Dedicated writer thread
//!
//! All database work happens here, on one OS thread that exclusively owns
//! the connection. Producers never touch it; the retention sweep is driven
//! by the same loop that writes batches, so the two are serialised by
//! construction.
//!
//! # Architecture
//!
//! ```text
//! emit() (any thread)
//!     │
//!     └──→ std::sync::mpsc::sync_channel (bounded)
//!             │
//!             └──→ writer thread
//!                     │
//!                     ├──→ pending batch (batch_size or flush_interval)
//!                     ├──→ one INSERT transaction per batch
//!                     ├──→ retention sweep on its own deadline
//!                     └──→ rollover + single retry on SQLITE_FULL
//! ```

use crate::config::EffectiveConfig;
use crate::events::LogEvent;
use crate::properties;
use crate::retention;
use crate::rollover;
use crate::sink::SinkMetrics;
use crate::util::format_timestamp;
use rusqlite::{named_params, Connection};
use std::sync::atomic::Ordering;
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Commands sent to the writer thread.
pub(crate) enum WriterCommand {
    /// Persist one event (batched).
    Emit(Box<LogEvent>),
    /// Dispatch the pending batch now, then acknowledge.
    Flush(SyncSender<()>),
    /// Dispatch the pending batch, then exit.
    Shutdown,
}

pub(crate) struct Writer {
    conn: Connection,
    cfg: EffectiveConfig,
    metrics: Arc<SinkMetrics>,
    insert_sql: String,
    batch: Vec<LogEvent>,
    /// Start of the current time-trigger window; reset by every dispatch
    /// and by the trigger firing on an empty pending list.
    last_dispatch: Instant,
    next_retention: Option<Instant>,
}

impl Writer {
    pub(crate) fn new(conn: Connection, cfg: EffectiveConfig, metrics: Arc<SinkMetrics>) -> Self {
        let insert_sql = format!(
            "INSERT INTO {} (Timestamp, Level, Exception, RenderedMessage, Properties) \
             VALUES (@timeStamp, @level, @exception, @renderedMessage, @properties)",
            cfg.table_name
        );
        let next_retention = cfg
            .retention
            .as_ref()
            .map(|r| Instant::now() + r.check_interval);
        let batch = Vec::with_capacity(cfg.batch_size);
        Self {
            conn,
            cfg,
            metrics,
            insert_sql,
            batch,
            last_dispatch: Instant::now(),
            next_retention,
        }
    }

    /// Run until shutdown. Consumes the writer; the connection closes when
    /// this returns and the writer is dropped.
    pub(crate) fn run(mut self, rx: Receiver<WriterCommand>) {
        loop {
            match rx.recv_timeout(self.recv_timeout()) {
                Ok(WriterCommand::Emit(event)) => {
                    self.batch.push(*event);
                    self.metrics
                        .batch_pending
                        .store(self.batch.len() as u64, Ordering::Relaxed);
                    if self.batch.len() >= self.cfg.batch_size {
                        self.dispatch_batch();
                    }
                }
                Ok(WriterCommand::Flush(ack)) => {
                    self.dispatch_batch();
                    let _ = ack.try_send(());
                }
                Ok(WriterCommand::Shutdown) => {
                    self.drain_remaining(&rx);
                    self.dispatch_batch();
                    tracing::debug!("writer thread shutting down");
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.last_dispatch.elapsed() >= self.cfg.flush_interval {
                        if self.batch.is_empty() {
                            // Empty time trigger only resets the clock
                            self.last_dispatch = Instant::now();
                        } else {
                            self.dispatch_batch();
                        }
                    }
                    self.maybe_run_retention();
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.dispatch_batch();
                    tracing::debug!("command channel closed; writer thread exiting");
                    break;
                }
            }
        }
    }

    /// Earliest of the flush deadline and the retention deadline.
    fn recv_timeout(&self) -> Duration {
        let now = Instant::now();
        let flush_deadline = self.last_dispatch + self.cfg.flush_interval;
        let mut timeout = flush_deadline.saturating_duration_since(now);
        if let Some(due) = self.next_retention {
            timeout = timeout.min(due.saturating_duration_since(now));
        }
        timeout
    }

    /// Events accepted before shutdown may still sit in the channel behind
    /// the shutdown command; fold them into the final batch.
    fn drain_remaining(&mut self, rx: &Receiver<WriterCommand>) {
        loop {
            match rx.try_recv() {
                Ok(WriterCommand::Emit(event)) => {
                    self.batch.push(*event);
                    if self.batch.len() >= self.cfg.batch_size {
                        self.dispatch_batch();
                    }
                }
                Ok(WriterCommand::Flush(ack)) => {
                    self.dispatch_batch();
                    let _ = ack.try_send(());
                }
                Ok(WriterCommand::Shutdown) => {}
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    /// Dispatch the pending batch in one transaction.
    ///
    /// Never propagates: the batch either commits, is retried once after a
    /// rollover, or is dropped and accounted for. Resets the time trigger.
    fn dispatch_batch(&mut self) {
        self.last_dispatch = Instant::now();
        if self.batch.is_empty() {
            return;
        }

        let started = Instant::now();
        let count = self.batch.len();

        match self.insert_batch() {
            Ok(()) => {
                let latency = started.elapsed().as_micros() as u64;
                self.metrics
                    .events_stored
                    .fetch_add(count as u64, Ordering::Relaxed);
                self.metrics.flush_count.fetch_add(1, Ordering::Relaxed);
                self.metrics
                    .write_latency_us
                    .fetch_add(latency, Ordering::Relaxed);
                tracing::trace!("committed {} events in {}µs", count, latency);
            }
            Err(err) if rollover::is_database_full(&err) => self.handle_database_full(count),
            Err(err) => {
                self.metrics
                    .events_lost
                    .fetch_add(count as u64, Ordering::Relaxed);
                tracing::warn!("dropping batch of {} events after write error: {}", count, err);
            }
        }

        self.batch.clear();
        self.metrics.batch_pending.store(0, Ordering::Relaxed);
    }

    /// Insert every pending event inside one transaction. An error at any
    /// point rolls the whole transaction back on drop.
    fn insert_batch(&mut self) -> rusqlite::Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&self.insert_sql)?;
            for event in &self.batch {
                let properties = if event.properties.is_empty() {
                    String::new()
                } else {
                    properties::encode(&event.properties)
                };
                stmt.execute(named_params! {
                    "@timeStamp":
                        format_timestamp(&event.timestamp, self.cfg.store_timestamp_in_utc),
                    "@level": event.level.as_str(),
                    "@exception": event.exception.as_deref().unwrap_or(""),
                    "@renderedMessage": event.rendered_message,
                    "@properties": properties,
                })?;
            }
        }
        tx.commit()
    }

    /// The batch hit the size cap: roll the file over and retry once, or
    /// drop the batch when rollover is disabled. Either way the pipeline
    /// keeps running.
    fn handle_database_full(&mut self, count: usize) {
        if !self.cfg.roll_over {
            self.metrics
                .events_lost
                .fetch_add(count as u64, Ordering::Relaxed);
            tracing::warn!(
                "database reached the {} MB cap; dropping batch of {} events (rollover disabled)",
                self.cfg.max_db_mb,
                count
            );
            return;
        }

        match rollover::roll_over(&self.conn, &self.cfg.db_path, &self.cfg.table_name) {
            Ok(archive) => {
                self.metrics.rollover_count.fetch_add(1, Ordering::Relaxed);
                tracing::info!("database rolled over to {}", archive.display());
                match self.insert_batch() {
                    Ok(()) => {
                        self.metrics
                            .events_stored
                            .fetch_add(count as u64, Ordering::Relaxed);
                        self.metrics.flush_count.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(err) => {
                        self.metrics
                            .events_lost
                            .fetch_add(count as u64, Ordering::Relaxed);
                        tracing::warn!(
                            "dropping batch of {} events; retry after rollover failed: {}",
                            count,
                            err
                        );
                    }
                }
            }
            Err(err) => {
                self.metrics
                    .events_lost
                    .fetch_add(count as u64, Ordering::Relaxed);
                tracing::warn!("rollover failed; dropping batch of {} events: {}", count, err);
            }
        }
    }

    fn maybe_run_retention(&mut self) {
        let (Some(due), Some(policy)) = (self.next_retention, self.cfg.retention.as_ref()) else {
            return;
        };
        if Instant::now() < due {
            return;
        }

        match retention::cutoff(policy.period, self.cfg.store_timestamp_in_utc) {
            Some(cut) => {
                match retention::sweep(&self.conn, &self.cfg.table_name, &cut) {
                    Ok(0) => tracing::trace!("retention sweep removed no rows"),
                    Ok(deleted) => {
                        tracing::info!("retention sweep removed {} rows older than {}", deleted, cut)
                    }
                    Err(err) => tracing::warn!("retention sweep failed: {}", err),
                }
            }
            None => tracing::warn!("retention period out of range; sweep skipped"),
        }

        self.metrics.retention_runs.fetch_add(1, Ordering::Relaxed);
        self.next_retention = Some(Instant::now() + policy.check_interval);
    }
}
