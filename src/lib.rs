//! Durable, batched SQLite sink for structured log events
//!
//! Producers hand structured [`LogEvent`]s to a [`SqliteSink`]; events are
//! queued in a bounded buffer, grouped into batches by a size or time
//! trigger, and committed one transaction per batch into a single SQLite
//! file. Age-based retention and size-based rollover keep the file bounded
//! over time.
//!
//! # Architecture
//!
//! ```text
//! producers ──emit──▶ bounded buffer ──▶ writer thread ──▶ SQLite file
//!                                           │
//!                                           ├──▶ batch (size / time trigger)
//!                                           ├──▶ retention sweep (age)
//!                                           └──▶ rollover + retry (size)
//! ```
//!
//! Emission is fire-and-forget: producers never block on disk I/O, and no
//! write-path failure ever reaches a logging call. Everything after
//! construction is best-effort, reported through the `tracing` self-log
//! and the sink's [`metrics`](SqliteSink::metrics).
//!
//! # Example
//!
//! ```no_run
//! use chrono::Local;
//! use sqlog::{Level, LogEvent, SqliteSink, SqliteSinkOptions};
//!
//! # fn main() -> Result<(), sqlog::SinkError> {
//! let mut sink = SqliteSink::new(SqliteSinkOptions::new("./logs/app.db"))?;
//!
//! sink.emit(
//!     LogEvent::new(Local::now().fixed_offset(), Level::Information, "service started")
//!         .property("Port", 8080_i64),
//! );
//!
//! // Drains the buffer and commits the final batch
//! sink.close();
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod events;
mod properties;
mod retention;
mod rollover;
mod schema;
mod sink;
mod util;
mod writer;

pub use config::{
    SqliteSinkOptions, DEFAULT_BATCH_SIZE, DEFAULT_FLUSH_INTERVAL, DEFAULT_MAX_BUFFER_SIZE,
    DEFAULT_MAX_DB_MB, DEFAULT_TABLE_NAME, MAX_SUPPORTED_DB_MB,
};
pub use error::SinkError;
pub use events::{Level, LogEvent, PropertyValue, ScalarValue};
pub use sink::{MetricsSnapshot, SqliteSink};
