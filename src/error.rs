//! Error types for sink construction.
//!
//! Only construction fails loudly: a misconfigured sink must be detected at
//! startup. Everything after `SqliteSink::new` returns is best-effort;
//! write-path failures are reported on the `tracing` self-log and never
//! reach the producer's logging call.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced while constructing a [`SqliteSink`](crate::SqliteSink).
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("failed to create database directory {path}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("schema bootstrap failed")]
    SchemaBootstrap(#[from] rusqlite::Error),

    #[error("failed to spawn writer thread")]
    WriterSpawn(#[source] std::io::Error),
}
