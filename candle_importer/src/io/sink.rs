use std::path::PathBuf;

use async_trait::async_trait;
use snafu::{Backtrace, Snafu};

use crate::interpolate::CandleTable;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SinkError {
    /// An error occurred while trying to write the data.
    #[snafu(display("Failed to write {}: {source}", path.display()))]
    Write {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// The output directory could not be created.
    #[snafu(display("Failed to create directory {}: {source}", path.display()))]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// The table could not be converted into the destination format.
    #[snafu(display("Data conversion error: {message}"))]
    Conversion {
        message: String,
        backtrace: Backtrace,
    },

    /// The blocking write task panicked or was cancelled.
    #[snafu(display("Export task failed: {source}"))]
    Task {
        source: tokio::task::JoinError,
        backtrace: Backtrace,
    },

    /// Polars failed to build or serialise the frame.
    #[snafu(display("Polars operation failed: {source}"))]
    Polars {
        source: polars::prelude::PolarsError,
        backtrace: Backtrace,
    },
}

#[async_trait]
pub trait DataSink: Send + Sync {
    /// The type of output returned after a successful write operation.
    ///
    /// A file sink returns the path it wrote; an in-memory sink might
    /// return the row count.
    type Output: Send;

    /// Persists the final ordered table under a suggested `name`.
    ///
    /// `name` carries no extension; the sink picks one for its format.
    async fn write(&self, table: &CandleTable, name: &str) -> Result<Self::Output, SinkError>;
}
