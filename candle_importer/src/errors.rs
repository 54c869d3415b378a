use std::path::PathBuf;

use snafu::{Backtrace, Snafu};

use crate::{io::sink::SinkError, models::interpolation::InterpolationMethod};

/// The unified error type for an import run.
///
/// Per-window fetch failures never show up here; they are retried and, if
/// they keep failing, absorbed into the missing set.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ImportError {
    /// The requested range is empty or the bucket size is not positive.
    #[snafu(display("Invalid range: start {start} must be before end {end} with a positive bucket size ({bucket_secs}s)"))]
    InvalidRange {
        start: i64,
        end: i64,
        bucket_secs: i64,
        backtrace: Backtrace,
    },

    /// The interpolation order cannot be fitted.
    #[snafu(display("Invalid order {order} for {method} interpolation: {message}"))]
    InvalidOrder {
        method: InterpolationMethod,
        order: u32,
        message: String,
        backtrace: Backtrace,
    },

    /// Nothing usable came back for the whole range.
    #[snafu(display("No candles were retrieved in the requested range"))]
    EmptyResult { backtrace: Backtrace },

    /// The run was cancelled between windows.
    #[snafu(display("Import cancelled after {completed} of {total} windows"))]
    Cancelled {
        completed: usize,
        total: usize,
        backtrace: Backtrace,
    },

    /// Configuration was present but not usable.
    #[snafu(display("Configuration error: {message}"))]
    Config {
        message: String,
        backtrace: Backtrace,
    },

    /// The configuration file could not be read.
    #[snafu(display("Failed to read config file {}: {source}", path.display()))]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// The configuration file is not valid TOML for [`ImportConfig`](crate::config::ImportConfig).
    #[snafu(display("Failed to parse config file {}: {source}", path.display()))]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
        backtrace: Backtrace,
    },

    /// The export sink failed.
    #[snafu(display("Export failed: {source}"))]
    Export {
        #[snafu(backtrace)]
        source: SinkError,
    },
}
