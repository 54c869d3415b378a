use std::{num::NonZeroU32, path::PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::{
    io::OutputFormat,
    models::{granularity::Granularity, interpolation::InterpolationMethod},
    reconcile::DedupMode,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Import historical candles into a flat file")]
pub struct Cli {
    /// Path to an import config file (TOML). Flags override its values.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch, reconcile and export one product over a time range
    Import(ImportArgs),

    /// List the products the exchange offers
    Products,
}

#[derive(Args, Debug, Default, Clone)]
pub struct ImportArgs {
    /// Product id (e.g. "BTC-USD")
    #[arg(short, long)]
    pub product: Option<String>,

    /// Candle size: seconds or a preset such as 1m, 5m, 15m, 1h, 6h, 1d
    #[arg(short, long)]
    pub granularity: Option<Granularity>,

    /// Start time in UTC (e.g. "2018-01-01T00:00:00Z" or "01/01/18 00:00")
    #[arg(short, long)]
    pub start: Option<String>,

    /// End time in UTC; defaults to now
    #[arg(short, long)]
    pub end: Option<String>,

    /// Fill missing candles: linear, spline or polynomial
    #[arg(long)]
    pub interpolate: Option<InterpolationMethod>,

    /// Order for spline and polynomial interpolation
    #[arg(long)]
    pub order: Option<u32>,

    /// Disable interpolation even if the config file enables it
    #[arg(long, conflicts_with = "interpolate")]
    pub no_interpolate: bool,

    /// Duplicate handling: timestamp or exact
    #[arg(long)]
    pub dedup: Option<DedupMode>,

    /// Directory the export is written to
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Export format: csv or feather
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Buckets requested per query
    #[arg(long)]
    pub request_size: Option<NonZeroU32>,

    /// Seconds to wait before every query
    #[arg(long)]
    pub pacing: Option<f64>,

    /// Seconds to wait after a failed query
    #[arg(long)]
    pub backoff: Option<f64>,

    /// Attempts per window before it is abandoned
    #[arg(long)]
    pub max_attempts: Option<NonZeroU32>,
}
