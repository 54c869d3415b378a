//! End-to-end import: timeline, fetch, reconcile, fill, export.

use chrono::{DateTime, Utc};
use snafu::ResultExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    config::ImportConfig,
    errors::{ConfigSnafu, ExportSnafu, ImportError},
    interpolate::{CandleTable, fill_gaps},
    io::DataSink,
    models::granularity::Granularity,
    providers::CandleSource,
    reconcile::reconcile,
    requests::{
        ProgressObserver, WindowedFetcher, fetcher::LogProgress, windows::window_count,
    },
    timeline::{TimeRange, Timeline},
};

/// Layout of the export name timestamps.
const NAME_TIME_FORMAT: &str = "%Y-%m-%d %H%M";

/// What a finished run did.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportSummary<O> {
    pub range: TimeRange,
    /// Buckets on the timeline.
    pub expected: usize,
    pub requests_planned: usize,
    /// Distinct candles kept after reconciliation.
    pub retrieved: usize,
    pub missing: usize,
    /// Rows filled by interpolation; zero when it was off.
    pub interpolated: usize,
    pub failed_attempts: usize,
    pub abandoned_windows: usize,
    pub malformed_rows: usize,
    pub first: Option<DateTime<Utc>>,
    pub last: Option<DateTime<Utc>>,
    /// Suggested name handed to the sink.
    pub name: String,
    /// Whatever the sink returned, e.g. the written path.
    pub output: O,
}

/// Runs imports from one source into one sink.
pub struct Importer<'a, S: DataSink> {
    source: &'a dyn CandleSource,
    sink: &'a S,
    progress: Option<&'a dyn ProgressObserver>,
    cancel: CancellationToken,
}

impl<'a, S: DataSink> Importer<'a, S> {
    pub fn new(source: &'a dyn CandleSource, sink: &'a S) -> Self {
        Self {
            source,
            sink,
            progress: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the default logging observer.
    pub fn with_progress(mut self, progress: &'a dyn ProgressObserver) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Validates `config` and runs the import. Nothing is written unless
    /// every stage succeeds.
    pub async fn run(&self, config: &ImportConfig) -> Result<ImportSummary<S::Output>, ImportError> {
        let range = config.validate()?;
        self.run_range(config, range).await
    }

    /// Runs the import over an already aligned range.
    pub async fn run_range(
        &self,
        config: &ImportConfig,
        range: TimeRange,
    ) -> Result<ImportSummary<S::Output>, ImportError> {
        let granularity = config.granularity;
        self.source
            .check_request(granularity, config.fetch.request_size)
            .map_err(|e| {
                ConfigSnafu {
                    message: e.to_string(),
                }
                .build()
            })?;
        let timeline = Timeline::for_range(range, granularity)?;
        let requests = window_count(range, granularity, config.fetch.request_size);
        info!(
            product = %config.product_id,
            "There are {} candles to import. This will require {} requests.",
            timeline.len(),
            requests
        );

        let log_progress = LogProgress;
        let progress: &dyn ProgressObserver = match self.progress {
            Some(progress) => progress,
            None => &log_progress,
        };
        let fetched = WindowedFetcher::new(self.source, config.fetch)
            .with_progress(progress)
            .with_cancellation(self.cancel.clone())
            .fetch(&config.product_id, range, granularity)
            .await?;
        let report = fetched.report;
        if !report.abandoned.is_empty() {
            warn!(
                windows = report.abandoned.len(),
                "some windows were abandoned; their buckets count as missing"
            );
        }

        let result = reconcile(fetched.candles, &timeline, config.dedup)?;
        let first = result.first_timestamp().and_then(to_utc);
        let last = result.last_timestamp().and_then(to_utc);
        info!(
            "Successfully fetched {} records ranging {} UTC to {} UTC",
            result.candles.len(),
            fmt_time(first),
            fmt_time(last)
        );
        if !result.missing.is_empty() {
            info!("{} Records were not returned", result.missing.len());
        }

        let table = fill_gaps(&result, &timeline, &config.interpolation)?;
        let name = export_name(&config.product_id, &table, granularity);
        let output = self.sink.write(&table, &name).await.context(ExportSnafu)?;
        info!(name = %name, rows = table.len(), "import complete");

        Ok(ImportSummary {
            range,
            expected: timeline.len(),
            requests_planned: requests,
            retrieved: result.candles.len(),
            missing: result.missing.len(),
            interpolated: table.interpolated_count(),
            failed_attempts: report.failed_attempts,
            abandoned_windows: report.abandoned.len(),
            malformed_rows: report.malformed_rows,
            first,
            last,
            name,
            output,
        })
    }
}

/// `"{product} {first} UTC to {last} UTC - {label} {method}"`, with the
/// method shown as `None` when no gaps were filled.
pub fn export_name(product_id: &str, table: &CandleTable, granularity: Granularity) -> String {
    let first = table.first_timestamp().and_then(to_utc);
    let last = table.last_timestamp().and_then(to_utc);
    let method = table.method.map_or("None", |m| m.as_str());
    format!(
        "{product_id} {} UTC to {} UTC - {} {method}",
        fmt_time(first),
        fmt_time(last),
        granularity.label()
    )
}

fn to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

fn fmt_time(dt: Option<DateTime<Utc>>) -> String {
    dt.map_or_else(|| "?".to_string(), |dt| dt.format(NAME_TIME_FORMAT).to_string())
}
