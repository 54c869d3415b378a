//! Sequential, paced, retrying retrieval over planned windows.
//!
//! The remote source is rate limited, so windows are fetched one at a time
//! on the caller's task. Every attempt is preceded by the pacing delay and a
//! failed attempt is followed by the backoff delay; both are awaited inline.
//! A window that fails `max_attempts` times is abandoned and its buckets end
//! up in the missing set. That is the only way a window failure surfaces.

use std::{num::NonZeroU32, time::Duration};

use nonzero_ext::nonzero;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use snafu::ensure;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    errors::{CancelledSnafu, ImportError},
    models::{
        bar::Candle,
        granularity::Granularity,
        request_params::{CandleQuery, RetrievalWindow},
    },
    providers::CandleSource,
    requests::windows::plan_windows,
    timeline::TimeRange,
};

/// Request sizing, pacing and retry knobs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchPolicy {
    /// Buckets requested per window.
    pub request_size: NonZeroU32,
    /// Wait before every query attempt.
    #[serde(with = "duration_secs")]
    pub pacing: Duration,
    /// Extra wait after a failed attempt, before the next one.
    #[serde(with = "duration_secs")]
    pub backoff: Duration,
    /// Attempts per window before it is abandoned.
    pub max_attempts: NonZeroU32,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            request_size: nonzero!(200u32),
            pacing: Duration::from_secs(1),
            backoff: Duration::from_millis(1_300),
            max_attempts: nonzero!(3u32),
        }
    }
}

impl FetchPolicy {
    /// No waiting at all; for tests and replaying local fixtures.
    pub fn unpaced() -> Self {
        Self {
            pacing: Duration::ZERO,
            backoff: Duration::ZERO,
            ..Self::default()
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(de::Error::custom)
    }
}

/// Receives progress after each window, whether it succeeded or was abandoned.
pub trait ProgressObserver: Send + Sync {
    /// `completed` counts from 1 up to `total`.
    fn on_window_complete(&self, completed: usize, total: usize);
}

impl<F> ProgressObserver for F
where
    F: Fn(usize, usize) + Send + Sync,
{
    fn on_window_complete(&self, completed: usize, total: usize) {
        self(completed, total)
    }
}

/// Logs progress roughly every tenth of the run.
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_window_complete(&self, completed: usize, total: usize) {
        let stride = (total / 10).max(1);
        if completed % stride == 0 || completed == total {
            info!(completed, total, "windows fetched");
        }
    }
}

/// What happened during a fetch, for the run summary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub windows_planned: usize,
    pub windows_completed: usize,
    /// Attempts that errored or returned a malformed payload.
    pub failed_attempts: usize,
    /// Windows given up on after the last attempt failed.
    pub abandoned: Vec<RetrievalWindow>,
    /// Rows received across all successful responses, malformed ones included.
    pub rows_received: usize,
    /// Rows dropped because they did not decode as a candle.
    pub malformed_rows: usize,
}

/// Accumulated candles, unordered and possibly duplicated, plus the report.
#[derive(Clone, Debug, Default)]
pub struct FetchOutput {
    pub candles: Vec<Candle>,
    pub report: FetchReport,
}

enum Attempt {
    Rows(Vec<Value>),
    Failed,
}

/// Fetches every window of a range from one [`CandleSource`].
pub struct WindowedFetcher<'a> {
    source: &'a dyn CandleSource,
    policy: FetchPolicy,
    progress: Option<&'a dyn ProgressObserver>,
    cancel: CancellationToken,
}

impl<'a> WindowedFetcher<'a> {
    pub fn new(source: &'a dyn CandleSource, policy: FetchPolicy) -> Self {
        Self {
            source,
            policy,
            progress: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressObserver) -> Self {
        self.progress = Some(progress);
        self
    }

    /// The token is checked before each window starts.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    pub async fn fetch(
        &self,
        product_id: &str,
        range: TimeRange,
        granularity: Granularity,
    ) -> Result<FetchOutput, ImportError> {
        let windows = plan_windows(range, granularity, self.policy.request_size);
        let total = windows.len();
        let mut output = FetchOutput {
            candles: Vec::new(),
            report: FetchReport {
                windows_planned: total,
                ..FetchReport::default()
            },
        };

        for (idx, window) in windows.into_iter().enumerate() {
            ensure!(
                !self.cancel.is_cancelled(),
                CancelledSnafu {
                    completed: idx,
                    total,
                }
            );

            match self
                .fetch_window(product_id, window, granularity, &mut output.report)
                .await
            {
                Some(rows) => {
                    output.report.rows_received += rows.len();
                    for row in &rows {
                        match Candle::from_wire_row(row) {
                            Some(candle) => output.candles.push(candle),
                            None => output.report.malformed_rows += 1,
                        }
                    }
                    debug!(window = idx + 1, total, rows = rows.len(), "window fetched");
                }
                None => {
                    warn!(
                        window = idx + 1,
                        total,
                        start = window.start,
                        end = window.end,
                        "window abandoned after {} attempts",
                        self.policy.max_attempts
                    );
                    output.report.abandoned.push(window);
                }
            }

            output.report.windows_completed = idx + 1;
            if let Some(progress) = self.progress {
                progress.on_window_complete(idx + 1, total);
            }
        }

        Ok(output)
    }

    /// Runs the attempts for one window. `None` means it was abandoned.
    async fn fetch_window(
        &self,
        product_id: &str,
        window: RetrievalWindow,
        granularity: Granularity,
        report: &mut FetchReport,
    ) -> Option<Vec<Value>> {
        let Some(query) = CandleQuery::for_window(product_id, window, granularity) else {
            warn!(start = window.start, end = window.end, "window outside representable time");
            return None;
        };

        let max_attempts = self.policy.max_attempts.get();
        for attempt in 1..=max_attempts {
            tokio::time::sleep(self.policy.pacing).await;

            match self.attempt(&query, attempt).await {
                Attempt::Rows(rows) => return Some(rows),
                Attempt::Failed => {
                    report.failed_attempts += 1;
                    if attempt < max_attempts {
                        tokio::time::sleep(self.policy.backoff).await;
                    }
                }
            }
        }
        None
    }

    async fn attempt(&self, query: &CandleQuery, attempt: u32) -> Attempt {
        match self.source.retrieve(query).await {
            Ok(Value::Array(rows)) => Attempt::Rows(rows),
            Ok(other) => {
                warn!(
                    attempt,
                    start = %query.start_iso(),
                    response = %truncate(&other.to_string(), 200),
                    "import error: response is not a list of candles"
                );
                Attempt::Failed
            }
            Err(e) => {
                warn!(attempt, start = %query.start_iso(), error = %e, "import error");
                Attempt::Failed
            }
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::providers::{ApiSnafu, ProviderError};

    /// Answers with `[start, ...]` rows for every bucket and records each query.
    struct EchoSource {
        queries: Mutex<Vec<CandleQuery>>,
    }

    #[async_trait]
    impl CandleSource for EchoSource {
        async fn retrieve(&self, query: &CandleQuery) -> Result<Value, ProviderError> {
            self.queries.lock().unwrap().push(query.clone());
            let step = query.granularity.secs();
            let rows: Vec<Value> = (query.start.timestamp()..query.end.timestamp())
                .step_by(step as usize)
                .map(|t| json!([t, 1.0, 2.0, 1.5, 1.5, 10.0]))
                .collect();
            Ok(Value::Array(rows))
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl CandleSource for AlwaysFails {
        async fn retrieve(&self, _query: &CandleQuery) -> Result<Value, ProviderError> {
            ApiSnafu { message: "503" }.fail()
        }
    }

    #[tokio::test]
    async fn queries_each_window_once_and_clamps_the_last() {
        let source = EchoSource {
            queries: Mutex::new(Vec::new()),
        };
        let policy = FetchPolicy {
            request_size: NonZeroU32::new(4).unwrap(),
            ..FetchPolicy::unpaced()
        };
        let range = TimeRange::new(0, 600).unwrap();
        let out = WindowedFetcher::new(&source, policy)
            .fetch("BTC-USD", range, Granularity::ONE_MINUTE)
            .await
            .unwrap();

        let queries = source.queries.lock().unwrap();
        let bounds: Vec<(i64, i64)> = queries
            .iter()
            .map(|q| (q.start.timestamp(), q.end.timestamp()))
            .collect();
        assert_eq!(bounds, vec![(0, 240), (240, 480), (480, 600)]);
        assert_eq!(out.candles.len(), 10);
        assert_eq!(out.report.windows_completed, 3);
        assert_eq!(out.report.failed_attempts, 0);
    }

    #[tokio::test]
    async fn failing_window_is_attempted_max_attempts_times() {
        let range = TimeRange::new(0, 600).unwrap();
        let out = WindowedFetcher::new(&AlwaysFails, FetchPolicy::unpaced())
            .fetch("BTC-USD", range, Granularity::ONE_MINUTE)
            .await
            .unwrap();
        assert!(out.candles.is_empty());
        assert_eq!(out.report.failed_attempts, 3);
        assert_eq!(out.report.abandoned, vec![RetrievalWindow { start: 0, end: 600 }]);
    }

    #[tokio::test(start_paused = true)]
    async fn pacing_and_backoff_are_awaited_inline() {
        let started = tokio::time::Instant::now();
        let range = TimeRange::new(0, 60).unwrap();
        WindowedFetcher::new(&AlwaysFails, FetchPolicy::default())
            .fetch("BTC-USD", range, Granularity::ONE_MINUTE)
            .await
            .unwrap();
        // 3 x 1s pacing + 2 x 1.3s backoff between attempts
        assert_eq!(started.elapsed(), Duration::from_millis(5_600));
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_next_window() {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let stop_after_first = move |completed: usize, _total: usize| {
            if completed == 1 {
                token.cancel();
            }
        };
        let source = EchoSource {
            queries: Mutex::new(Vec::new()),
        };
        let policy = FetchPolicy {
            request_size: NonZeroU32::new(2).unwrap(),
            ..FetchPolicy::unpaced()
        };
        let err = WindowedFetcher::new(&source, policy)
            .with_progress(&stop_after_first)
            .with_cancellation(cancel)
            .fetch("BTC-USD", TimeRange::new(0, 600).unwrap(), Granularity::ONE_MINUTE)
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Cancelled { completed: 1, total: 5, .. }));
        assert_eq!(source.queries.lock().unwrap().len(), 1);
    }

    #[test]
    fn policy_reads_durations_as_seconds() {
        let policy: FetchPolicy = toml::from_str("pacing = 0.5\nmax_attempts = 5").unwrap();
        assert_eq!(policy.pacing, Duration::from_millis(500));
        assert_eq!(policy.backoff, Duration::from_millis(1_300));
        assert_eq!(policy.max_attempts.get(), 5);
        assert_eq!(policy.request_size.get(), 200);
    }
}
