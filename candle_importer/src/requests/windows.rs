use std::num::NonZeroU32;

use crate::{
    models::{granularity::Granularity, request_params::RetrievalWindow},
    timeline::TimeRange,
};

/// Splits `range` into consecutive windows of at most `request_size` buckets.
///
/// Windows share boundaries and never overlap; the last one is clamped to
/// `range.end`.
pub fn plan_windows(
    range: TimeRange,
    granularity: Granularity,
    request_size: NonZeroU32,
) -> Vec<RetrievalWindow> {
    let width = i64::try_from(window_width(granularity, request_size)).unwrap_or(i64::MAX);
    let mut windows = Vec::with_capacity(window_count(range, granularity, request_size));
    let mut start = range.start;
    while start < range.end {
        let end = start.saturating_add(width).min(range.end);
        windows.push(RetrievalWindow { start, end });
        start = end;
    }
    windows
}

/// Number of requests [`plan_windows`] will produce.
pub fn window_count(range: TimeRange, granularity: Granularity, request_size: NonZeroU32) -> usize {
    let span = range.end.abs_diff(range.start);
    usize::try_from(span.div_ceil(window_width(granularity, request_size))).unwrap_or(usize::MAX)
}

/// Seconds covered by one full window; cannot overflow for `u32` inputs.
fn window_width(granularity: Granularity, request_size: NonZeroU32) -> u64 {
    granularity.secs().unsigned_abs() * u64::from(request_size.get())
}
