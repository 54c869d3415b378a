//! Cleans the accumulated candles and diffs them against the timeline.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::{
    errors::{EmptyResultSnafu, ImportError},
    models::bar::Candle,
    timeline::Timeline,
};

/// How duplicate records are collapsed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupMode {
    /// One candle per timestamp; the first after sorting wins.
    #[default]
    Timestamp,
    /// Only fully identical records collapse. Two candles sharing a
    /// timestamp but differing in any value are both kept.
    Exact,
}

impl fmt::Display for DedupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Timestamp => "timestamp",
            Self::Exact => "exact",
        })
    }
}

impl FromStr for DedupMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "timestamp" | "keyed" => Ok(Self::Timestamp),
            "exact" => Ok(Self::Exact),
            other => Err(format!("unknown dedup mode '{other}'")),
        }
    }
}

/// Candles that made it onto the timeline, plus the buckets that did not.
#[derive(Clone, Debug, PartialEq)]
pub struct ReconciliationResult {
    /// Ascending by timestamp.
    pub candles: Vec<Candle>,
    /// Ascending timeline buckets with no candle.
    pub missing: Vec<i64>,
}

impl ReconciliationResult {
    pub fn first_timestamp(&self) -> Option<i64> {
        self.candles.first().map(|c| c.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<i64> {
        self.candles.last().map(|c| c.timestamp)
    }
}

/// Sorts, dedups and filters `candles`, then lists the empty buckets.
///
/// Fails with [`ImportError::EmptyResult`] when nothing lands on the
/// timeline.
pub fn reconcile(
    mut candles: Vec<Candle>,
    timeline: &Timeline,
    mode: DedupMode,
) -> Result<ReconciliationResult, ImportError> {
    // stable: equal timestamps keep arrival order
    candles.sort_by_key(|c| c.timestamp);

    match mode {
        DedupMode::Timestamp => candles.dedup_by_key(|c| c.timestamp),
        DedupMode::Exact => dedup_exact(&mut candles),
    }

    candles.retain(|c| timeline.contains(c.timestamp));
    ensure!(!candles.is_empty(), EmptyResultSnafu);

    let missing = missing_buckets(&candles, timeline);
    Ok(ReconciliationResult { candles, missing })
}

/// Drops records identical to an earlier one. Input must be sorted by
/// timestamp so identical records share a run.
fn dedup_exact(candles: &mut Vec<Candle>) {
    let mut kept: Vec<Candle> = Vec::with_capacity(candles.len());
    let mut run_start = 0;
    for candle in candles.drain(..) {
        if kept
            .get(run_start)
            .is_some_and(|first| first.timestamp != candle.timestamp)
        {
            run_start = kept.len();
        }
        if !kept[run_start..].contains(&candle) {
            kept.push(candle);
        }
    }
    *candles = kept;
}

/// Merge walk over two ascending sequences.
fn missing_buckets(candles: &[Candle], timeline: &Timeline) -> Vec<i64> {
    let mut missing = Vec::with_capacity(timeline.len().saturating_sub(candles.len()));
    let mut present = candles.iter().map(|c| c.timestamp).peekable();
    for ts in timeline {
        while present.next_if(|&p| p < ts).is_some() {}
        if present.next_if_eq(&ts).is_none() {
            missing.push(ts);
        }
        // duplicates under exact mode
        while present.next_if_eq(&ts).is_some() {}
    }
    missing
}
