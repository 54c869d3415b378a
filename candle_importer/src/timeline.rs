//! Expected bucket timestamps for an import range.
//!
//! - One epoch: Unix seconds, UTC.
//! - A range is half-open, `[start, end)`.
//! - Buckets are fixed-width; calendar units are not supported.

use snafu::ensure;

use crate::{
    errors::{ImportError, InvalidRangeSnafu},
    models::granularity::Granularity,
};

/// Half-open import range, `[start, end)`, in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub fn new(start: i64, end: i64) -> Result<Self, ImportError> {
        ensure!(
            start < end,
            InvalidRangeSnafu {
                start,
                end,
                bucket_secs: 0_i64,
            }
        );
        Ok(Self { start, end })
    }

    /// Snaps raw user bounds onto the bucket grid.
    ///
    /// `start` is floored to its bucket. `end` moves to the boundary after
    /// the bucket it falls in, so the bucket containing `end` is included.
    pub fn aligned(start: i64, end: i64, granularity: Granularity) -> Result<Self, ImportError> {
        let start_aligned = granularity.floor(start);
        let end_aligned = granularity.next_boundary(end);
        ensure!(
            start < end,
            InvalidRangeSnafu {
                start,
                end,
                bucket_secs: granularity.secs(),
            }
        );
        Ok(Self {
            start: start_aligned,
            end: end_aligned,
        })
    }

    pub fn span(&self) -> i64 {
        self.end - self.start
    }
}

/// Ordered, immutable sequence of expected bucket starts in `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeline {
    start: i64,
    end: i64,
    step: i64,
}

impl Timeline {
    /// Fails with [`ImportError::InvalidRange`] if `start >= end` or
    /// `bucket_secs <= 0`.
    pub fn new(start: i64, end: i64, bucket_secs: i64) -> Result<Self, ImportError> {
        ensure!(
            start < end && bucket_secs > 0,
            InvalidRangeSnafu {
                start,
                end,
                bucket_secs,
            }
        );
        Ok(Self {
            start,
            end,
            step: bucket_secs,
        })
    }

    pub fn for_range(range: TimeRange, granularity: Granularity) -> Result<Self, ImportError> {
        Self::new(range.start, range.end, granularity.secs())
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn step(&self) -> i64 {
        self.step
    }

    /// Number of buckets, `ceil((end - start) / step)`.
    pub fn len(&self) -> usize {
        ((self.end - self.start + self.step - 1) / self.step) as usize
    }

    /// Always false; construction rejects empty ranges.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if `ts` is one of the expected bucket starts.
    pub fn contains(&self, ts: i64) -> bool {
        ts >= self.start && ts < self.end && (ts - self.start) % self.step == 0
    }

    /// Position of `ts` on the grid, if it is on the grid.
    pub fn index_of(&self, ts: i64) -> Option<usize> {
        self.contains(ts)
            .then(|| ((ts - self.start) / self.step) as usize)
    }

    /// Lazy iterator over the bucket starts. Call again to restart.
    pub fn iter(&self) -> TimelineIter {
        TimelineIter {
            next: self.start,
            end: self.end,
            step: self.step,
        }
    }
}

impl IntoIterator for &Timeline {
    type Item = i64;
    type IntoIter = TimelineIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct TimelineIter {
    next: i64,
    end: i64,
    step: i64,
}

impl Iterator for TimelineIter {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        if self.next >= self.end {
            return None;
        }
        let current = self.next;
        self.next = self.next.saturating_add(self.step);
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.next >= self.end {
            0
        } else {
            ((self.end - self.next + self.step - 1) / self.step) as usize
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TimelineIter {}
