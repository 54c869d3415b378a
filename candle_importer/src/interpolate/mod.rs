//! Gap filling: placeholder rows for missing buckets, estimated per column.
//!
//! Each numeric column is interpolated on its own, with the bucket index on
//! the timeline as the x axis. Known values are never touched. Placeholders
//! before the first or after the last known bucket take the nearest known
//! value.

pub mod linear;
pub mod polynomial;
pub mod spline;

use snafu::ensure;
use tracing::debug;

use crate::{
    errors::{ImportError, InvalidOrderSnafu},
    models::{
        bar::Candle,
        interpolation::{InterpolationMethod, InterpolationSpec},
    },
    reconcile::ReconciliationResult,
    timeline::Timeline,
};

/// One row of the export table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandleRow {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// True for rows created to fill a missing bucket.
    pub interpolated: bool,
}

impl CandleRow {
    pub const VALUE_COLUMNS: [&'static str; 5] = ["open", "high", "low", "close", "volume"];

    fn known(c: &Candle) -> Self {
        Self {
            timestamp: c.timestamp,
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
            interpolated: false,
        }
    }

    fn placeholder(timestamp: i64) -> Self {
        Self {
            timestamp,
            open: f64::NAN,
            high: f64::NAN,
            low: f64::NAN,
            close: f64::NAN,
            volume: f64::NAN,
            interpolated: true,
        }
    }

    /// Values in [`Self::VALUE_COLUMNS`] order.
    pub fn values(&self) -> [f64; 5] {
        [self.open, self.high, self.low, self.close, self.volume]
    }

    fn value_mut(&mut self, column: usize) -> &mut f64 {
        match column {
            0 => &mut self.open,
            1 => &mut self.high,
            2 => &mut self.low,
            3 => &mut self.close,
            _ => &mut self.volume,
        }
    }
}

/// Final ordered table handed to a sink.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleTable {
    pub rows: Vec<CandleRow>,
    /// Set when gaps were filled; the table then carries an `interpolated`
    /// column.
    pub method: Option<InterpolationMethod>,
}

impl CandleTable {
    /// Real candles only, no marker column.
    pub fn from_candles(candles: &[Candle]) -> Self {
        Self {
            rows: candles.iter().map(CandleRow::known).collect(),
            method: None,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_interpolated_column(&self) -> bool {
        self.method.is_some()
    }

    pub fn interpolated_count(&self) -> usize {
        self.rows.iter().filter(|r| r.interpolated).count()
    }

    pub fn first_timestamp(&self) -> Option<i64> {
        self.rows.first().map(|r| r.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<i64> {
        self.rows.last().map(|r| r.timestamp)
    }
}

/// Rejects orders that cannot be fitted to `known_points` values.
///
/// A degree-`order` fit consumes `order + 1` points. Splines are further
/// limited to degree [`spline::MAX_DEGREE`].
pub fn validate_order(
    method: InterpolationMethod,
    order: Option<u32>,
    known_points: Option<usize>,
) -> Result<(), ImportError> {
    if !method.needs_order() {
        return Ok(());
    }
    let order = order.unwrap_or(0);
    ensure!(
        order >= 1,
        InvalidOrderSnafu {
            method,
            order,
            message: "order must be a positive integer",
        }
    );
    ensure!(
        method != InterpolationMethod::Spline || order as usize <= spline::MAX_DEGREE,
        InvalidOrderSnafu {
            method,
            order,
            message: format!("spline order must be at most {}", spline::MAX_DEGREE),
        }
    );
    if let Some(known) = known_points {
        ensure!(
            (order as usize) < known,
            InvalidOrderSnafu {
                method,
                order,
                message: format!(
                    "a degree {order} fit needs {} known points, only {known} available",
                    order + 1
                ),
            }
        );
    }
    Ok(())
}

/// Builds the export table, filling gaps when `spec` asks for it.
///
/// With interpolation disabled, or nothing missing, the reconciled candles
/// pass through unchanged.
pub fn fill_gaps(
    result: &ReconciliationResult,
    timeline: &Timeline,
    spec: &InterpolationSpec,
) -> Result<CandleTable, ImportError> {
    let Some(method) = spec.effective_method() else {
        return Ok(CandleTable::from_candles(&result.candles));
    };
    if result.missing.is_empty() {
        return Ok(CandleTable::from_candles(&result.candles));
    }

    let mut rows = merge_placeholders(&result.candles, &result.missing);

    // first record per bucket; exact dedup can leave several
    let mut known_rows: Vec<usize> = Vec::with_capacity(result.candles.len());
    let mut last_ts = None;
    for (i, row) in rows.iter().enumerate() {
        if !row.interpolated && last_ts != Some(row.timestamp) {
            known_rows.push(i);
            last_ts = Some(row.timestamp);
        }
    }

    validate_order(method, spec.order, Some(known_rows.len()))?;
    let order = spec.order.unwrap_or(1) as usize;

    let x_of = |ts: i64| ((ts - timeline.start()) / timeline.step()) as f64;
    let xs: Vec<f64> = known_rows.iter().map(|&i| x_of(rows[i].timestamp)).collect();
    let gap_rows: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.interpolated.then_some(i))
        .collect();
    let targets: Vec<f64> = gap_rows.iter().map(|&i| x_of(rows[i].timestamp)).collect();

    for column in 0..CandleRow::VALUE_COLUMNS.len() {
        let ys: Vec<f64> = known_rows.iter().map(|&i| rows[i].values()[column]).collect();
        let filled = match method {
            InterpolationMethod::Linear => linear::interpolate(&xs, &ys, &targets),
            InterpolationMethod::Polynomial => polynomial::interpolate(&xs, &ys, &targets, order),
            InterpolationMethod::Spline => spline::interpolate(&xs, &ys, &targets, order),
        };
        for (&row, value) in gap_rows.iter().zip(filled) {
            *rows[row].value_mut(column) = value;
        }
    }

    debug!(%method, filled = gap_rows.len(), "gaps interpolated");
    Ok(CandleTable {
        rows,
        method: Some(method),
    })
}

/// Merges real candles and placeholder rows into one ascending table.
fn merge_placeholders(candles: &[Candle], missing: &[i64]) -> Vec<CandleRow> {
    let mut rows = Vec::with_capacity(candles.len() + missing.len());
    let mut known = candles.iter().peekable();
    let mut gaps = missing.iter().peekable();
    loop {
        let take_known = match (known.peek(), gaps.peek()) {
            (Some(c), Some(&&g)) => c.timestamp < g,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        if take_known {
            if let Some(c) = known.next() {
                rows.push(CandleRow::known(c));
            }
        } else if let Some(&g) = gaps.next() {
            rows.push(CandleRow::placeholder(g));
        }
    }
    rows
}

/// Value at `t`: the nearest known value outside `xs`, the known value on a
/// hit, otherwise `inner(i)` where `xs[i - 1] < t < xs[i]`.
pub(crate) fn hold_or(xs: &[f64], ys: &[f64], t: f64, inner: impl FnOnce(usize) -> f64) -> f64 {
    let last = xs.len() - 1;
    if t <= xs[0] {
        return ys[0];
    }
    if t >= xs[last] {
        return ys[last];
    }
    let i = xs.partition_point(|&x| x < t);
    if xs[i] == t { ys[i] } else { inner(i) }
}
