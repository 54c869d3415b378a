//! Canonical in-memory representation of one candle (OHLCV).
//!
//! Every [`CandleSource`](crate::providers::CandleSource) response is decoded
//! into this shape before it reaches the reconciler, regardless of vendor.

use chrono::{DateTime, Utc};
use serde_json::Value;

/// A single OHLCV record for the bucket starting at `timestamp`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    /// Bucket start, epoch seconds (UTC).
    pub timestamp: i64,

    /// Opening price.
    pub open: f64,

    /// Highest price during the bucket.
    pub high: f64,

    /// Lowest price during the bucket.
    pub low: f64,

    /// Closing price.
    pub close: f64,

    /// Volume traded during the bucket. Never negative.
    pub volume: f64,
}

impl Candle {
    /// Decodes one wire row shaped `[time, low, high, open, close, volume]`.
    ///
    /// Returns `None` for anything else: wrong arity, non-numeric cells,
    /// non-finite prices or a negative volume.
    pub fn from_wire_row(row: &Value) -> Option<Self> {
        let cells = row.as_array()?;
        if cells.len() != 6 {
            return None;
        }

        let timestamp = match &cells[0] {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.is_finite())
                    .map(|f| f as i64)
            })?,
            _ => return None,
        };

        let mut values = [0.0_f64; 5];
        for (slot, cell) in values.iter_mut().zip(&cells[1..]) {
            *slot = number(cell)?;
        }
        let [low, high, open, close, volume] = values;
        if volume < 0.0 {
            return None;
        }

        Some(Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    /// Bucket start as a UTC datetime.
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

// Some feeds quote prices as strings.
fn number(cell: &Value) -> Option<f64> {
    let v = match cell {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_coinbase_column_order() {
        let c = Candle::from_wire_row(&json!([1_600_000_020, 9.0, 12.0, 10.0, 11.0, 42.5])).unwrap();
        assert_eq!(c.timestamp, 1_600_000_020);
        assert_eq!((c.open, c.high, c.low, c.close, c.volume), (10.0, 12.0, 9.0, 11.0, 42.5));
    }

    #[test]
    fn accepts_stringly_prices() {
        let c = Candle::from_wire_row(&json!([60, "1.5", "2", "1", "1.75", "0"])).unwrap();
        assert_eq!(c.high, 2.0);
        assert_eq!(c.volume, 0.0);
    }

    #[test]
    fn rejects_malformed_rows() {
        for row in [
            json!({"time": 60}),
            json!([60, 1.0, 2.0, 1.0, 1.0]),
            json!([60, 1.0, 2.0, 1.0, 1.0, 3.0, 9.9]),
            json!(["60", 1.0, 2.0, 1.0, 1.0, 3.0]),
            json!([60.5, 1.0, 2.0, 1.0, 1.0, 3.0]),
            json!([60, null, 2.0, 1.0, 1.0, 3.0]),
            json!([60, 1.0, 2.0, 1.0, 1.0, -3.0]),
            json!("garbage"),
        ] {
            assert_eq!(Candle::from_wire_row(&row), None, "{row}");
        }
    }

    #[test]
    fn time_is_utc() {
        let c = Candle::from_wire_row(&json!([0, 1, 1, 1, 1, 1])).unwrap();
        assert_eq!(c.time().unwrap().to_rfc3339(), "1970-01-01T00:00:00+00:00");
    }
}
