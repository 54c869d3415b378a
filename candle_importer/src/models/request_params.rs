use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::models::granularity::Granularity;

/// One bounded sub-range of the import, fetched with a single remote query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalWindow {
    /// Inclusive start, epoch seconds.
    pub start: i64,
    /// Exclusive end, epoch seconds. Never past the import range end.
    pub end: i64,
}

impl RetrievalWindow {
    pub fn span(&self) -> i64 {
        self.end - self.start
    }
}

/// Vendor-agnostic parameters for one historical candle query.
///
/// This is the standard input for every
/// [`CandleSource`](crate::providers::CandleSource) implementation. Which
/// granularities a vendor accepts is checked by the provider itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandleQuery {
    /// Product to query (e.g. `"BTC-USD"`).
    pub product_id: String,

    /// Start of the requested window (inclusive, UTC).
    pub start: DateTime<Utc>,

    /// End of the requested window (UTC).
    pub end: DateTime<Utc>,

    /// Bucket width of the requested candles.
    pub granularity: Granularity,
}

impl CandleQuery {
    /// Builds the query for `window`. Returns `None` if either bound is out
    /// of chrono's representable range.
    pub fn for_window(
        product_id: &str,
        window: RetrievalWindow,
        granularity: Granularity,
    ) -> Option<Self> {
        Some(Self {
            product_id: product_id.to_string(),
            start: DateTime::from_timestamp(window.start, 0)?,
            end: DateTime::from_timestamp(window.end, 0)?,
            granularity,
        })
    }

    /// ISO8601 start, e.g. `2018-01-01T23:00:00Z`.
    pub fn start_iso(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// ISO8601 end, e.g. `2018-01-02T00:00:00Z`.
    pub fn end_iso(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_bounds_use_zulu_suffix() {
        let q = CandleQuery::for_window(
            "BTC-USD",
            RetrievalWindow {
                start: 1_514_847_600,
                end: 1_514_851_200,
            },
            Granularity::ONE_MINUTE,
        )
        .unwrap();
        assert_eq!(q.start_iso(), "2018-01-01T23:00:00Z");
        assert_eq!(q.end_iso(), "2018-01-02T00:00:00Z");
    }
}
