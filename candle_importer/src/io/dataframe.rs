//! Conversion of the export table into a polars frame.

use polars::prelude::*;
use snafu::{ResultExt, ensure};

use crate::{
    interpolate::{CandleRow, CandleTable},
    io::sink::{ConversionSnafu, PolarsSnafu, SinkError},
};

/// Column order of every export.
pub const TIME_COLUMN: &str = "time";
pub const INTERPOLATED_COLUMN: &str = "interpolated";

/// Builds `time, open, high, low, close, volume[, interpolated]`.
///
/// `time` is a naive millisecond datetime holding the UTC bucket start. The
/// marker column is only present when the table was gap-filled.
pub fn table_to_dataframe(table: &CandleTable) -> Result<DataFrame, SinkError> {
    ensure!(
        !table.is_empty(),
        ConversionSnafu {
            message: "refusing to export an empty table",
        }
    );

    let millis: Vec<i64> = table.rows.iter().map(|r| r.timestamp * 1_000).collect();
    let time = Series::new(TIME_COLUMN.into(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
        .context(PolarsSnafu)?;

    let mut columns = Vec::with_capacity(7);
    columns.push(time.into_column());
    for (idx, name) in CandleRow::VALUE_COLUMNS.iter().enumerate() {
        let values: Vec<f64> = table.rows.iter().map(|r| r.values()[idx]).collect();
        columns.push(Column::new((*name).into(), values));
    }
    if table.has_interpolated_column() {
        let flags: Vec<bool> = table.rows.iter().map(|r| r.interpolated).collect();
        columns.push(Column::new(INTERPOLATED_COLUMN.into(), flags));
    }

    DataFrame::new(columns).context(PolarsSnafu)
}
