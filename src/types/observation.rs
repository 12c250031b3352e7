//! Observation rows and the polars frame they are stored and returned in.
//!
//! On disk a partition is a parquet file with three columns: `station_id` (string),
//! `timestamp` (UTC epoch milliseconds) and `value` (nullable float). Callers get the
//! same rows with the timestamp exposed as a proper `datetime` column.

use chrono::{DateTime, Utc};
use polars::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const STATION_ID_COL: &str = "station_id";
pub const TIMESTAMP_COL: &str = "timestamp";
pub const DATETIME_COL: &str = "datetime";
pub const VALUE_COL: &str = "value";

/// One reading of the configured variable at one station.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub station_id: String,
    pub datetime: DateTime<Utc>,
    /// `None` when the upstream reported a missing value.
    pub value: Option<f64>,
}

/// Builds a storage-layout frame from observation rows.
pub(crate) fn observations_to_frame(rows: &[Observation]) -> PolarsResult<DataFrame> {
    let station_ids: Vec<String> = rows.iter().map(|r| r.station_id.clone()).collect();
    let timestamps: Vec<i64> = rows.iter().map(|r| r.datetime.timestamp_millis()).collect();
    let values: Vec<Option<f64>> = rows.iter().map(|r| r.value).collect();
    df!(
        STATION_ID_COL => station_ids,
        TIMESTAMP_COL => timestamps,
        VALUE_COL => values,
    )
}

/// Reads observation rows back out of a storage-layout frame.
pub(crate) fn frame_to_observations(df: &DataFrame) -> PolarsResult<Vec<Observation>> {
    let station_ids = df.column(STATION_ID_COL)?.as_materialized_series().str()?;
    let timestamps = df.column(TIMESTAMP_COL)?.as_materialized_series().i64()?;
    let values = df.column(VALUE_COL)?.as_materialized_series().f64()?;

    let mut rows = Vec::with_capacity(df.height());
    for ((station_id, timestamp), value) in station_ids
        .into_iter()
        .zip(timestamps.into_iter())
        .zip(values.into_iter())
    {
        let (Some(station_id), Some(timestamp)) = (station_id, timestamp) else {
            continue;
        };
        let datetime = DateTime::<Utc>::from_timestamp_millis(timestamp).ok_or_else(|| {
            PolarsError::ComputeError(format!("timestamp {} is out of range", timestamp).into())
        })?;
        rows.push(Observation {
            station_id: station_id.to_string(),
            datetime,
            value,
        });
    }
    Ok(rows)
}

/// Keeps only the rows whose station is in `allowed`.
pub(crate) fn retain_stations(df: &DataFrame, allowed: &HashSet<String>) -> PolarsResult<DataFrame> {
    let station_ids = df.column(STATION_ID_COL)?.as_materialized_series().str()?;
    let mask: BooleanChunked = station_ids
        .into_iter()
        .map(|id| id.is_some_and(|id| allowed.contains(id)))
        .collect();
    df.filter(&mask)
}

/// Keeps rows with `start <= timestamp <= end`.
pub(crate) fn trim_to_window(
    df: DataFrame,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> PolarsResult<DataFrame> {
    df.lazy()
        .filter(
            col(TIMESTAMP_COL)
                .gt_eq(lit(start.timestamp_millis()))
                .and(col(TIMESTAMP_COL).lt_eq(lit(end.timestamp_millis()))),
        )
        .collect()
}

/// The result of a cache query.
///
/// Wraps the assembled rows in storage layout. Use [`ObservationFrame::frame`] for a
/// `LazyFrame` with a `datetime` column, or [`ObservationFrame::observations`] for
/// typed rows.
#[derive(Debug, Clone)]
pub struct ObservationFrame {
    data: DataFrame,
    output_path: Option<PathBuf>,
}

impl ObservationFrame {
    pub(crate) fn new(data: DataFrame) -> Self {
        Self {
            data,
            output_path: None,
        }
    }

    pub(crate) fn with_output_path(mut self, path: PathBuf) -> Self {
        self.output_path = Some(path);
        self
    }

    pub fn height(&self) -> usize {
        self.data.height()
    }

    pub fn is_empty(&self) -> bool {
        self.data.height() == 0
    }

    /// Lazy view with columns `station_id`, `datetime` (UTC, milliseconds) and `value`.
    pub fn frame(&self) -> LazyFrame {
        self.data.clone().lazy().select([
            col(STATION_ID_COL),
            col(TIMESTAMP_COL)
                .cast(DataType::Datetime(TimeUnit::Milliseconds, None))
                .alias(DATETIME_COL),
            col(VALUE_COL),
        ])
    }

    pub fn collect(&self) -> PolarsResult<DataFrame> {
        self.frame().collect()
    }

    pub fn observations(&self) -> PolarsResult<Vec<Observation>> {
        frame_to_observations(&self.data)
    }

    /// Where the result was also written, if materialization was requested.
    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }
}
