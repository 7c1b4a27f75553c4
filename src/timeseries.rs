//! Helpers for time-indexed tables.
//!
//! Every time-indexed `DataFrame` in this crate carries a `date_time` column of
//! dtype `Datetime(Microseconds)`. Value columns are `Float64`.

use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;

use crate::error::{Result, WbError};
use crate::schema::timeseries::DATE_TIME;
use crate::window::SimWindow;

/// Build the `date_time` column from naive timestamps.
pub fn datetime_column(index: &[NaiveDateTime]) -> Result<Column> {
    let micros: Vec<i64> = index
        .iter()
        .map(|t| t.and_utc().timestamp_micros())
        .collect();
    let column = Column::new(DATE_TIME.into(), &micros)
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;
    Ok(column)
}

/// Read the `date_time` column back as naive timestamps.
pub fn time_index(df: &DataFrame) -> Result<Vec<NaiveDateTime>> {
    let column = df
        .column(DATE_TIME)
        .map_err(|_| WbError::MissingColumn(DATE_TIME.to_string()))?;
    let unit = match column.dtype() {
        DataType::Datetime(unit, _) => *unit,
        other => {
            return Err(WbError::General(format!(
                "Column '{DATE_TIME}' must be a datetime, found {other}"
            )))
        }
    };

    let physical = column.cast(&DataType::Int64)?;
    physical
        .i64()?
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            let v = v.ok_or_else(|| WbError::General(format!("Null {DATE_TIME} at row {i}")))?;
            from_timestamp(v, unit)
                .ok_or_else(|| WbError::General(format!("Timestamp out of range at row {i}")))
        })
        .collect()
}

fn from_timestamp(value: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let dt = match unit {
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(value)),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(value),
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(value),
    };
    dt.map(|d| d.naive_utc())
}

/// Values of a numeric column as f64. Nulls read as 0.
pub fn values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| WbError::MissingColumn(name.to_string()))?
        .cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().map(|v| v.unwrap_or(0.0)).collect())
}

/// Like [`values`], but `None` when the column is absent.
pub fn optional_values(df: &DataFrame, name: &str) -> Result<Option<Vec<f64>>> {
    if df.schema().contains(name) {
        values(df, name).map(Some)
    } else {
        Ok(None)
    }
}

/// Assemble a time-indexed frame from named value columns.
pub fn frame<S: AsRef<str>>(index: &[NaiveDateTime], columns: Vec<(S, Vec<f64>)>) -> Result<DataFrame> {
    let mut out = Vec::with_capacity(columns.len() + 1);
    out.push(datetime_column(index)?);
    for (name, values) in columns {
        if values.len() != index.len() {
            return Err(WbError::General(format!(
                "Column '{}' has {} values for an index of {}",
                name.as_ref(),
                values.len(),
                index.len()
            )));
        }
        out.push(Column::new(name.as_ref().into(), &values));
    }
    Ok(DataFrame::new(out)?)
}

/// Keep only the rows whose timestamp falls inside `window`.
pub fn restrict(df: &DataFrame, window: &SimWindow) -> Result<DataFrame> {
    if window.is_unbounded() {
        return Ok(df.clone());
    }
    let mask: Vec<bool> = time_index(df)?
        .iter()
        .map(|t| window.contains(t))
        .collect();
    let mask = BooleanChunked::from_slice("mask".into(), &mask);
    Ok(df.filter(&mask)?)
}
