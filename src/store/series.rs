//! Per-station time series codec.
//!
//! Series files have a timestamp first column and one value column named
//! after the variable. Missing values are written as empty cells; `nan` cells
//! are read as missing as well.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fs;
use std::path::Path;

use crate::model::TrendsError;
use crate::periods::ReadWindow;

const TIMESTAMP_HEADER: &str = "time";

/// An ordered sequence of (timestamp, value) pairs; missing values are NaN.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeries {
    points: Vec<(NaiveDateTime, f64)>,
}

impl TimeSeries {
    /// Builds a series, ordering the points by timestamp.
    pub fn new(mut points: Vec<(NaiveDateTime, f64)>) -> Self {
        points.sort_by_key(|(ts, _)| *ts);
        Self { points }
    }

    pub fn points(&self) -> &[(NaiveDateTime, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn missing_count(&self) -> usize {
        self.points.iter().filter(|(_, v)| v.is_nan()).count()
    }

    /// True for an empty series as well.
    pub fn is_all_missing(&self) -> bool {
        self.points.iter().all(|(_, v)| v.is_nan())
    }

    /// The points whose year falls inside `window`.
    pub fn within(&self, window: &ReadWindow) -> TimeSeries {
        use chrono::Datelike;
        TimeSeries {
            points: self
                .points
                .iter()
                .filter(|(ts, _)| window.contains_year(ts.year()))
                .copied()
                .collect(),
        }
    }

    /// Sets every value to NaN where `reference` is missing or has no point.
    pub fn mask_where_missing(&mut self, reference: &TimeSeries) {
        let observed: std::collections::HashSet<NaiveDateTime> = reference
            .points
            .iter()
            .filter(|(_, v)| !v.is_nan())
            .map(|(ts, _)| *ts)
            .collect();
        for (ts, value) in self.points.iter_mut() {
            if !observed.contains(ts) {
                *value = f64::NAN;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Parses `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DDTHH:MM:SS`.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// Date-only when the time is midnight, otherwise date and time.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    if ts.time() == NaiveTime::MIN {
        ts.format("%Y-%m-%d").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

// ---------------------------------------------------------------------------
// File codec
// ---------------------------------------------------------------------------

/// Reads a per-station series, taking values from the column named `variable`.
pub fn read_series(path: &Path, variable: &str) -> Result<TimeSeries, TrendsError> {
    if !path.is_file() {
        return Err(TrendsError::MissingFile(path.to_path_buf()));
    }
    let subject = path.display().to_string();
    let mut reader = csv::Reader::from_path(path).map_err(|e| TrendsError::table(path, e))?;

    let value_idx = reader
        .headers()
        .map_err(|e| TrendsError::table(path, e))?
        .iter()
        .position(|h| h == variable)
        .ok_or_else(|| TrendsError::parse(&subject, format!("no value column named '{}'", variable)))?;
    if value_idx == 0 {
        return Err(TrendsError::parse(&subject, "value column cannot be the timestamp column"));
    }

    let mut points = Vec::new();
    for (row_no, record) in reader.records().enumerate() {
        let record = record.map_err(|e| TrendsError::table(path, e))?;
        let raw_ts = record.get(0).unwrap_or("");
        let ts = parse_timestamp(raw_ts).ok_or_else(|| {
            TrendsError::parse(&subject, format!("row {}: invalid timestamp '{}'", row_no, raw_ts))
        })?;
        let raw_value = record.get(value_idx).unwrap_or("").trim();
        let value = if raw_value.is_empty() || raw_value.eq_ignore_ascii_case("nan") {
            f64::NAN
        } else {
            raw_value.parse::<f64>().map_err(|_| {
                TrendsError::parse(&subject, format!("row {}: invalid value '{}'", row_no, raw_value))
            })?
        };
        points.push((ts, value));
    }

    Ok(TimeSeries::new(points))
}

/// Writes a per-station series with header `time,<variable>`.
pub fn write_series(path: &Path, variable: &str, series: &TimeSeries) -> Result<(), TrendsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| TrendsError::io(parent, e))?;
    }
    let mut writer = csv::Writer::from_path(path).map_err(|e| TrendsError::table(path, e))?;
    writer
        .write_record([TIMESTAMP_HEADER, variable])
        .map_err(|e| TrendsError::table(path, e))?;
    for (ts, value) in series.points() {
        let cell = if value.is_nan() { String::new() } else { value.to_string() };
        writer
            .write_record([format_timestamp(ts), cell])
            .map_err(|e| TrendsError::table(path, e))?;
    }
    writer.flush().map_err(|e| TrendsError::io(path, e))
}
