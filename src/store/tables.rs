//! Sitemeta and trend table codecs.
//!
//! Columns are located by header name, so tables carrying an extra unnamed
//! leading index column (as written by dataframe tools) read the same as
//! tables without one.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::model::{Resolution, StationMeta, SubKey, TrendRow, TrendsError};

pub const SITEMETA_COLUMNS: &[&str] = &[
    "var",
    "station_id",
    "station_name",
    "latitude",
    "longitude",
    "altitude",
    "unit",
    "freq",
    "framework",
    "matrix",
];

pub const TREND_COLUMNS: &[&str] = &[
    "var",
    "station_id",
    "period",
    "season",
    "trend [%/yr]",
    "trend err [%/yr]",
    "yoffs",
    "slope",
    "slope err",
    "num yrs",
    "pval",
    "unit",
];

/// Extra trend table column for daily (percentile) variables.
pub const PERCENTILE_COLUMN: &str = "percentile";

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

fn read_rows<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, TrendsError> {
    if !path.is_file() {
        return Err(TrendsError::MissingFile(path.to_path_buf()));
    }
    let mut reader = csv::Reader::from_path(path).map_err(|e| TrendsError::table(path, e))?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .map_err(|e| TrendsError::table(path, e))
}

/// Reads `sitemeta_<var>.csv`.
pub fn read_sitemeta(path: &Path) -> Result<Vec<StationMeta>, TrendsError> {
    read_rows(path)
}

/// Reads `trends_<var>.csv`.
pub fn read_trend_table(path: &Path) -> Result<Vec<TrendRow>, TrendsError> {
    read_rows(path)
}

/// Station ids listed in a sitemeta table.
pub fn sitemeta_station_ids(rows: &[StationMeta]) -> BTreeSet<String> {
    rows.iter().map(|r| r.station_id.clone()).collect()
}

/// Station ids with at least one trend row for `period_label` and `sub_key`.
pub fn trend_table_station_ids(rows: &[TrendRow], period_label: &str, sub_key: &SubKey) -> BTreeSet<String> {
    rows.iter()
        .filter(|r| r.matches(period_label, sub_key))
        .map(|r| r.station_id.clone())
        .collect()
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

fn create_writer(path: &Path) -> Result<csv::Writer<fs::File>, TrendsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| TrendsError::io(parent, e))?;
    }
    csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| TrendsError::table(path, e))
}

fn format_cell(value: Option<f64>) -> String {
    match value {
        Some(v) if !v.is_nan() => v.to_string(),
        _ => String::new(),
    }
}

/// Writes `sitemeta_<var>.csv`, header included even with no rows.
pub fn write_sitemeta(path: &Path, rows: &[StationMeta]) -> Result<(), TrendsError> {
    let mut writer = create_writer(path)?;
    writer
        .write_record(SITEMETA_COLUMNS)
        .map_err(|e| TrendsError::table(path, e))?;
    for row in rows {
        writer
            .write_record([
                row.var.clone(),
                row.station_id.clone(),
                row.station_name.clone(),
                format_cell(row.latitude),
                format_cell(row.longitude),
                format_cell(row.altitude),
                row.unit.clone(),
                row.freq.clone(),
                row.framework.clone(),
                row.matrix.clone(),
            ])
            .map_err(|e| TrendsError::table(path, e))?;
    }
    writer.flush().map_err(|e| TrendsError::io(path, e))
}

/// Writes `trends_<var>.csv`. The percentile column is only present for daily
/// variables.
pub fn write_trend_table(path: &Path, rows: &[TrendRow], resolution: Resolution) -> Result<(), TrendsError> {
    let with_percentile = resolution == Resolution::Daily;
    let mut writer = create_writer(path)?;

    let mut header: Vec<&str> = TREND_COLUMNS.to_vec();
    if with_percentile {
        header.push(PERCENTILE_COLUMN);
    }
    writer
        .write_record(&header)
        .map_err(|e| TrendsError::table(path, e))?;

    for row in rows {
        let mut record = vec![
            row.var.clone(),
            row.station_id.clone(),
            row.period.clone(),
            row.season.clone(),
            format_cell(row.trend_pct),
            format_cell(row.trend_pct_err),
            format_cell(row.yoffs),
            format_cell(row.slope),
            format_cell(row.slope_err),
            format_cell(row.num_yrs),
            format_cell(row.pval),
            row.unit.clone(),
        ];
        if with_percentile {
            record.push(row.percentile.map(|p| p.to_string()).unwrap_or_default());
        }
        writer
            .write_record(&record)
            .map_err(|e| TrendsError::table(path, e))?;
    }
    writer.flush().map_err(|e| TrendsError::io(path, e))
}
