/// Core data types for the station trend output store.
///
/// This module defines the shared domain model imported by all other modules:
/// analysis periods, sub-keys, station metadata, trend rows and the crate
/// error type. It contains no I/O.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Output trees
// ---------------------------------------------------------------------------

/// Directory holding observation-side artifacts (and the sitemeta table).
pub const OBS_OUTPUT_DIR: &str = "obs_output";

/// Directory holding model-side artifacts.
pub const MOD_OUTPUT_DIR: &str = "mod_output";

/// One half of the artifact tree pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputTree {
    Obs,
    Mod,
}

impl OutputTree {
    pub const ALL: [OutputTree; 2] = [OutputTree::Obs, OutputTree::Mod];

    pub fn dir_name(&self) -> &'static str {
        match self {
            OutputTree::Obs => OBS_OUTPUT_DIR,
            OutputTree::Mod => MOD_OUTPUT_DIR,
        }
    }

    /// Root of this tree inside a data repository.
    pub fn root(&self, repo: &Path) -> PathBuf {
        repo.join(self.dir_name())
    }
}

impl fmt::Display for OutputTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Time resolution of the per-station series a variable is stored at.
///
/// Monthly variables are trended per season; daily variables (daily-max
/// ozone) are trended per yearly percentile of the daily values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Monthly,
    Daily,
}

impl Resolution {
    /// Tag used in file names and in the sitemeta `freq` column.
    pub fn tag(&self) -> &'static str {
        match self {
            Resolution::Monthly => "monthly",
            Resolution::Daily => "daily",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ---------------------------------------------------------------------------
// Analysis periods and sub-keys
// ---------------------------------------------------------------------------

/// A trend window. `start` and `end` are both included.
///
/// `min_years` is the sufficiency threshold handed to the trend engine; nothing
/// in this crate interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisPeriod {
    pub start: i32,
    pub end: i32,
    pub min_years: u32,
}

impl AnalysisPeriod {
    pub const fn new(start: i32, end: i32, min_years: u32) -> Self {
        Self { start, end, min_years }
    }

    /// The `period` label used in trend tables and file names, e.g. `2000-2019`.
    pub fn label(&self) -> String {
        format!("{:04}-{:04}", self.start, self.end)
    }
}

impl fmt::Display for AnalysisPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Distinguishes several trend rows for the same station and period.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubKey {
    /// Season label for monthly variables (`all`, `spring`, ...).
    Season(String),
    /// Yearly percentile of daily values for daily variables.
    Percentile(u8),
}

impl SubKey {
    /// File name token: the season label, or `NNp` for percentiles.
    pub fn token(&self) -> String {
        match self {
            SubKey::Season(label) => label.clone(),
            SubKey::Percentile(p) => format!("{:02}p", p),
        }
    }

    /// Inverse of [`SubKey::token`]. Returns `None` for tokens that are
    /// neither a plain alphanumeric season label nor `<digits>p`.
    pub fn from_token(token: &str) -> Option<SubKey> {
        if let Some(digits) = token.strip_suffix('p') {
            if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                return digits.parse().ok().map(SubKey::Percentile);
            }
        }
        if !token.is_empty() && token.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Some(SubKey::Season(token.to_string()));
        }
        None
    }
}

impl fmt::Display for SubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubKey::Season(label) => write!(f, "season {}", label),
            SubKey::Percentile(p) => write!(f, "percentile {}", p),
        }
    }
}

// ---------------------------------------------------------------------------
// Table rows
// ---------------------------------------------------------------------------

/// One row of `sitemeta_<variable>.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationMeta {
    pub var: String,
    pub station_id: String,
    pub station_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub unit: String,
    pub freq: String,
    pub framework: String,
    pub matrix: String,
}

/// One row of `trends_<variable>.csv`.
///
/// Statistic fields are `None` when the trend engine found too little data
/// for the window; they are written as empty cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendRow {
    pub var: String,
    pub station_id: String,
    pub period: String,
    pub season: String,
    #[serde(rename = "trend [%/yr]", default)]
    pub trend_pct: Option<f64>,
    #[serde(rename = "trend err [%/yr]", default)]
    pub trend_pct_err: Option<f64>,
    #[serde(default)]
    pub yoffs: Option<f64>,
    #[serde(default)]
    pub slope: Option<f64>,
    #[serde(rename = "slope err", default)]
    pub slope_err: Option<f64>,
    #[serde(rename = "num yrs", default)]
    pub num_yrs: Option<f64>,
    #[serde(default)]
    pub pval: Option<f64>,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub percentile: Option<u8>,
}

impl TrendRow {
    /// Whether this row belongs to the given period label and sub-key.
    ///
    /// Season sub-keys match the `season` column; percentile sub-keys match the
    /// `percentile` column.
    pub fn matches(&self, period_label: &str, sub_key: &SubKey) -> bool {
        if self.period != period_label {
            return false;
        }
        match sub_key {
            SubKey::Season(label) => self.season == *label,
            SubKey::Percentile(p) => self.percentile == Some(*p),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised by the store, retention manager, verifier and driver.
///
/// Coverage mismatches and missingness parity violations are findings, not
/// errors; they live in `verify::report`.
#[derive(Debug, Error)]
pub enum TrendsError {
    /// Empty or malformed period list, unregistered variable, empty sub-keys.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// A filesystem operation failed.
    #[error("I/O failure on {}: {source}", .path.display())]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A file the layout requires is absent.
    #[error("missing file: {}", .0.display())]
    MissingFile(PathBuf),
    /// A file name or cell does not follow the expected convention.
    #[error("parse error in '{subject}': {reason}")]
    ParseError { subject: String, reason: String },
    /// A CSV table could not be decoded.
    #[error("malformed table {}: {source}", .path.display())]
    MalformedTable {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    /// The TOML configuration could not be decoded.
    #[error("config parse error in {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl TrendsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TrendsError::IoFailure {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        TrendsError::ParseError {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn table(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        TrendsError::MalformedTable {
            path: path.into(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
