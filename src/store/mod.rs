/// Station artifact store: the flat-file layout shared by the trend driver and
/// the consistency verifier.
///
/// Layout of a data repository:
/// ```text
///  <repo>/
///    obs_output/
///      sitemeta_<var>.csv            station metadata (obs tree only)
///      trends_<var>.csv              aggregated trend table
///      data_<var>/
///        data_<var>_<id>_monthly.csv       per-station series (monthly vars)
///        <var>_<id>_daily.csv              per-station series (daily vars)
///        <var>_<id>_<y0>-<y1>_<sub>_yearly.csv   trend-window series
///    mod_output/
///      trends_<var>.csv
///      data_<var>/ ...
/// ```
///
/// Submodules:
/// - `naming`: formats and parses artifact names.
/// - `tables`: sitemeta and trend table codecs.
/// - `series`: per-station time series codec.

pub mod naming;
pub mod series;
pub mod tables;

use std::fs;
use std::path::{Path, PathBuf};

use crate::model::{OutputTree, Resolution, TrendsError};
use naming::StationSeriesName;

/// Path of the sitemeta table for `variable`.
pub fn sitemeta_path(repo: &Path, variable: &str) -> PathBuf {
    OutputTree::Obs
        .root(repo)
        .join(naming::sitemeta_file_name(variable))
}

/// Path of the trend table for `variable` in `tree`.
pub fn trend_table_path(repo: &Path, tree: OutputTree, variable: &str) -> PathBuf {
    tree.root(repo).join(naming::trend_table_file_name(variable))
}

/// Per-variable data directory in `tree`.
pub fn data_dir(repo: &Path, tree: OutputTree, variable: &str) -> PathBuf {
    tree.root(repo).join(naming::data_dir_name(variable))
}

/// Names of the regular, non-hidden files in `dir`, sorted.
///
/// A missing directory yields an empty list.
pub fn list_file_names(dir: &Path) -> Result<Vec<String>, TrendsError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| TrendsError::io(dir, e))? {
        let entry = entry.map_err(|e| TrendsError::io(dir, e))?;
        let file_type = entry.file_type().map_err(|e| TrendsError::io(entry.path(), e))?;
        if !file_type.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        names.push(name);
    }
    names.sort();
    Ok(names)
}

/// Finds the per-station series file for a station, accepting either the
/// `data_<var>_` or the `<var>_` prefix. Returns `None` if neither exists.
pub fn locate_station_series(
    dir: &Path,
    variable: &str,
    station_id: &str,
    resolution: Resolution,
) -> Option<PathBuf> {
    let name = StationSeriesName::new(variable, station_id, resolution);
    name.candidate_file_names()
        .into_iter()
        .map(|candidate| dir.join(candidate))
        .find(|path| path.is_file())
}
