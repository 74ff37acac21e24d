//! Station coverage counts: how many stations observed a variable at each
//! timestamp of the obs tree.

use chrono::NaiveDateTime;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::logging::{self, Component};
use crate::model::{OutputTree, Resolution, TrendsError};
use crate::store::{self, series};

/// Counts, per timestamp, the listed stations with a non-missing observed
/// value. Timestamps present in any station series are included, with a zero
/// count where every station is missing. Stations without a series file are
/// skipped.
pub fn station_counts(
    repo: &Path,
    variable: &str,
    resolution: Resolution,
    station_ids: &BTreeSet<String>,
) -> Result<BTreeMap<NaiveDateTime, usize>, TrendsError> {
    let dir = store::data_dir(repo, OutputTree::Obs, variable);
    let mut counts: BTreeMap<NaiveDateTime, usize> = BTreeMap::new();

    for station_id in station_ids {
        let Some(path) = store::locate_station_series(&dir, variable, station_id, resolution) else {
            logging::warn(
                Component::Store,
                Some(variable),
                &format!("no observed series for {}, not counted", station_id),
            );
            continue;
        };
        for (ts, value) in series::read_series(&path, variable)?.points() {
            let count = counts.entry(*ts).or_insert(0);
            if !value.is_nan() {
                *count += 1;
            }
        }
    }
    Ok(counts)
}

/// Station counts for every station in the variable's sitemeta table.
pub fn sitemeta_station_counts(
    repo: &Path,
    variable: &str,
    resolution: Resolution,
) -> Result<BTreeMap<NaiveDateTime, usize>, TrendsError> {
    let rows = store::tables::read_sitemeta(&store::sitemeta_path(repo, variable))?;
    station_counts(repo, variable, resolution, &store::tables::sitemeta_station_ids(&rows))
}

/// Smallest and largest count, or `None` for no timestamps.
pub fn count_range(counts: &BTreeMap<NaiveDateTime, usize>) -> Option<(usize, usize)> {
    let min = counts.values().min()?;
    let max = counts.values().max()?;
    Some((*min, *max))
}
