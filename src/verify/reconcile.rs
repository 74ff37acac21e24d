//! Station-set reconciliation across the artifacts of one tree.
//!
//! One generic routine compares the station ids derived from every source and
//! records, per station, where it was found and where it was not.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::model::TrendsError;

/// Where a set of station ids was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationSource {
    /// `station_id` column of the sitemeta table.
    SiteMeta,
    /// Per-station series files in `data_<var>/`.
    SeriesFiles,
    /// Trend-window series files for one period and sub-key.
    TrendSeriesFiles,
    /// Trend table rows for one period and sub-key.
    TrendTable,
}

impl StationSource {
    pub const ALL: [StationSource; 4] = [
        StationSource::SiteMeta,
        StationSource::SeriesFiles,
        StationSource::TrendSeriesFiles,
        StationSource::TrendTable,
    ];
}

impl fmt::Display for StationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StationSource::SiteMeta => "sitemeta",
            StationSource::SeriesFiles => "series files",
            StationSource::TrendSeriesFiles => "trend series files",
            StationSource::TrendTable => "trend table",
        };
        f.write_str(name)
    }
}

/// A station that is not present in every source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationDiscrepancy {
    pub station_id: String,
    pub present_in: Vec<StationSource>,
    pub missing_from: Vec<StationSource>,
}

/// Result of reconciling several station sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    #[serde(skip)]
    pub sets: BTreeMap<StationSource, BTreeSet<String>>,
    pub discrepancies: Vec<StationDiscrepancy>,
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        self.discrepancies.is_empty()
    }

    /// Stations absent from `source` but present in at least one other.
    pub fn missing_from(&self, source: StationSource) -> Vec<&str> {
        self.discrepancies
            .iter()
            .filter(|d| d.missing_from.contains(&source))
            .map(|d| d.station_id.as_str())
            .collect()
    }

    /// Stations present in `source` and in no other source.
    pub fn only_in(&self, source: StationSource) -> Vec<&str> {
        self.discrepancies
            .iter()
            .filter(|d| d.present_in.as_slice() == [source])
            .map(|d| d.station_id.as_str())
            .collect()
    }

    /// `(a, b, ids in a but not in b)` for every ordered pair of sources with
    /// a non-empty difference.
    pub fn pairwise_differences(&self) -> Vec<(StationSource, StationSource, BTreeSet<String>)> {
        let mut out = Vec::new();
        for (a, set_a) in &self.sets {
            for (b, set_b) in &self.sets {
                if a == b {
                    continue;
                }
                let diff: BTreeSet<String> = set_a.difference(set_b).cloned().collect();
                if !diff.is_empty() {
                    out.push((*a, *b, diff));
                }
            }
        }
        out
    }
}

/// Derives one station set per source with `extract` and reports every
/// station not present in all of them.
pub fn reconcile<F>(sources: &[StationSource], mut extract: F) -> Result<Reconciliation, TrendsError>
where
    F: FnMut(StationSource) -> Result<BTreeSet<String>, TrendsError>,
{
    let mut sets = BTreeMap::new();
    for source in sources {
        sets.insert(*source, extract(*source)?);
    }

    let union: BTreeSet<&String> = sets.values().flatten().collect();
    let mut discrepancies = Vec::new();
    for station_id in union {
        let (present_in, missing_from): (Vec<StationSource>, Vec<StationSource>) =
            sets.keys().copied().partition(|source| sets[source].contains(station_id));
        if !missing_from.is_empty() {
            discrepancies.push(StationDiscrepancy {
                station_id: station_id.clone(),
                present_in,
                missing_from,
            });
        }
    }

    Ok(Reconciliation { sets, discrepancies })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_equal_sets_have_no_discrepancies() {
        let result = reconcile(&StationSource::ALL, |_| Ok(ids(&["AT0002R", "NO0042"]))).unwrap();
        assert!(result.is_consistent());
        assert!(result.pairwise_differences().is_empty());
    }

    #[test]
    fn test_station_missing_from_trend_table_is_one_discrepancy() {
        let result = reconcile(&StationSource::ALL, |source| {
            Ok(match source {
                StationSource::TrendTable => ids(&["AT0002R"]),
                _ => ids(&["AT0002R", "NO0042"]),
            })
        })
        .unwrap();

        assert_eq!(result.discrepancies.len(), 1, "exactly one mismatching station");
        let d = &result.discrepancies[0];
        assert_eq!(d.station_id, "NO0042");
        assert_eq!(d.missing_from, vec![StationSource::TrendTable]);
        assert_eq!(d.present_in.len(), 3);
        assert!(result.only_in(StationSource::TrendTable).is_empty());
        assert_eq!(result.missing_from(StationSource::TrendTable), vec!["NO0042"]);
    }

    #[test]
    fn test_pairwise_differences_are_directional() {
        let result = reconcile(&[StationSource::SiteMeta, StationSource::SeriesFiles], |source| {
            Ok(match source {
                StationSource::SiteMeta => ids(&["A", "B"]),
                _ => ids(&["B", "C"]),
            })
        })
        .unwrap();

        let diffs = result.pairwise_differences();
        assert_eq!(diffs.len(), 2);
        assert!(diffs.contains(&(StationSource::SiteMeta, StationSource::SeriesFiles, ids(&["A"]))));
        assert!(diffs.contains(&(StationSource::SeriesFiles, StationSource::SiteMeta, ids(&["C"]))));
        assert_eq!(result.only_in(StationSource::SeriesFiles), vec!["C"]);
    }

    #[test]
    fn test_extraction_error_is_propagated() {
        let result = reconcile(&StationSource::ALL, |source| match source {
            StationSource::SiteMeta => Err(TrendsError::InvalidConfiguration("boom".into())),
            _ => Ok(BTreeSet::new()),
        });
        assert!(result.is_err());
    }
}
