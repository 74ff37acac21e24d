//! Consistency verification of the obs/model artifact trees of a variable.
//!
//! Read-only. For every tree, period and sub-key the station ids derived from
//! the sitemeta table, the per-station series files, the trend-window series
//! files and the trend table are reconciled; stations that are not present
//! everywhere are reported as coverage mismatches. Observed and model series
//! of every sitemeta station are then compared for missingness parity.
//!
//! Findings never fail the check. Unreadable or malformed artifacts do.

pub mod parity;
pub mod reconcile;
pub mod report;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::config::TrendsConfig;
use crate::logging::{self, Component, FailureType};
use crate::model::{OutputTree, Resolution, SubKey, TrendsError};
use crate::store::naming::{ArtifactName, TrendSeriesName};
use crate::store::{self, series, tables};
use crate::variables;

use parity::check_missingness_parity;
use reconcile::{StationSource, reconcile};
use report::{ConsistencyReport, CoverageCheck, EscalatedStation, Finding, ParityViolation};

/// Parsed contents of one `data_<var>/` directory.
#[derive(Debug, Default)]
struct DataDirListing {
    /// Station id to per-station series file.
    series: BTreeMap<String, PathBuf>,
    trend_series: Vec<TrendSeriesName>,
}

/// Parses every entry of the data directory. A missing directory is empty.
///
/// `ParseError` for an entry fitting neither name template, for a station
/// series or trend-window series of the wrong resolution, and for a station
/// with series files under both prefixes.
fn scan_data_dir(dir: &Path, variable: &str, resolution: Resolution) -> Result<DataDirListing, TrendsError> {
    let mut listing = DataDirListing::default();
    for file_name in store::list_file_names(dir)? {
        match ArtifactName::parse(variable, &file_name)? {
            ArtifactName::StationSeries(name) => {
                if name.resolution != resolution {
                    return Err(TrendsError::parse(
                        &file_name,
                        format!("{} series file for a {} variable", name.resolution, resolution),
                    ));
                }
                if let Some(existing) = listing.series.get(&name.station_id) {
                    return Err(TrendsError::parse(
                        &file_name,
                        format!("duplicate series for {}, also in {}", name.station_id, existing.display()),
                    ));
                }
                listing.series.insert(name.station_id, dir.join(&file_name));
            }
            ArtifactName::TrendSeries(name) => {
                let expected_kind = matches!(
                    (&name.sub_key, resolution),
                    (SubKey::Season(_), Resolution::Monthly) | (SubKey::Percentile(_), Resolution::Daily)
                );
                if !expected_kind {
                    return Err(TrendsError::parse(
                        &file_name,
                        format!("{} sub-key in a trend series file for a {} variable", name.sub_key, resolution),
                    ));
                }
                listing.trend_series.push(name);
            }
        }
    }
    Ok(listing)
}

/// Runs the full consistency check for `variable` in the data repository
/// `repo`, using the periods and sub-keys of `config`.
pub fn check_consistency(repo: &Path, variable: &str, config: &TrendsConfig) -> Result<ConsistencyReport, TrendsError> {
    config.validate()?;
    let resolution = variables::find_variable(variable)
        .map(|v| v.resolution)
        .ok_or_else(|| TrendsError::InvalidConfiguration(format!("variable '{}' is not registered", variable)))?;
    let sub_keys = config.sub_keys(resolution);

    let sitemeta = tables::read_sitemeta(&store::sitemeta_path(repo, variable))?;
    let meta_ids = tables::sitemeta_station_ids(&sitemeta);

    let mut report = ConsistencyReport::new(variable, resolution);
    report.sitemeta_stations = meta_ids.len();

    let mut listings = BTreeMap::new();
    for tree in OutputTree::ALL {
        let listing = scan_data_dir(&store::data_dir(repo, tree, variable), variable, resolution)?;
        let rows = tables::read_trend_table(&store::trend_table_path(repo, tree, variable))?;
        let mut with_rows: BTreeSet<String> = BTreeSet::new();

        for period in &config.periods {
            let label = period.label();
            for sub_key in &sub_keys {
                let table_ids = tables::trend_table_station_ids(&rows, &label, sub_key);
                with_rows.extend(table_ids.iter().cloned());

                let reconciliation = reconcile(&StationSource::ALL, |source| {
                    Ok(match source {
                        StationSource::SiteMeta => meta_ids.clone(),
                        StationSource::SeriesFiles => listing.series.keys().cloned().collect(),
                        StationSource::TrendSeriesFiles => listing
                            .trend_series
                            .iter()
                            .filter(|name| name.matches(period, sub_key))
                            .map(|name| name.station_id.clone())
                            .collect(),
                        StationSource::TrendTable => table_ids.clone(),
                    })
                })?;

                let check = CoverageCheck {
                    tree,
                    period: label.clone(),
                    sub_key: sub_key.clone(),
                    reconciliation,
                };
                log_coverage(variable, &check);
                report.coverage.push(check);
            }
        }

        for station_id in meta_ids.difference(&with_rows) {
            logging::log_classified(
                Component::Verify,
                Some(variable),
                FailureType::Unexpected,
                &format!("{} has no trend rows for any period in {}", station_id, tree),
            );
            report.escalated_stations.push(EscalatedStation {
                tree,
                station_id: station_id.clone(),
            });
        }
        listings.insert(tree, listing);
    }

    let empty = DataDirListing::default();
    let obs_series = &listings.get(&OutputTree::Obs).unwrap_or(&empty).series;
    let mod_series = &listings.get(&OutputTree::Mod).unwrap_or(&empty).series;
    for station_id in &meta_ids {
        let (Some(obs_path), Some(mod_path)) = (obs_series.get(station_id), mod_series.get(station_id)) else {
            continue;
        };
        let obs = series::read_series(obs_path, variable)?;
        let model = series::read_series(mod_path, variable)?;
        let outcome = check_missingness_parity(&obs, &model);
        report.parity_checked += 1;

        if outcome.is_violation() {
            let violation = ParityViolation {
                station_id: station_id.clone(),
                aligned: outcome.aligned,
                mismatched: outcome.mismatched.len(),
                obs_missing: outcome.obs_missing,
                mod_missing: outcome.mod_missing,
                first_mismatch: outcome.mismatched.first().copied(),
            };
            log_finding(
                variable,
                &Finding::MissingnessParityViolation {
                    station_id: station_id.clone(),
                    mismatched: violation.mismatched,
                    obs_missing: violation.obs_missing,
                    mod_missing: violation.mod_missing,
                },
            );
            report.parity_violations.push(violation);
        }
    }

    report.finalize();
    logging::log_check_summary(
        variable,
        report.summary.coverage_mismatches,
        report.summary.parity_violations,
        report.summary.escalated,
    );
    Ok(report)
}

fn log_coverage(variable: &str, check: &CoverageCheck) {
    for d in &check.reconciliation.discrepancies {
        log_finding(
            variable,
            &Finding::CoverageMismatch {
                tree: check.tree,
                period: check.period.clone(),
                sub_key: check.sub_key.clone(),
                station_id: d.station_id.clone(),
                present_in: d.present_in.clone(),
                missing_from: d.missing_from.clone(),
            },
        );
    }
}

fn log_finding(variable: &str, finding: &Finding) {
    let message = match finding {
        Finding::CoverageMismatch {
            tree,
            period,
            sub_key,
            station_id,
            missing_from,
            ..
        } => {
            let missing: Vec<String> = missing_from.iter().map(|s| s.to_string()).collect();
            format!(
                "{} {} {}: {} missing from {}",
                tree,
                period,
                sub_key,
                station_id,
                missing.join(", ")
            )
        }
        Finding::MissingnessParityViolation {
            station_id,
            mismatched,
            obs_missing,
            mod_missing,
        } => format!(
            "{}: missingness differs at {} timestamp(s) (obs missing {}, model missing {})",
            station_id, mismatched, obs_missing, mod_missing
        ),
    };
    logging::log_classified(Component::Verify, Some(variable), finding.failure_type(), &message);
}

/// Checks every active variable that has any artifact in the repository.
///
/// Variables with no sitemeta, trend table or data directory in either tree
/// have not been computed and are skipped. A partially written variable is
/// checked, so its missing files surface as `MissingFile`.
pub fn check_repository(config: &TrendsConfig) -> Vec<(String, Result<ConsistencyReport, TrendsError>)> {
    config
        .active_variables()
        .into_iter()
        .filter(|variable| has_artifacts(&config.data_repo, variable))
        .map(|variable| {
            let result = check_consistency(&config.data_repo, &variable, config);
            (variable, result)
        })
        .collect()
}

/// Whether any sitemeta, trend table or data directory exists for `variable`.
pub fn has_artifacts(repo: &Path, variable: &str) -> bool {
    store::sitemeta_path(repo, variable).exists()
        || OutputTree::ALL.iter().any(|tree| {
            store::trend_table_path(repo, *tree, variable).exists()
                || store::data_dir(repo, *tree, variable).exists()
        })
}
