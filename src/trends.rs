/// Trend run driver: writes one variable's artifact trees from collocated
/// station series.
///
/// The statistics themselves come from a [`TrendEngine`]; this module owns the
/// output layout. A run clears the variable's previous output in both trees,
/// then rewrites per-station series, trend-window series, the sitemeta table
/// and both trend tables.

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::TrendsConfig;
use crate::logging::{self, Component};
use crate::model::{AnalysisPeriod, OutputTree, Resolution, StationMeta, SubKey, TrendRow, TrendsError};
use crate::periods::{self, ReadWindow};
use crate::retention;
use crate::store::naming::{StationSeriesName, TrendSeriesName};
use crate::store::series::{self, TimeSeries};
use crate::store::{self, tables};
use crate::variables::{self, Variable};

/// Season label used for percentile trends.
pub const ALL_SEASON: &str = "all";

// ---------------------------------------------------------------------------
// Engine contract
// ---------------------------------------------------------------------------

/// Sampling frequency of a series handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesFrequency {
    Monthly,
    Yearly,
}

/// Output of one trend computation.
///
/// Statistics are `None` when the engine found too few years in the window.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrendResult {
    pub period: String,
    pub season: String,
    /// Relative trend in %/yr.
    pub trend_pct: Option<f64>,
    pub trend_pct_err: Option<f64>,
    /// Regression value at the window start.
    pub yoffs: Option<f64>,
    pub slope: Option<f64>,
    pub slope_err: Option<f64>,
    pub num_yrs: Option<f64>,
    pub pval: Option<f64>,
    /// Yearly series the trend was fitted on, if any.
    pub data: Option<TimeSeries>,
}

pub trait TrendEngine {
    fn compute_trend(
        &self,
        series: &TimeSeries,
        frequency: SeriesFrequency,
        period: &AnalysisPeriod,
        season: &str,
    ) -> TrendResult;
}

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// Collocated data for one station.
#[derive(Debug, Clone, PartialEq)]
pub struct StationRecord {
    /// `var` and `freq` are filled in by the run.
    pub meta: StationMeta,
    pub obs: TimeSeries,
    pub model: TimeSeries,
    /// Daily variables only: yearly (obs, model) series per percentile.
    pub percentile_series: BTreeMap<u8, (TimeSeries, TimeSeries)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub variable: String,
    pub stations_written: usize,
    pub stations_skipped: Vec<String>,
    /// Rows per trend table (both tables have the same count).
    pub trend_rows: usize,
    pub trend_files: usize,
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

pub struct TrendRun<'a, E: TrendEngine> {
    config: &'a TrendsConfig,
    variable: &'static Variable,
    engine: &'a E,
}

impl<'a, E: TrendEngine> TrendRun<'a, E> {
    /// Fails with `InvalidConfiguration` before any I/O if the variable is
    /// unregistered or not active, or the configuration is unusable.
    pub fn new(config: &'a TrendsConfig, variable: &str, engine: &'a E) -> Result<Self, TrendsError> {
        config.validate()?;
        let variable = variables::find_variable(variable).ok_or_else(|| {
            TrendsError::InvalidConfiguration(format!("variable '{}' is not registered", variable))
        })?;
        if !config.is_active(variable.name) {
            return Err(TrendsError::InvalidConfiguration(format!(
                "variable '{}' is not in the active registry",
                variable.name
            )));
        }
        Ok(Self { config, variable, engine })
    }

    pub fn variable(&self) -> &'static str {
        self.variable.name
    }

    /// Replaces the variable's output in `repo` with artifacts for `stations`.
    pub fn run(&self, repo: &Path, stations: &[StationRecord]) -> Result<RunSummary, TrendsError> {
        let name = self.variable.name;
        let resolution = self.variable.resolution;
        let window = periods::read_window(&self.config.periods)?;
        logging::info(
            Component::Trends,
            Some(name),
            &format!(
                "Computing trends for {} station(s), reading {} to {}",
                stations.len(),
                window.start_year,
                window.stop_year
            ),
        );

        retention::clear_variable(repo, name)?;

        let mut summary = RunSummary {
            variable: name.to_string(),
            ..RunSummary::default()
        };
        let mut sitemeta = Vec::new();
        let mut rows: BTreeMap<OutputTree, Vec<TrendRow>> = BTreeMap::new();

        for station in stations {
            let station_id = station.meta.station_id.as_str();
            let Some((obs, model)) = slice_station(station, &window) else {
                logging::debug(
                    Component::Trends,
                    Some(name),
                    &format!("{} has no observations in the read window, skipped", station_id),
                );
                summary.stations_skipped.push(station_id.to_string());
                continue;
            };

            let file_name = StationSeriesName::new(name, station_id, resolution).file_name();
            series::write_series(&store::data_dir(repo, OutputTree::Obs, name).join(&file_name), name, &obs)?;
            series::write_series(&store::data_dir(repo, OutputTree::Mod, name).join(&file_name), name, &model)?;

            let mut meta = station.meta.clone();
            meta.var = name.to_string();
            meta.freq = resolution.tag().to_string();

            match resolution {
                Resolution::Monthly => {
                    for period in &self.config.periods {
                        for season in &self.config.seasons {
                            let sub_key = SubKey::Season(season.clone());
                            let pair = (&obs, &model);
                            self.trend_pair(repo, &meta, pair, SeriesFrequency::Monthly, period, &sub_key, &mut rows, &mut summary)?;
                        }
                    }
                }
                Resolution::Daily => {
                    for percentile in &self.config.percentiles {
                        let Some((obs_yearly, mod_yearly)) = station.percentile_series.get(percentile) else {
                            continue;
                        };
                        if obs_yearly.is_all_missing() {
                            continue;
                        }
                        let sub_key = SubKey::Percentile(*percentile);
                        for period in &self.config.periods {
                            let pair = (obs_yearly, mod_yearly);
                            self.trend_pair(repo, &meta, pair, SeriesFrequency::Yearly, period, &sub_key, &mut rows, &mut summary)?;
                        }
                    }
                }
            }

            sitemeta.push(meta);
            summary.stations_written += 1;
        }

        tables::write_sitemeta(&store::sitemeta_path(repo, name), &sitemeta)?;
        for tree in OutputTree::ALL {
            let tree_rows = rows.get(&tree).map(Vec::as_slice).unwrap_or(&[]);
            tables::write_trend_table(&store::trend_table_path(repo, tree, name), tree_rows, resolution)?;
        }
        summary.trend_rows = rows.get(&OutputTree::Obs).map_or(0, Vec::len);

        logging::info(
            Component::Trends,
            Some(name),
            &format!(
                "Wrote {} station(s), {} trend row(s), {} trend file(s); skipped {}",
                summary.stations_written,
                summary.trend_rows,
                summary.trend_files,
                summary.stations_skipped.len()
            ),
        );
        Ok(summary)
    }

    /// Computes the obs and model trend for one key and records the result in
    /// both trees.
    #[allow(clippy::too_many_arguments)]
    fn trend_pair(
        &self,
        repo: &Path,
        meta: &StationMeta,
        (obs, model): (&TimeSeries, &TimeSeries),
        frequency: SeriesFrequency,
        period: &AnalysisPeriod,
        sub_key: &SubKey,
        rows: &mut BTreeMap<OutputTree, Vec<TrendRow>>,
        summary: &mut RunSummary,
    ) -> Result<(), TrendsError> {
        let name = self.variable.name;
        let season = match sub_key {
            SubKey::Season(label) => label.as_str(),
            SubKey::Percentile(_) => ALL_SEASON,
        };
        let percentile = match sub_key {
            SubKey::Percentile(p) => Some(*p),
            SubKey::Season(_) => None,
        };

        for (tree, series) in [(OutputTree::Obs, obs), (OutputTree::Mod, model)] {
            let result = self.engine.compute_trend(series, frequency, period, season);
            rows.entry(tree).or_default().push(TrendRow {
                var: name.to_string(),
                station_id: meta.station_id.clone(),
                period: period.label(),
                season: season.to_string(),
                trend_pct: result.trend_pct,
                trend_pct_err: result.trend_pct_err,
                yoffs: result.yoffs,
                slope: result.slope,
                slope_err: result.slope_err,
                num_yrs: result.num_yrs,
                pval: result.pval,
                unit: meta.unit.clone(),
                percentile,
            });

            if let Some(data) = &result.data {
                let file_name = TrendSeriesName::new(name, &meta.station_id, period, sub_key.clone()).file_name();
                series::write_series(&store::data_dir(repo, tree, name).join(file_name), name, data)?;
                summary.trend_files += 1;
            }
        }
        Ok(())
    }
}

/// Slices both series to the read window and masks the model wherever the
/// observation is missing. `None` if nothing was observed in the window.
fn slice_station(station: &StationRecord, window: &ReadWindow) -> Option<(TimeSeries, TimeSeries)> {
    let obs = station.obs.within(window);
    if obs.is_all_missing() {
        return None;
    }
    let mut model = station.model.within(window);
    model.mask_where_missing(&obs);
    Some((obs, model))
}
