//! Trend run integration tests
//!
//! Run the driver with a deterministic engine and feed its output straight
//! into the consistency verifier.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use std::fs;

use station_trends::analysis::coverage;
use station_trends::config::TrendsConfig;
use station_trends::model::{AnalysisPeriod, OutputTree, Resolution, StationMeta, TrendsError};
use station_trends::store::{self, tables};
use station_trends::store::series::TimeSeries;
use station_trends::trends::{SeriesFrequency, StationRecord, TrendEngine, TrendResult, TrendRun};
use station_trends::verify::check_consistency;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// Least-squares slope over yearly means inside the period. Returns no
/// statistics when fewer than `min_years` years have data, but always returns
/// the yearly series.
struct MeanSlopeEngine;

impl TrendEngine for MeanSlopeEngine {
    fn compute_trend(
        &self,
        series: &TimeSeries,
        _frequency: SeriesFrequency,
        period: &AnalysisPeriod,
        season: &str,
    ) -> TrendResult {
        let mut sums: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
        for (ts, value) in series.points() {
            if value.is_nan() || ts.year() < period.start || ts.year() > period.end {
                continue;
            }
            let entry = sums.entry(ts.year()).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
        let yearly: Vec<(NaiveDateTime, f64)> = sums
            .iter()
            .map(|(year, (sum, n))| {
                let ts = NaiveDate::from_ymd_opt(*year, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
                (ts, sum / *n as f64)
            })
            .collect();

        let mut result = TrendResult {
            period: period.label(),
            season: season.to_string(),
            num_yrs: Some(yearly.len() as f64),
            data: Some(TimeSeries::new(yearly.clone())),
            ..TrendResult::default()
        };
        if yearly.len() >= period.min_years as usize {
            let n = yearly.len() as f64;
            let xs: Vec<f64> = sums.keys().map(|y| *y as f64).collect();
            let ys: Vec<f64> = yearly.iter().map(|(_, v)| *v).collect();
            let mx = xs.iter().sum::<f64>() / n;
            let my = ys.iter().sum::<f64>() / n;
            let sxy: f64 = xs.iter().zip(&ys).map(|(x, y)| (x - mx) * (y - my)).sum();
            let sxx: f64 = xs.iter().map(|x| (x - mx).powi(2)).sum();
            let slope = sxy / sxx;
            result.slope = Some(slope);
            result.yoffs = Some(my - slope * (mx - period.start as f64));
            result.trend_pct = Some(100.0 * slope / my);
        }
        result
    }
}

fn monthly_series(years: std::ops::RangeInclusive<i32>, f: impl Fn(i32, u32) -> f64) -> TimeSeries {
    let mut points = Vec::new();
    for year in years {
        for m in 1..=12 {
            let ts = NaiveDate::from_ymd_opt(year, m, 15).unwrap().and_hms_opt(0, 0, 0).unwrap();
            points.push((ts, f(year, m)));
        }
    }
    TimeSeries::new(points)
}

fn meta(id: &str) -> StationMeta {
    StationMeta {
        var: String::new(),
        station_id: id.into(),
        station_name: format!("Station {}", id),
        latitude: Some(58.4),
        longitude: Some(8.3),
        altitude: Some(190.0),
        unit: "mm month-1".into(),
        freq: String::new(),
        framework: "EMEP".into(),
        matrix: "precip".into(),
    }
}

fn config() -> TrendsConfig {
    TrendsConfig {
        variables: vec!["pr".into(), "vmro3max".into()],
        periods: vec![AnalysisPeriod::new(2000, 2003, 3), AnalysisPeriod::new(2002, 2003, 2)],
        seasons: vec!["all".into(), "summer".into(), "winter".into()],
        percentiles: vec![50, 95],
        ..TrendsConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_driver_output_passes_verifier_with_zero_findings() {
    let tmp = TempDir::new().unwrap();
    let config = config();
    let engine = MeanSlopeEngine;

    // NO0042 misses every March; the model must be masked there too.
    let stations = vec![
        StationRecord {
            meta: meta("NO0042"),
            obs: monthly_series(1995..=2005, |y, m| if m == 3 { f64::NAN } else { (y - 1990) as f64 + m as f64 }),
            model: monthly_series(1995..=2005, |y, m| (y - 1990) as f64 + m as f64 * 1.1),
            percentile_series: BTreeMap::new(),
        },
        StationRecord {
            meta: meta("AT0002R"),
            obs: monthly_series(1999..=2004, |_, m| 10.0 + m as f64),
            model: monthly_series(1999..=2004, |_, m| 11.0 + m as f64),
            percentile_series: BTreeMap::new(),
        },
        StationRecord {
            meta: meta("SE0011"),
            obs: monthly_series(1980..=1990, |_, _| 1.0),
            model: monthly_series(1980..=1990, |_, _| 1.0),
            percentile_series: BTreeMap::new(),
        },
    ];

    let summary = TrendRun::new(&config, "pr", &engine).unwrap().run(tmp.path(), &stations).unwrap();
    assert_eq!(summary.stations_written, 2);
    assert_eq!(summary.stations_skipped, vec!["SE0011".to_string()], "no data in the read window");
    assert_eq!(summary.trend_rows, 2 * 2 * 3);

    let report = check_consistency(tmp.path(), "pr", &config).unwrap();
    assert!(report.findings().is_empty(), "got {:?}", report.findings());
    assert!(report.escalated_stations.is_empty());
    assert_eq!(report.parity_checked, 2);
    assert_eq!(report.summary.coverage_checks, 2 * 2 * 3);
}

#[test]
fn test_driver_writes_daily_percentile_trends() {
    let tmp = TempDir::new().unwrap();
    let config = config();
    let engine = MeanSlopeEngine;

    let yearly = |offset: f64| {
        TimeSeries::new(
            (2000..=2003)
                .map(|y| {
                    let ts = NaiveDate::from_ymd_opt(y, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
                    (ts, offset + y as f64 - 2000.0)
                })
                .collect(),
        )
    };
    let mut percentile_series = BTreeMap::new();
    percentile_series.insert(50, (yearly(30.0), yearly(32.0)));
    percentile_series.insert(95, (yearly(60.0), yearly(58.0)));

    let mut station_meta = meta("NO0042");
    station_meta.unit = "ppb".into();
    let stations = vec![StationRecord {
        meta: station_meta,
        obs: monthly_series(2000..=2003, |_, m| 30.0 + m as f64),
        model: monthly_series(2000..=2003, |_, m| 31.0 + m as f64),
        percentile_series,
    }];

    let summary = TrendRun::new(&config, "vmro3max", &engine).unwrap().run(tmp.path(), &stations).unwrap();
    assert_eq!(summary.trend_rows, 2 * 2, "two percentiles times two periods");

    let rows = tables::read_trend_table(&store::trend_table_path(tmp.path(), OutputTree::Obs, "vmro3max")).unwrap();
    assert!(rows.iter().all(|r| r.season == "all" && r.unit == "ppb"));
    assert_eq!(rows.iter().filter(|r| r.percentile == Some(95)).count(), 2);

    let dir = store::data_dir(tmp.path(), OutputTree::Obs, "vmro3max");
    assert!(dir.join("vmro3max_NO0042_daily.csv").is_file());
    assert!(dir.join("vmro3max_NO0042_2000-2003_95p_yearly.csv").is_file());

    let report = check_consistency(tmp.path(), "vmro3max", &config).unwrap();
    assert!(report.findings().is_empty(), "got {:?}", report.findings());
}

#[test]
fn test_rerun_replaces_previous_output() {
    let tmp = TempDir::new().unwrap();
    let config = config();
    let engine = MeanSlopeEngine;
    let station = |id: &str| StationRecord {
        meta: meta(id),
        obs: monthly_series(2000..=2003, |_, m| m as f64),
        model: monthly_series(2000..=2003, |_, m| m as f64),
        percentile_series: BTreeMap::new(),
    };

    let run = TrendRun::new(&config, "pr", &engine).unwrap();
    run.run(tmp.path(), &[station("NO0042"), station("AT0002R")]).unwrap();
    run.run(tmp.path(), &[station("AT0002R")]).unwrap();

    let dir = store::data_dir(tmp.path(), OutputTree::Mod, "pr");
    assert!(!dir.join("data_pr_NO0042_monthly.csv").exists(), "stale station output must be cleared");
    let names: Vec<String> = fs::read_dir(&dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(names.iter().all(|n| n.contains("AT0002R")));

    let report = check_consistency(tmp.path(), "pr", &config).unwrap();
    assert_eq!(report.sitemeta_stations, 1);
    assert!(report.findings().is_empty());
}

#[test]
fn test_station_counts_over_driver_output() {
    let tmp = TempDir::new().unwrap();
    let config = config();
    let engine = MeanSlopeEngine;
    let stations = vec![
        StationRecord {
            meta: meta("NO0042"),
            obs: monthly_series(2000..=2001, |_, m| if m == 1 { f64::NAN } else { 1.0 }),
            model: monthly_series(2000..=2001, |_, _| 1.0),
            percentile_series: BTreeMap::new(),
        },
        StationRecord {
            meta: meta("AT0002R"),
            obs: monthly_series(2000..=2001, |_, _| 2.0),
            model: monthly_series(2000..=2001, |_, _| 2.0),
            percentile_series: BTreeMap::new(),
        },
    ];
    TrendRun::new(&config, "pr", &engine).unwrap().run(tmp.path(), &stations).unwrap();

    let counts = coverage::sitemeta_station_counts(tmp.path(), "pr", Resolution::Monthly).unwrap();
    let january = NaiveDate::from_ymd_opt(2000, 1, 15).unwrap().and_hms_opt(0, 0, 0).unwrap();
    let june = NaiveDate::from_ymd_opt(2000, 6, 15).unwrap().and_hms_opt(0, 0, 0).unwrap();
    assert_eq!(counts.len(), 24);
    assert_eq!(counts[&january], 1);
    assert_eq!(counts[&june], 2);
}

#[test]
fn test_inactive_variable_is_rejected_before_io() {
    let tmp = TempDir::new().unwrap();
    let marker = tmp.path().join("obs_output/trends_concno2.csv");
    fs::create_dir_all(marker.parent().unwrap()).unwrap();
    fs::write(&marker, "keep").unwrap();

    let config = config();
    let err = TrendRun::new(&config, "concno2", &MeanSlopeEngine).err().unwrap();
    assert!(matches!(err, TrendsError::InvalidConfiguration(_)));
    assert!(marker.is_file(), "nothing may be cleared for a rejected variable");
}
