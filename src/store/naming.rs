//! Artifact file name templates.
//!
//! Every artifact name is built from named fields and parsed back by
//! stripping the fixed tokens of its template, then validating what is left.
//! Station ids may themselves contain `_`, so the variable-length middle span
//! is always taken to be the station id once the fixed tokens on both sides
//! have been removed.

use crate::model::{AnalysisPeriod, Resolution, SubKey, TrendsError};

const CSV_EXT: &str = ".csv";
const YEARLY_SUFFIX: &str = "_yearly";

pub fn sitemeta_file_name(variable: &str) -> String {
    format!("sitemeta_{}.csv", variable)
}

pub fn trend_table_file_name(variable: &str) -> String {
    format!("trends_{}.csv", variable)
}

pub fn data_dir_name(variable: &str) -> String {
    format!("data_{}", variable)
}

/// Extracts `<var>` from `sitemeta_<var>.csv`. `None` for any other name.
pub fn variable_from_sitemeta_name(file_name: &str) -> Option<&str> {
    file_name
        .strip_prefix("sitemeta_")
        .and_then(|rest| rest.strip_suffix(CSV_EXT))
        .filter(|var| !var.is_empty())
}

// ---------------------------------------------------------------------------
// Per-station series
// ---------------------------------------------------------------------------

/// `data_<var>_<id>_monthly.csv` or `<var>_<id>_daily.csv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationSeriesName {
    pub variable: String,
    pub station_id: String,
    pub resolution: Resolution,
}

impl StationSeriesName {
    pub fn new(variable: &str, station_id: &str, resolution: Resolution) -> Self {
        Self {
            variable: variable.to_string(),
            station_id: station_id.to_string(),
            resolution,
        }
    }

    /// Canonical name written by the trend driver.
    pub fn file_name(&self) -> String {
        match self.resolution {
            Resolution::Monthly => format!(
                "data_{}_{}_{}.csv",
                self.variable, self.station_id, self.resolution.tag()
            ),
            Resolution::Daily => format!(
                "{}_{}_{}.csv",
                self.variable, self.station_id, self.resolution.tag()
            ),
        }
    }

    /// Every name under which this series may exist, canonical name first.
    pub fn candidate_file_names(&self) -> Vec<String> {
        let tag = self.resolution.tag();
        let with_data = format!("data_{}_{}_{}.csv", self.variable, self.station_id, tag);
        let without = format!("{}_{}_{}.csv", self.variable, self.station_id, tag);
        match self.resolution {
            Resolution::Monthly => vec![with_data, without],
            Resolution::Daily => vec![without, with_data],
        }
    }

    /// Parses a per-station series name for `variable`.
    pub fn parse(variable: &str, file_name: &str) -> Result<Self, TrendsError> {
        let stem = strip_csv(file_name)?;

        let (rest, resolution) = if let Some(rest) = stem.strip_suffix("_monthly") {
            (rest, Resolution::Monthly)
        } else if let Some(rest) = stem.strip_suffix("_daily") {
            (rest, Resolution::Daily)
        } else {
            return Err(TrendsError::parse(
                file_name,
                "expected a '_monthly.csv' or '_daily.csv' suffix",
            ));
        };

        let data_prefix = format!("data_{}_", variable);
        let plain_prefix = format!("{}_", variable);
        let station_id = rest
            .strip_prefix(&data_prefix)
            .or_else(|| rest.strip_prefix(&plain_prefix))
            .ok_or_else(|| {
                TrendsError::parse(
                    file_name,
                    format!("expected prefix '{}' or '{}'", data_prefix, plain_prefix),
                )
            })?;

        if station_id.is_empty() {
            return Err(TrendsError::parse(file_name, "empty station id"));
        }

        Ok(Self::new(variable, station_id, resolution))
    }
}

// ---------------------------------------------------------------------------
// Trend-window series
// ---------------------------------------------------------------------------

/// `<var>_<id>_<start>-<end>_<subkey>_yearly.csv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendSeriesName {
    pub variable: String,
    pub station_id: String,
    pub start: i32,
    pub end: i32,
    pub sub_key: SubKey,
}

impl TrendSeriesName {
    pub fn new(variable: &str, station_id: &str, period: &AnalysisPeriod, sub_key: SubKey) -> Self {
        Self {
            variable: variable.to_string(),
            station_id: station_id.to_string(),
            start: period.start,
            end: period.end,
            sub_key,
        }
    }

    pub fn period_label(&self) -> String {
        format!("{:04}-{:04}", self.start, self.end)
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}_{}{}{}",
            self.variable,
            self.station_id,
            self.period_label(),
            self.sub_key.token(),
            YEARLY_SUFFIX,
            CSV_EXT
        )
    }

    /// Whether this file belongs to the given period and sub-key.
    pub fn matches(&self, period: &AnalysisPeriod, sub_key: &SubKey) -> bool {
        self.start == period.start && self.end == period.end && self.sub_key == *sub_key
    }

    /// Parses a trend-window series name for `variable`.
    pub fn parse(variable: &str, file_name: &str) -> Result<Self, TrendsError> {
        let stem = strip_csv(file_name)?;
        let rest = stem
            .strip_suffix(YEARLY_SUFFIX)
            .ok_or_else(|| TrendsError::parse(file_name, "expected a '_yearly.csv' suffix"))?;
        let prefix = format!("{}_", variable);
        let rest = rest
            .strip_prefix(&prefix)
            .ok_or_else(|| TrendsError::parse(file_name, format!("expected prefix '{}'", prefix)))?;

        let (rest, token) = rest
            .rsplit_once('_')
            .ok_or_else(|| TrendsError::parse(file_name, "missing sub-key token"))?;
        let sub_key = SubKey::from_token(token)
            .ok_or_else(|| TrendsError::parse(file_name, format!("invalid sub-key token '{}'", token)))?;

        let (station_id, period) = rest
            .rsplit_once('_')
            .ok_or_else(|| TrendsError::parse(file_name, "missing period token"))?;
        let (start, end) = parse_period_label(period)
            .ok_or_else(|| TrendsError::parse(file_name, format!("invalid period '{}'", period)))?;

        if station_id.is_empty() {
            return Err(TrendsError::parse(file_name, "empty station id"));
        }

        Ok(Self {
            variable: variable.to_string(),
            station_id: station_id.to_string(),
            start,
            end,
            sub_key,
        })
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Any file that may appear in `data_<var>/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactName {
    StationSeries(StationSeriesName),
    TrendSeries(TrendSeriesName),
}

impl ArtifactName {
    /// Parses a data directory entry. Names that fit neither template are a
    /// `ParseError`, never skipped.
    pub fn parse(variable: &str, file_name: &str) -> Result<Self, TrendsError> {
        let stem = strip_csv(file_name)?;
        if stem.ends_with(YEARLY_SUFFIX) {
            TrendSeriesName::parse(variable, file_name).map(ArtifactName::TrendSeries)
        } else {
            StationSeriesName::parse(variable, file_name).map(ArtifactName::StationSeries)
        }
    }

    pub fn station_id(&self) -> &str {
        match self {
            ArtifactName::StationSeries(name) => &name.station_id,
            ArtifactName::TrendSeries(name) => &name.station_id,
        }
    }
}

fn strip_csv(file_name: &str) -> Result<&str, TrendsError> {
    file_name
        .strip_suffix(CSV_EXT)
        .ok_or_else(|| TrendsError::parse(file_name, "expected a '.csv' extension"))
}

/// Parses `YYYY-YYYY` with exactly four digits per year and start <= end.
fn parse_period_label(label: &str) -> Option<(i32, i32)> {
    let (start, end) = label.split_once('-')?;
    let year = |s: &str| -> Option<i32> {
        if s.len() == 4 && s.chars().all(|c| c.is_ascii_digit()) {
            s.parse().ok()
        } else {
            None
        }
    };
    let (start, end) = (year(start)?, year(end)?);
    (start <= end).then_some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period() -> AnalysisPeriod {
        AnalysisPeriod::new(2000, 2019, 14)
    }

    #[test]
    fn test_table_names() {
        assert_eq!(sitemeta_file_name("pr"), "sitemeta_pr.csv");
        assert_eq!(trend_table_file_name("concno2"), "trends_concno2.csv");
        assert_eq!(data_dir_name("vmro3max"), "data_vmro3max");
    }

    #[test]
    fn test_variable_from_sitemeta_name() {
        assert_eq!(variable_from_sitemeta_name("sitemeta_pr.csv"), Some("pr"));
        assert_eq!(variable_from_sitemeta_name("sitemeta_stale_var.csv"), Some("stale_var"));
        assert_eq!(variable_from_sitemeta_name("trends_pr.csv"), None);
        assert_eq!(variable_from_sitemeta_name("sitemeta_.csv"), None);
        assert_eq!(variable_from_sitemeta_name("sitemeta_pr.txt"), None);
    }

    #[test]
    fn test_station_series_file_names() {
        let monthly = StationSeriesName::new("pr", "NO0042", Resolution::Monthly);
        assert_eq!(monthly.file_name(), "data_pr_NO0042_monthly.csv");
        let daily = StationSeriesName::new("vmro3max", "AT0002R", Resolution::Daily);
        assert_eq!(daily.file_name(), "vmro3max_AT0002R_daily.csv");
    }

    #[test]
    fn test_station_series_parse_strips_either_prefix() {
        let name = StationSeriesName::parse("pr", "data_pr_NO0042_monthly.csv").unwrap();
        assert_eq!(name.station_id, "NO0042");
        assert_eq!(name.resolution, Resolution::Monthly);

        let name = StationSeriesName::parse("vmro3max", "vmro3max_AT0002R_daily.csv").unwrap();
        assert_eq!(name.station_id, "AT0002R");
        assert_eq!(name.resolution, Resolution::Daily);

        let name = StationSeriesName::parse("vmro3max", "data_vmro3max_AT0002R_daily.csv").unwrap();
        assert_eq!(name.station_id, "AT0002R");
    }

    #[test]
    fn test_station_ids_with_separators_survive() {
        let name = StationSeriesName::parse("concss", "data_concss_NO0002R;NO0001R_monthly.csv").unwrap();
        assert_eq!(name.station_id, "NO0002R;NO0001R");
        let name = StationSeriesName::parse("pr", "data_pr_GB_0013R_monthly.csv").unwrap();
        assert_eq!(name.station_id, "GB_0013R");
    }

    #[test]
    fn test_station_series_parse_rejects_foreign_names() {
        assert!(StationSeriesName::parse("pr", "data_concno2_NO0042_monthly.csv").is_err());
        assert!(StationSeriesName::parse("pr", "data_pr_NO0042_weekly.csv").is_err());
        assert!(StationSeriesName::parse("pr", "data_pr_NO0042_monthly.txt").is_err());
        assert!(StationSeriesName::parse("pr", "data_pr__monthly.csv").is_err());
    }

    #[test]
    fn test_trend_series_file_names() {
        let season = TrendSeriesName::new("pr", "NO0042", &period(), SubKey::Season("winter".into()));
        assert_eq!(season.file_name(), "pr_NO0042_2000-2019_winter_yearly.csv");
        let pct = TrendSeriesName::new("vmro3max", "NO0042", &period(), SubKey::Percentile(95));
        assert_eq!(pct.file_name(), "vmro3max_NO0042_2000-2019_95p_yearly.csv");
    }

    #[test]
    fn test_trend_series_parse_reads_every_field() {
        let name = TrendSeriesName::parse("vmro3max", "vmro3max_NO0002R;NO0001R_2005-2019_98p_yearly.csv").unwrap();
        assert_eq!(name.station_id, "NO0002R;NO0001R");
        assert_eq!((name.start, name.end), (2005, 2019));
        assert_eq!(name.sub_key, SubKey::Percentile(98));
        assert_eq!(name.period_label(), "2005-2019");

        let name = TrendSeriesName::parse("pr", "pr_GB_0013R_2000-2010_all_yearly.csv").unwrap();
        assert_eq!(name.station_id, "GB_0013R");
        assert!(name.matches(&AnalysisPeriod::new(2000, 2010, 7), &SubKey::Season("all".into())));
        assert!(!name.matches(&AnalysisPeriod::new(2000, 2019, 14), &SubKey::Season("all".into())));
    }

    #[test]
    fn test_trend_series_parse_does_not_depend_on_label_lengths() {
        // Season labels of different lengths used to shift fixed offsets.
        for season in ["all", "spring", "summer", "autumn", "winter"] {
            let file = format!("concso4_SE0011R_2010-2019_{}_yearly.csv", season);
            let name = TrendSeriesName::parse("concso4", &file).unwrap();
            assert_eq!(name.station_id, "SE0011R", "season '{}'", season);
        }
    }

    #[test]
    fn test_trend_series_parse_rejects_malformed_periods() {
        for bad in [
            "pr_NO0042_2000-19_all_yearly.csv",
            "pr_NO0042_2019-2000_all_yearly.csv",
            "pr_NO0042_20X0-2019_all_yearly.csv",
            "pr_NO0042_2000_2019_all_yearly.csv",
            "pr_2000-2019_all_yearly.csv",
            "pr_NO0042_2000-2019_all-year_yearly.csv",
        ] {
            let err = TrendSeriesName::parse("pr", bad).unwrap_err();
            assert!(
                matches!(err, TrendsError::ParseError { .. }),
                "'{}' should be a ParseError, got {:?}",
                bad,
                err
            );
        }
    }

    #[test]
    fn test_artifact_dispatch() {
        let station = ArtifactName::parse("pr", "data_pr_NO0042_monthly.csv").unwrap();
        assert!(matches!(station, ArtifactName::StationSeries(_)));
        assert_eq!(station.station_id(), "NO0042");

        let trend = ArtifactName::parse("pr", "pr_NO0042_2000-2019_all_yearly.csv").unwrap();
        assert!(matches!(trend, ArtifactName::TrendSeries(_)));
        assert_eq!(trend.station_id(), "NO0042");

        assert!(ArtifactName::parse("pr", "notes.txt").is_err());
        assert!(ArtifactName::parse("pr", "summary.csv").is_err());
    }
}
