/// Run configuration for the trend driver, retention manager and verifier.
///
/// Loaded from a TOML file (`trends.toml` by default, overridable through the
/// `TRENDS_CONFIG` environment variable). `.env` files are honoured, and
/// `TRENDS_DATA_REPO` overrides the data repository path. Every field has a
/// default, so an absent file yields the standard analysis setup.
///
/// ```toml
/// data_repo = "/data/trends"
/// variables = ["pr", "concno2", "vmro3max"]
/// seasons = ["all", "summer"]
/// report_file = "consistency_report.json"
/// collect_outdated = true
///
/// [[periods]]
/// start = 2000
/// end = 2019
/// min_years = 14
///
/// [logging]
/// level = "info"
/// ```

use serde::Deserialize;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::{self, Component, LogLevel};
use crate::model::{AnalysisPeriod, Resolution, SubKey, TrendsError};
use crate::variables;

pub const CONFIG_PATH_VAR: &str = "TRENDS_CONFIG";
pub const DATA_REPO_VAR: &str = "TRENDS_DATA_REPO";
pub const DEFAULT_CONFIG_FILE: &str = "trends.toml";

/// The four standard trend windows.
pub const DEFAULT_PERIODS: [AnalysisPeriod; 4] = [
    AnalysisPeriod::new(2000, 2019, 14),
    AnalysisPeriod::new(2000, 2010, 7),
    AnalysisPeriod::new(2010, 2019, 7),
    AnalysisPeriod::new(2005, 2019, 10),
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file: None,
            timestamps: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrendsConfig {
    /// Directory holding `obs_output/` and `mod_output/`.
    pub data_repo: PathBuf,
    /// Active variable registry. Empty means every registered variable.
    pub variables: Vec<String>,
    pub periods: Vec<AnalysisPeriod>,
    /// Sub-keys of monthly variables.
    pub seasons: Vec<String>,
    /// Sub-keys of daily variables.
    pub percentiles: Vec<u8>,
    /// Where the binary writes the JSON consistency report, if anywhere.
    pub report_file: Option<PathBuf>,
    /// Remove output of variables outside the active registry before checking.
    pub collect_outdated: bool,
    pub logging: LoggingConfig,
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            data_repo: PathBuf::from("."),
            variables: Vec::new(),
            periods: DEFAULT_PERIODS.to_vec(),
            seasons: variables::DEFAULT_SEASONS.iter().map(|s| s.to_string()).collect(),
            percentiles: variables::DEFAULT_PERCENTILES.to_vec(),
            report_file: None,
            collect_outdated: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl TrendsConfig {
    /// Parses and validates a TOML document. `origin` only labels errors.
    pub fn from_toml_str(raw: &str, origin: &Path) -> Result<Self, TrendsError> {
        let config: TrendsConfig = toml::from_str(raw).map_err(|source| TrendsError::Config {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, TrendsError> {
        if !path.exists() {
            logging::debug(
                Component::Config,
                None,
                &format!("{} not found, using defaults", path.display()),
            );
            let config = TrendsConfig::default();
            config.validate()?;
            return Ok(config);
        }
        let raw = fs::read_to_string(path).map_err(|e| TrendsError::io(path, e))?;
        Self::from_toml_str(&raw, path)
    }

    /// Loads the file named by `TRENDS_CONFIG` (after reading `.env`) and
    /// applies the `TRENDS_DATA_REPO` override.
    pub fn load_from_env() -> Result<Self, TrendsError> {
        dotenv::dotenv().ok();
        let path = env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let mut config = Self::load(Path::new(&path))?;
        if let Ok(repo) = env::var(DATA_REPO_VAR) {
            config.data_repo = PathBuf::from(repo);
        }
        Ok(config)
    }

    /// Rejects configurations no run could use.
    pub fn validate(&self) -> Result<(), TrendsError> {
        if self.periods.is_empty() {
            return Err(TrendsError::InvalidConfiguration("period list is empty".into()));
        }
        for period in &self.periods {
            if period.start > period.end {
                return Err(TrendsError::InvalidConfiguration(format!(
                    "period {} starts after it ends",
                    period
                )));
            }
        }

        if self.seasons.is_empty() {
            return Err(TrendsError::InvalidConfiguration("season list is empty".into()));
        }
        for season in &self.seasons {
            if !matches!(SubKey::from_token(season), Some(SubKey::Season(_))) {
                return Err(TrendsError::InvalidConfiguration(format!(
                    "invalid season label '{}'",
                    season
                )));
            }
        }

        if self.percentiles.is_empty() {
            return Err(TrendsError::InvalidConfiguration("percentile list is empty".into()));
        }
        if let Some(p) = self.percentiles.iter().find(|p| **p > 100) {
            return Err(TrendsError::InvalidConfiguration(format!("percentile {} is above 100", p)));
        }

        for name in &self.variables {
            if variables::find_variable(name).is_none() {
                return Err(TrendsError::InvalidConfiguration(format!(
                    "variable '{}' is not registered",
                    name
                )));
            }
        }
        Ok(())
    }

    /// The sub-keys trends are computed for at `resolution`.
    pub fn sub_keys(&self, resolution: Resolution) -> Vec<SubKey> {
        match resolution {
            Resolution::Monthly => self.seasons.iter().cloned().map(SubKey::Season).collect(),
            Resolution::Daily => self.percentiles.iter().copied().map(SubKey::Percentile).collect(),
        }
    }

    /// The active variable names, in registry order when none are configured.
    pub fn active_variables(&self) -> Vec<String> {
        if self.variables.is_empty() {
            variables::all_variable_names().into_iter().map(String::from).collect()
        } else {
            self.variables.clone()
        }
    }

    pub fn active_set(&self) -> BTreeSet<String> {
        self.active_variables().into_iter().collect()
    }

    pub fn is_active(&self, variable: &str) -> bool {
        self.variables.is_empty() || self.variables.iter().any(|v| v == variable)
    }
}
