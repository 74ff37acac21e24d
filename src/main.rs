//! Consistency check over a trend data repository.
//!
//! Loads the configuration (`TRENDS_CONFIG`, default `trends.toml`), optionally
//! collects output of variables that left the active registry, verifies every active
//! variable with a sitemeta table, prints a summary and optionally writes a
//! JSON report.
//!
//! Exit status: 0 when every check is clean of defects, 1 when a parity
//! violation or escalated station was found, 2 when a check could not run.

use std::error::Error;
use std::process::ExitCode;

use station_trends::config::TrendsConfig;
use station_trends::logging::{self, Component};
use station_trends::retention;
use station_trends::verify::{self, report};

fn run() -> Result<bool, Box<dyn Error>> {
    let config = TrendsConfig::load_from_env()?;
    logging::init_logger(
        config.logging.level,
        config.logging.file.as_deref(),
        config.logging.timestamps,
    );
    logging::info(
        Component::System,
        None,
        &format!("Checking data repository {}", config.data_repo.display()),
    );

    if !config.data_repo.is_dir() {
        return Err(format!("data repository {} does not exist", config.data_repo.display()).into());
    }

    if config.collect_outdated {
        let cleared = retention::delete_outdated_repo(&config.data_repo, &config.active_set())?;
        if !cleared.is_empty() {
            logging::info(
                Component::Retention,
                None,
                &format!("Removed output of inactive variable(s): {}", cleared.join(", ")),
            );
        }
    }

    let mut reports = Vec::new();
    let mut failed = 0;
    for (variable, result) in verify::check_repository(&config) {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                logging::log_failure(Component::Verify, Some(&variable), "consistency check", &e);
                failed += 1;
            }
        }
    }

    report::print_summary(&reports);

    if let Some(path) = &config.report_file {
        report::write_report_json(path, &reports)?;
        logging::info(Component::System, None, &format!("Report written to {}", path.display()));
    }

    if failed > 0 {
        return Err(format!("{} variable(s) could not be checked", failed).into());
    }
    Ok(reports.iter().any(|r| r.has_defects()))
}

fn main() -> ExitCode {
    match run() {
        Ok(false) => ExitCode::SUCCESS,
        Ok(true) => ExitCode::from(1),
        Err(e) => {
            eprintln!("✗ {}", e);
            ExitCode::from(2)
        }
    }
}
