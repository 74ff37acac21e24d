//! Consistency report types, console summary and JSON export.

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::logging::FailureType;
use crate::model::{OutputTree, Resolution, SubKey, TrendsError};
use crate::verify::reconcile::{Reconciliation, StationSource};

// ============================================================================
// Findings
// ============================================================================

/// A non-fatal observation about the artifact trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Finding {
    /// A station is not present in every station source for one key.
    CoverageMismatch {
        tree: OutputTree,
        period: String,
        sub_key: SubKey,
        station_id: String,
        present_in: Vec<StationSource>,
        missing_from: Vec<StationSource>,
    },
    /// Observed and model series disagree about where values are missing.
    MissingnessParityViolation {
        station_id: String,
        mismatched: usize,
        obs_missing: usize,
        mod_missing: usize,
    },
}

impl Finding {
    /// Coverage gaps are routine (stations without enough data); parity
    /// violations mean the collocation or masking step misbehaved.
    pub fn failure_type(&self) -> FailureType {
        match self {
            Finding::CoverageMismatch { .. } => FailureType::Expected,
            Finding::MissingnessParityViolation { .. } => FailureType::Unexpected,
        }
    }
}

// ============================================================================
// Report
// ============================================================================

/// Station reconciliation for one tree, period and sub-key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageCheck {
    pub tree: OutputTree,
    pub period: String,
    pub sub_key: SubKey,
    pub reconciliation: Reconciliation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParityViolation {
    pub station_id: String,
    pub aligned: usize,
    pub mismatched: usize,
    pub obs_missing: usize,
    pub mod_missing: usize,
    pub first_mismatch: Option<NaiveDateTime>,
}

/// A sitemeta station with no trend row for any key of a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalatedStation {
    pub tree: OutputTree,
    pub station_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsistencySummary {
    pub coverage_checks: usize,
    pub inconsistent_checks: usize,
    pub coverage_mismatches: usize,
    pub parity_checked: usize,
    pub parity_violations: usize,
    pub escalated: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub timestamp: String,
    pub variable: String,
    pub resolution: Resolution,
    pub sitemeta_stations: usize,
    pub coverage: Vec<CoverageCheck>,
    pub parity_checked: usize,
    pub parity_violations: Vec<ParityViolation>,
    pub escalated_stations: Vec<EscalatedStation>,
    pub summary: ConsistencySummary,
}

impl ConsistencyReport {
    pub fn new(variable: &str, resolution: Resolution) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            variable: variable.to_string(),
            resolution,
            sitemeta_stations: 0,
            coverage: Vec::new(),
            parity_checked: 0,
            parity_violations: Vec::new(),
            escalated_stations: Vec::new(),
            summary: ConsistencySummary::default(),
        }
    }

    /// Total stations reported across all coverage checks.
    pub fn coverage_mismatch_count(&self) -> usize {
        self.coverage
            .iter()
            .map(|check| check.reconciliation.discrepancies.len())
            .sum()
    }

    /// Every finding, coverage mismatches first.
    pub fn findings(&self) -> Vec<Finding> {
        let coverage = self.coverage.iter().flat_map(|check| {
            check
                .reconciliation
                .discrepancies
                .iter()
                .map(move |d| Finding::CoverageMismatch {
                    tree: check.tree,
                    period: check.period.clone(),
                    sub_key: check.sub_key.clone(),
                    station_id: d.station_id.clone(),
                    present_in: d.present_in.clone(),
                    missing_from: d.missing_from.clone(),
                })
        });
        let parity = self.parity_violations.iter().map(|v| Finding::MissingnessParityViolation {
            station_id: v.station_id.clone(),
            mismatched: v.mismatched,
            obs_missing: v.obs_missing,
            mod_missing: v.mod_missing,
        });
        coverage.chain(parity).collect()
    }

    /// Parity violations or escalated stations.
    pub fn has_defects(&self) -> bool {
        !self.parity_violations.is_empty() || !self.escalated_stations.is_empty()
    }

    /// Recomputes the summary counters from the collected results.
    pub fn finalize(&mut self) {
        self.summary = ConsistencySummary {
            coverage_checks: self.coverage.len(),
            inconsistent_checks: self
                .coverage
                .iter()
                .filter(|check| !check.reconciliation.is_consistent())
                .count(),
            coverage_mismatches: self.coverage_mismatch_count(),
            parity_checked: self.parity_checked,
            parity_violations: self.parity_violations.len(),
            escalated: self.escalated_stations.len(),
        };
    }
}

// ============================================================================
// Output
// ============================================================================

pub fn print_summary(reports: &[ConsistencyReport]) {
    println!("\n═══════════════════════════════════════════════════════════");
    println!("📊 CONSISTENCY SUMMARY");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    for report in reports {
        let s = &report.summary;
        let status = if report.has_defects() {
            "✗"
        } else if s.coverage_mismatches > 0 {
            "⚠"
        } else {
            "✓"
        };
        println!(
            "{} {:<16} {:>4} stations  {:>3}/{} checks clean  {} parity violation(s)  {} escalated",
            status,
            report.variable,
            report.sitemeta_stations,
            s.coverage_checks - s.inconsistent_checks,
            s.coverage_checks,
            s.parity_violations,
            s.escalated
        );
        for escalated in &report.escalated_stations {
            println!("    ✗ {} has no trend rows in {}", escalated.station_id, escalated.tree);
        }
        for violation in &report.parity_violations {
            println!(
                "    ✗ {} missingness differs at {}/{} timestamps (obs missing {}, model missing {})",
                violation.station_id,
                violation.mismatched,
                violation.aligned,
                violation.obs_missing,
                violation.mod_missing
            );
        }
    }
    println!();

    let clean = reports
        .iter()
        .filter(|r| !r.has_defects() && r.summary.coverage_mismatches == 0)
        .count();
    println!("Fully consistent variables: {}/{}", clean, reports.len());
    println!("═══════════════════════════════════════════════════════════");
}

/// Writes all reports as one pretty-printed JSON array.
pub fn write_report_json(path: &Path, reports: &[ConsistencyReport]) -> Result<(), TrendsError> {
    let json = serde_json::to_string_pretty(reports)
        .map_err(|e| TrendsError::io(path, std::io::Error::other(e)))?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| TrendsError::io(parent, e))?;
        }
    }
    fs::write(path, json).map_err(|e| TrendsError::io(path, e))
}
