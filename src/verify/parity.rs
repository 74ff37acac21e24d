//! Missingness parity between an observed series and its collocated model
//! series.
//!
//! The driver masks model values wherever the observation is missing, so a
//! timestamp that is missing on exactly one side points at a defect upstream.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::store::series::TimeSeries;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParityOutcome {
    /// Timestamps in the union of both series.
    pub aligned: usize,
    pub obs_missing: usize,
    pub mod_missing: usize,
    /// Timestamps missing on exactly one side, in order.
    pub mismatched: Vec<NaiveDateTime>,
}

impl ParityOutcome {
    pub fn is_violation(&self) -> bool {
        !self.mismatched.is_empty()
    }
}

/// Aligns both series on the union of their timestamps and compares where
/// values are missing. A timestamp absent from one series counts as missing
/// there.
pub fn check_missingness_parity(obs: &TimeSeries, model: &TimeSeries) -> ParityOutcome {
    let mut aligned: BTreeMap<NaiveDateTime, (bool, bool)> = BTreeMap::new();
    for (ts, value) in obs.points() {
        aligned.entry(*ts).or_insert((true, true)).0 = value.is_nan();
    }
    for (ts, value) in model.points() {
        aligned.entry(*ts).or_insert((true, true)).1 = value.is_nan();
    }

    let mut outcome = ParityOutcome {
        aligned: aligned.len(),
        ..ParityOutcome::default()
    };
    for (ts, (obs_gap, mod_gap)) in aligned {
        if obs_gap {
            outcome.obs_missing += 1;
        }
        if mod_gap {
            outcome.mod_missing += 1;
        }
        if obs_gap != mod_gap {
            outcome.mismatched.push(ts);
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn monthly(values: &[f64]) -> TimeSeries {
        TimeSeries::new(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    let ts = NaiveDate::from_ymd_opt(2000, i as u32 + 1, 15)
                        .unwrap()
                        .and_hms_opt(0, 0, 0)
                        .unwrap();
                    (ts, *v)
                })
                .collect(),
        )
    }

    #[test]
    fn test_matching_gaps_are_not_a_violation() {
        let outcome = check_missingness_parity(&monthly(&[1.0, f64::NAN, 3.0]), &monthly(&[1.1, f64::NAN, 2.9]));
        assert_eq!(outcome.mismatched.len(), 0);
        assert_eq!(outcome.aligned, 3);
        assert_eq!(outcome.obs_missing, 1);
        assert_eq!(outcome.mod_missing, 1);
        assert!(!outcome.is_violation());
    }

    #[test]
    fn test_model_value_where_obs_missing_is_one_violation() {
        let outcome = check_missingness_parity(&monthly(&[1.0, f64::NAN, 3.0]), &monthly(&[1.1, 2.5, 2.9]));
        assert_eq!(outcome.mismatched.len(), 1);
        assert_eq!(outcome.obs_missing, 1);
        assert_eq!(outcome.mod_missing, 0);
        assert!(outcome.is_violation());
    }

    #[test]
    fn test_timestamp_absent_from_one_side_counts_as_missing_there() {
        let outcome = check_missingness_parity(&monthly(&[1.0, 2.0, 3.0]), &monthly(&[1.1, 2.1]));
        assert_eq!(outcome.aligned, 3);
        assert_eq!(outcome.mod_missing, 1);
        assert_eq!(outcome.mismatched.len(), 1, "third month only observed");
    }

    #[test]
    fn test_both_sides_empty_is_clean() {
        let outcome = check_missingness_parity(&TimeSeries::default(), &TimeSeries::default());
        assert_eq!(outcome, ParityOutcome::default());
    }
}
