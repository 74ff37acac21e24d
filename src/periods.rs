/// Read window covering a set of analysis periods.
///
/// Periods include both end years, but the window handed to readers is
/// left-inclusive and right-exclusive. It starts one year before the earliest
/// period so the winter season of the first year (which includes the previous
/// December) is available, and stops one year after the latest period end.

use crate::model::{AnalysisPeriod, TrendsError};

/// Year bounds of the data to read: `start_year` included, `stop_year` excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadWindow {
    pub start_year: i32,
    pub stop_year: i32,
}

impl ReadWindow {
    /// Whether `year` falls inside the window.
    pub fn contains_year(&self, year: i32) -> bool {
        year >= self.start_year && year < self.stop_year
    }
}

/// Numeric read window for `periods`.
pub fn read_window(periods: &[AnalysisPeriod]) -> Result<ReadWindow, TrendsError> {
    let first = periods.iter().map(|p| p.start).min();
    let last = periods.iter().map(|p| p.end).max();
    match (first, last) {
        (Some(first), Some(last)) => Ok(ReadWindow {
            start_year: first - 1,
            stop_year: last + 1,
        }),
        _ => Err(TrendsError::InvalidConfiguration(
            "cannot derive a read window from an empty period list".to_string(),
        )),
    }
}

/// Start and stop year labels of the read window, e.g. `("1999", "2020")`.
pub fn years_to_read(periods: &[AnalysisPeriod]) -> Result<(String, String), TrendsError> {
    let window = read_window(periods)?;
    Ok((window.start_year.to_string(), window.stop_year.to_string()))
}
