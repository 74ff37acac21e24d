/// Structured logging for the trend output store
///
/// Provides context-rich logging with component and variable identifiers,
/// timestamps, and severity levels. Supports both console output and
/// file-based logging for batch runs.

use chrono::Utc;
use serde::Deserialize;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::{Mutex, MutexGuard};

use crate::model::TrendsError;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    #[serde(alias = "warn")]
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Config,
    Retention,
    Store,
    Verify,
    Trends,
    System,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Config => write!(f, "CONFIG"),
            Component::Retention => write!(f, "RETAIN"),
            Component::Store => write!(f, "STORE"),
            Component::Verify => write!(f, "VERIFY"),
            Component::Trends => write!(f, "TRENDS"),
            Component::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Expected - e.g. a station lacking data for one period
    Expected,
    /// Unexpected - indicates a defect upstream or a broken store
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

fn global_logger() -> MutexGuard<'static, Option<Logger>> {
    LOGGER.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        *global_logger() = Some(logger);
    }

    fn format_entry(level: LogLevel, component: Component, variable: Option<&str>, message: &str) -> String {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let var_part = variable.map(|v| format!(" [{}]", v)).unwrap_or_default();
        format!("{} {} {}{}: {}", timestamp, level, component, var_part, message)
    }

    fn log(&self, level: LogLevel, component: Component, variable: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let log_entry = Self::format_entry(level, component, variable, message);
        let var_part = variable.map(|v| format!(" [{}]", v)).unwrap_or_default();

        // Console output
        if self.console_timestamps {
            match level {
                LogLevel::Error | LogLevel::Warning => eprintln!("{}", log_entry),
                LogLevel::Info | LogLevel::Debug => println!("{}", log_entry),
            }
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", component, var_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", component, var_part, message),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => println!("   [DEBUG] {}{}: {}", component, var_part, message),
            }
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

/// Log a general informational message
pub fn info(component: Component, variable: Option<&str>, message: &str) {
    if let Some(logger) = global_logger().as_ref() {
        logger.log(LogLevel::Info, component, variable, message);
    }
}

/// Log a warning message
pub fn warn(component: Component, variable: Option<&str>, message: &str) {
    if let Some(logger) = global_logger().as_ref() {
        logger.log(LogLevel::Warning, component, variable, message);
    }
}

/// Log an error message
pub fn error(component: Component, variable: Option<&str>, message: &str) {
    if let Some(logger) = global_logger().as_ref() {
        logger.log(LogLevel::Error, component, variable, message);
    }
}

/// Log a debug message
pub fn debug(component: Component, variable: Option<&str>, message: &str) {
    if let Some(logger) = global_logger().as_ref() {
        logger.log(LogLevel::Debug, component, variable, message);
    }
}

/// Log at the level implied by a failure classification.
pub fn log_classified(component: Component, variable: Option<&str>, failure_type: FailureType, message: &str) {
    let message = format!("[{}] {}", failure_type, message);
    match failure_type {
        FailureType::Expected => debug(component, variable, &message),
        FailureType::Unexpected => error(component, variable, &message),
        FailureType::Unknown => warn(component, variable, &message),
    }
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a store error.
///
/// A missing file may just mean the driver has not run for that variable yet;
/// everything else points at a broken tree or configuration.
pub fn classify_error(err: &TrendsError) -> FailureType {
    match err {
        TrendsError::MissingFile(_) => FailureType::Unknown,
        TrendsError::InvalidConfiguration(_)
        | TrendsError::ParseError { .. }
        | TrendsError::MalformedTable { .. }
        | TrendsError::Config { .. } => FailureType::Unexpected,
        TrendsError::IoFailure { source, .. } => match source.kind() {
            std::io::ErrorKind::NotFound => FailureType::Unknown,
            _ => FailureType::Unexpected,
        },
    }
}

/// Log a failed operation with automatic classification
pub fn log_failure(component: Component, variable: Option<&str>, operation: &str, err: &TrendsError) {
    let message = format!("{} failed: {}", operation, err);
    log_classified(component, variable, classify_error(err), &message);
}

// ---------------------------------------------------------------------------
// Summary Logging
// ---------------------------------------------------------------------------

/// Log the outcome of one variable's consistency check.
pub fn log_check_summary(variable: &str, coverage_mismatches: usize, parity_violations: usize, escalated: usize) {
    let message = format!(
        "Consistency check complete: {} coverage mismatch(es), {} parity violation(s), {} escalated station(s)",
        coverage_mismatches, parity_violations, escalated
    );

    if parity_violations > 0 || escalated > 0 {
        error(Component::Verify, Some(variable), &message);
    } else if coverage_mismatches > 0 {
        warn(Component::Verify, Some(variable), &message);
    } else {
        info(Component::Verify, Some(variable), &message);
    }
}
