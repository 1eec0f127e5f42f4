//! Structured logging for the noise monitoring service.
//!
//! Provides context-rich logging with location identifiers, timestamps, and
//! severity levels. Supports both console output and file-based logging for
//! unattended polling runs.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

use crate::model::NoiseApiError;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
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
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - a sensor with no data yet, or a lookup for a
    /// location that does not exist
    Expected,
    /// Unexpected failure - indicates API degradation or a contract change
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

/// Classify an API failure for log severity routing.
pub fn classify_api_failure(err: &NoiseApiError) -> FailureType {
    match err {
        // Domain conditions: the request worked, the data just is not there.
        NoiseApiError::LocationNotFound(_) | NoiseApiError::IncompleteData(_) => {
            FailureType::Expected
        }
        // Transport, HTTP and parse failures point at the service or at an
        // API contract change.
        NoiseApiError::Transport(_) | NoiseApiError::Http(_) | NoiseApiError::Parse(_) => {
            FailureType::Unexpected
        }
        NoiseApiError::PageLimitExceeded { .. } => FailureType::Unexpected,
        NoiseApiError::Cancelled => FailureType::Expected,
        NoiseApiError::Config(_) => FailureType::Unexpected,
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>) {
        let logger = Logger {
            min_level,
            log_file,
        };

        *LOGGER.lock().unwrap() = Some(logger);
    }

    /// Log a message with the global logger
    fn log(&self, level: LogLevel, location_id: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let location_part = location_id.map(|s| format!(" [{}]", s)).unwrap_or_default();
        let log_entry = format!("{} {}{}: {}", timestamp, level, location_part, message);

        match level {
            LogLevel::Error | LogLevel::Warning => eprintln!("{}", log_entry),
            LogLevel::Info | LogLevel::Debug => println!("{}", log_entry),
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
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>) {
    Logger::init(min_level, log_file.map(String::from));
}

/// Log a general informational message
pub fn info(location_id: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Info, location_id, message);
    }
}

/// Log a warning message
pub fn warn(location_id: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Warning, location_id, message);
    }
}

/// Log an error message
pub fn error(location_id: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Error, location_id, message);
    }
}

/// Log a debug message
pub fn debug(location_id: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Debug, location_id, message);
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log an API failure with automatic classification.
///
/// Severity follows the classification: expected failures are debug noise,
/// unexpected ones are errors, unknown ones are warnings. The error itself
/// is still returned to the caller by the fetch path; this only records it.
pub fn log_api_failure(location_id: Option<&str>, operation: &str, err: &NoiseApiError) {
    let failure_type = classify_api_failure(err);
    let message = format!("{} failed [{}]: {}", operation, failure_type, err);

    match failure_type {
        FailureType::Expected => debug(location_id, &message),
        FailureType::Unexpected => error(location_id, &message),
        FailureType::Unknown => warn(location_id, &message),
    }
}
