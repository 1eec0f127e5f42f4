//! Runtime configuration for the noise monitoring service.
//!
//! Loaded from a TOML file (`noisemon.toml` by default) with serde defaults
//! for every field, so a missing file or a partial file both work. The API
//! base URL can additionally be overridden through the `NOISE_API_URL`
//! environment variable (populated from `.env` via dotenv by the binary).
//!
//! The "recently active" threshold, the reporting timezone offset, and the
//! day/evening/night boundary hours are deliberately configuration rather
//! than constants: deployments in other timezones need different values.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::model::NoiseApiError;

/// Default configuration file path, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "noisemon.toml";

/// Environment variable overriding `[api] base_url`.
pub const API_URL_ENV_VAR: &str = "NOISE_API_URL";

// ---------------------------------------------------------------------------
// Configuration tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Reporting timezone of the deployment, as a whole-hour UTC offset.
    /// Query timestamps are formatted in this offset and period membership
    /// is evaluated against it. Fixed per deployment, never derived from
    /// the local clock.
    #[serde(default = "default_timezone_offset_hours")]
    pub timezone_offset_hours: i32,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub activity: ActivityConfig,

    #[serde(default)]
    pub periods: PeriodBoundaries,

    #[serde(default)]
    pub summary: SummaryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the measurement API, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Ceiling on fetched pages per measurement query. Guards against a
    /// backend that never returns an empty page.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivityConfig {
    /// A location counts as "sending data" if its latest timestamp is
    /// younger than this, relative to the offset-adjusted current time.
    #[serde(default = "default_threshold_minutes")]
    pub threshold_minutes: i64,
}

/// Start hours of the three daily sub-periods, in the reporting timezone.
///
/// Day runs [day_start, evening_start), evening [evening_start, night_start),
/// night wraps from night_start through midnight to day_start. Validation
/// requires 0 < day_start < evening_start < night_start < 24, which makes
/// the three periods a disjoint, exhaustive cover of the 24-hour cycle.
#[derive(Debug, Clone, Deserialize)]
pub struct PeriodBoundaries {
    #[serde(default = "default_day_start_hour")]
    pub day_start_hour: u32,
    #[serde(default = "default_evening_start_hour")]
    pub evening_start_hour: u32,
    #[serde(default = "default_night_start_hour")]
    pub night_start_hour: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryConfig {
    /// Length of the long summary window, in days.
    #[serde(default = "default_window_days")]
    pub window_days: i64,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_timezone_offset_hours() -> i32 {
    -4
}

fn default_base_url() -> String {
    "https://api.tracket.info/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_pages() -> u32 {
    1000
}

fn default_threshold_minutes() -> i64 {
    60
}

fn default_day_start_hour() -> u32 {
    7
}

fn default_evening_start_hour() -> u32 {
    19
}

fn default_night_start_hour() -> u32 {
    23
}

fn default_window_days() -> i64 {
    14
}

impl Default for Config {
    fn default() -> Self {
        Config {
            timezone_offset_hours: default_timezone_offset_hours(),
            api: ApiConfig::default(),
            activity: ActivityConfig::default(),
            periods: PeriodBoundaries::default(),
            summary: SummaryConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_pages: default_max_pages(),
        }
    }
}

impl Default for ActivityConfig {
    fn default() -> Self {
        ActivityConfig {
            threshold_minutes: default_threshold_minutes(),
        }
    }
}

impl Default for PeriodBoundaries {
    fn default() -> Self {
        PeriodBoundaries {
            day_start_hour: default_day_start_hour(),
            evening_start_hour: default_evening_start_hour(),
            night_start_hour: default_night_start_hour(),
        }
    }
}

impl Default for SummaryConfig {
    fn default() -> Self {
        SummaryConfig {
            window_days: default_window_days(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, NoiseApiError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            NoiseApiError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&raw).map_err(|e| {
            NoiseApiError::Config(format!("cannot parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    /// Either way the `NOISE_API_URL` override is applied afterwards.
    pub fn load_or_default(path: &Path) -> Result<Config, NoiseApiError> {
        let mut config = if path.exists() {
            Config::load(path)?
        } else {
            Config::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Apply environment overrides. Call `dotenv::dotenv().ok()` first if a
    /// `.env` file should be honored.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV_VAR) {
            if !url.is_empty() {
                self.api.base_url = url;
            }
        }
    }

    pub fn validate(&self) -> Result<(), NoiseApiError> {
        if self.timezone_offset_hours < -12 || self.timezone_offset_hours > 14 {
            return Err(NoiseApiError::Config(format!(
                "timezone_offset_hours out of range: {}",
                self.timezone_offset_hours
            )));
        }
        if self.api.base_url.is_empty() {
            return Err(NoiseApiError::Config("api.base_url is empty".to_string()));
        }
        if self.api.max_pages == 0 {
            return Err(NoiseApiError::Config(
                "api.max_pages must be at least 1".to_string(),
            ));
        }
        if self.activity.threshold_minutes <= 0 {
            return Err(NoiseApiError::Config(
                "activity.threshold_minutes must be positive".to_string(),
            ));
        }
        if self.summary.window_days <= 0 {
            return Err(NoiseApiError::Config(
                "summary.window_days must be positive".to_string(),
            ));
        }
        self.periods.validate()
    }

    /// The deployment's reporting timezone as a chrono offset.
    pub fn fixed_offset(&self) -> chrono::FixedOffset {
        // Range-checked in validate(); the expect can only fire on a Config
        // constructed by hand with an out-of-range offset.
        chrono::FixedOffset::east_opt(self.timezone_offset_hours * 3600)
            .expect("timezone_offset_hours out of range")
    }
}

impl PeriodBoundaries {
    pub fn validate(&self) -> Result<(), NoiseApiError> {
        let ordered = 0 < self.day_start_hour
            && self.day_start_hour < self.evening_start_hour
            && self.evening_start_hour < self.night_start_hour
            && self.night_start_hour < 24;
        if !ordered {
            return Err(NoiseApiError::Config(format!(
                "period boundaries must satisfy 0 < day ({}) < evening ({}) < night ({}) < 24",
                self.day_start_hour, self.evening_start_hour, self.night_start_hour
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().expect("defaults should validate");
        assert_eq!(config.timezone_offset_hours, -4);
        assert_eq!(config.activity.threshold_minutes, 60);
        assert_eq!(config.periods.day_start_hour, 7);
        assert_eq!(config.periods.evening_start_hour, 19);
        assert_eq!(config.periods.night_start_hour, 23);
        assert_eq!(config.summary.window_days, 14);
    }

    #[test]
    fn test_partial_toml_fills_remaining_defaults() {
        let config: Config = toml::from_str(
            r#"
            timezone_offset_hours = -5

            [api]
            base_url = "http://localhost:8080/v1"
            "#,
        )
        .unwrap();
        assert_eq!(config.timezone_offset_hours, -5);
        assert_eq!(config.api.base_url, "http://localhost:8080/v1");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.api.max_pages, 1000);
        assert_eq!(config.periods.day_start_hour, 7);
    }

    #[test]
    fn test_unordered_period_boundaries_are_rejected() {
        let boundaries = PeriodBoundaries {
            day_start_hour: 7,
            evening_start_hour: 23,
            night_start_hour: 19,
        };
        assert!(boundaries.validate().is_err());
    }

    #[test]
    fn test_midnight_day_start_is_rejected() {
        // day_start == 0 would merge night into day; the wrap-around
        // partition needs a strictly positive day start.
        let boundaries = PeriodBoundaries {
            day_start_hour: 0,
            evening_start_hour: 19,
            night_start_hour: 23,
        };
        assert!(boundaries.validate().is_err());
    }

    #[test]
    fn test_zero_page_ceiling_is_rejected() {
        let mut config = Config::default();
        config.api.max_pages = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fixed_offset_matches_configured_hours() {
        let config = Config::default();
        assert_eq!(config.fixed_offset().local_minus_utc(), -4 * 3600);
    }
}
