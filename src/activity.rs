//! Location activity detection.
//!
//! Sensors report continuously under normal conditions, so a location whose
//! latest timestamp has fallen behind the cutoff is presumed to have stopped
//! sending data, regardless of its server-side `active` flag. The flag
//! computed here is derived on every read and never stored.
//!
//! # Clock injection
//! All functions accept a `now: DateTime<Utc>` parameter rather than calling
//! `Utc::now()` internally. This makes the check purely deterministic in
//! tests without mocking or time manipulation.

use chrono::{DateTime, Duration, Utc};

use crate::config::Config;
use crate::model::{Location, NoiseApiError};

// ---------------------------------------------------------------------------
// Timestamp parsing
// ---------------------------------------------------------------------------

/// Parse a reported timestamp into an absolute instant.
///
/// The API emits RFC 3339 (`2024-05-01T12:00:00-04:00`, with or without
/// fractional seconds); normalized placeholder values use a space separator
/// (`1892-01-03 01:11:00-04:00`). Both forms are accepted.
pub fn parse_reported_timestamp(raw: &str) -> Result<DateTime<Utc>, NoiseApiError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z")
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| NoiseApiError::Parse(format!("invalid timestamp {:?}: {}", raw, e)))
}

// ---------------------------------------------------------------------------
// Activity check
// ---------------------------------------------------------------------------

/// The cutoff instant for "recently active": the current time shifted by the
/// deployment's fixed reporting offset, minus the activity threshold.
pub fn active_cutoff(config: &Config, now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::hours(i64::from(config.timezone_offset_hours))
        - Duration::minutes(config.activity.threshold_minutes)
}

/// Returns `true` if the reported timestamp is strictly younger than the
/// cutoff relative to `now`:
///   timestamp >  cutoff  ->  sending data
///   timestamp == cutoff  ->  not sending
///
/// Returns an error if the timestamp cannot be parsed. Callers should treat
/// parse failures as "not sending" (fail-safe default).
pub fn is_sending_data_at(
    latest_timestamp: &str,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<bool, NoiseApiError> {
    let reported = parse_reported_timestamp(latest_timestamp)?;
    Ok(reported > active_cutoff(config, now))
}

/// Convenience wrapper that uses the real current time.
/// Use `is_sending_data_at` in tests to keep them deterministic.
pub fn is_sending_data(latest_timestamp: &str, config: &Config) -> Result<bool, NoiseApiError> {
    is_sending_data_at(latest_timestamp, config, Utc::now())
}

/// Location-level convenience: the derived `is_sending_data` flag, with
/// parse failures collapsed to `false`.
pub fn location_is_sending_data(
    location: &Location,
    config: &Config,
    now: DateTime<Utc>,
) -> bool {
    is_sending_data_at(&location.latest_timestamp, config, now).unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    /// A config with a zero timezone offset so test arithmetic stays plain:
    /// cutoff = now - 60 minutes.
    fn utc_config() -> Config {
        let mut config = Config::default();
        config.timezone_offset_hours = 0;
        config
    }

    /// A fixed "now" used across all tests: 2024-05-01 13:00:00 UTC.
    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap()
    }

    // --- Sending ------------------------------------------------------------

    #[test]
    fn test_reading_5_minutes_old_is_sending() {
        let sending = is_sending_data_at("2024-05-01T12:55:00+00:00", &utc_config(), fixed_now())
            .expect("valid timestamp should not error");
        assert!(sending, "5-minute-old timestamp is within a 60-min threshold");
    }

    #[test]
    fn test_offset_timestamp_parsed_correctly() {
        // 2024-05-01T08:30:00-04:00 == 2024-05-01T12:30:00Z, 30 minutes old.
        let sending = is_sending_data_at("2024-05-01T08:30:00-04:00", &utc_config(), fixed_now())
            .expect("offset timestamp should parse");
        assert!(sending);
    }

    #[test]
    fn test_fractional_seconds_accepted() {
        let sending =
            is_sending_data_at("2024-05-01T12:55:00.000+00:00", &utc_config(), fixed_now())
                .expect("fractional-second timestamp should parse");
        assert!(sending);
    }

    // --- Not sending --------------------------------------------------------

    #[test]
    fn test_timestamp_exactly_at_cutoff_is_not_sending() {
        // Age == threshold must NOT count as sending (strictly greater than).
        let sending = is_sending_data_at("2024-05-01T12:00:00+00:00", &utc_config(), fixed_now())
            .expect("valid timestamp should not error");
        assert!(
            !sending,
            "timestamp exactly at the 60-min cutoff is not sending; the check is strict"
        );
    }

    #[test]
    fn test_timestamp_one_second_inside_cutoff_is_sending() {
        let sending = is_sending_data_at("2024-05-01T12:00:01+00:00", &utc_config(), fixed_now())
            .expect("valid timestamp should not error");
        assert!(sending, "one second inside the cutoff straddles the boundary");
    }

    #[test]
    fn test_timestamp_from_hours_ago_is_not_sending() {
        let sending = is_sending_data_at("2024-05-01T09:00:00+00:00", &utc_config(), fixed_now())
            .expect("valid timestamp should not error");
        assert!(!sending, "4-hour-old timestamp is past any 60-min threshold");
    }

    #[test]
    fn test_never_reported_placeholder_is_not_sending() {
        // The directory normalizes never-reporting sentinels to this value.
        let sending =
            is_sending_data_at("1892-01-03 01:11:00-04:00", &utc_config(), fixed_now())
                .expect("placeholder timestamp should parse");
        assert!(!sending);
    }

    // --- Timezone offset ----------------------------------------------------

    #[test]
    fn test_negative_offset_shifts_cutoff_back() {
        // With a -4h offset the cutoff is now - 4h - 60min, so a 3-hour-old
        // timestamp still counts as sending.
        let mut config = utc_config();
        config.timezone_offset_hours = -4;
        let sending = is_sending_data_at("2024-05-01T10:00:00+00:00", &config, fixed_now())
            .expect("valid timestamp should not error");
        assert!(sending);

        // A 6-hour-old one does not.
        let sending = is_sending_data_at("2024-05-01T07:00:00+00:00", &config, fixed_now())
            .expect("valid timestamp should not error");
        assert!(!sending);
    }

    // --- Threshold variation ------------------------------------------------

    #[test]
    fn test_same_timestamp_sending_under_loose_threshold_not_under_tight() {
        // Timestamp is 30 minutes old.
        let mut tight = utc_config();
        tight.activity.threshold_minutes = 20;
        let mut loose = utc_config();
        loose.activity.threshold_minutes = 60;

        let raw = "2024-05-01T12:30:00+00:00";
        assert!(!is_sending_data_at(raw, &tight, fixed_now()).unwrap());
        assert!(is_sending_data_at(raw, &loose, fixed_now()).unwrap());
    }

    // --- Error handling -----------------------------------------------------

    #[test]
    fn test_invalid_timestamp_returns_error() {
        let result = is_sending_data_at("not-a-timestamp", &utc_config(), fixed_now());
        assert!(result.is_err(), "unparseable timestamp should return Err, got {:?}", result);
    }

    #[test]
    fn test_empty_timestamp_returns_error() {
        assert!(is_sending_data_at("", &utc_config(), fixed_now()).is_err());
    }

    #[test]
    fn test_location_helper_collapses_parse_failure_to_false() {
        use crate::model::{Location, LocationId};
        let location = Location {
            id: LocationId::parse("572250").unwrap(),
            label: "Test corner".to_string(),
            latitude: 43.67,
            longitude: -79.43,
            radius: 25.0,
            active: true,
            latest_timestamp: "garbage".to_string(),
        };
        assert!(!location_is_sending_data(&location, &utc_config(), fixed_now()));
    }
}
