//! Daily sub-period membership and client-side split averages.
//!
//! A 24-hour cycle splits into day, evening, and night at configured
//! boundary hours. For any boundaries accepted by
//! `PeriodBoundaries::validate` the three periods are disjoint and jointly
//! exhaustive: every hour 0-23 belongs to exactly one period. Night is the
//! wrap-around period, running from its start hour through midnight to the
//! day start.

use chrono::Timelike;

use crate::activity::parse_reported_timestamp;
use crate::config::PeriodBoundaries;
use crate::model::{NoiseApiError, NoiseSample, Period};

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

/// The period a local hour (0-23) falls in.
pub fn period_of_hour(hour: u32, boundaries: &PeriodBoundaries) -> Period {
    if hour >= boundaries.day_start_hour && hour < boundaries.evening_start_hour {
        Period::Day
    } else if hour >= boundaries.evening_start_hour && hour < boundaries.night_start_hour {
        Period::Evening
    } else {
        Period::Night
    }
}

pub fn hour_in_period(hour: u32, period: Period, boundaries: &PeriodBoundaries) -> bool {
    period_of_hour(hour, boundaries) == period
}

// ---------------------------------------------------------------------------
// Client-side split average
// ---------------------------------------------------------------------------

/// Average the `mean` field of the samples whose local hour falls in the
/// given period.
///
/// The local hour is evaluated in the deployment's fixed reporting offset,
/// not the sample's own timestamp offset. An empty filtered subset yields
/// `Ok(None)`, never a NaN. An unparseable sample timestamp is an error.
pub fn period_average(
    samples: &[NoiseSample],
    period: Period,
    boundaries: &PeriodBoundaries,
    offset: chrono::FixedOffset,
) -> Result<Option<f64>, NoiseApiError> {
    let mut sum = 0.0;
    let mut matched: usize = 0;

    for sample in samples {
        let local = parse_reported_timestamp(&sample.timestamp)?.with_timezone(&offset);
        if hour_in_period(local.hour(), period, boundaries) {
            sum += sample.mean;
            matched += 1;
        }
    }

    if matched == 0 {
        Ok(None)
    } else {
        Ok(Some(sum / matched as f64))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
