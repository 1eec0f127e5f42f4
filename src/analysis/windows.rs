//! Windowed noise averages.
//!
//! A window average is one scalar derived from a `life-time` granularity
//! query bounded below by `reference - window`: the server folds everything
//! in the window into a single aggregate, and the aggregate's mean becomes
//! the window's value. The per-location summary runs read-then-fan-out: one
//! prerequisite life-time fetch learns the reference timestamp, then the
//! windowed queries (last hour, last N days, day/evening/night) are issued
//! independently of each other.

use chrono::{DateTime, Duration, FixedOffset};

use crate::activity::parse_reported_timestamp;
use crate::config::Config;
use crate::ingest::CancelToken;
use crate::ingest::client::ApiClient;
use crate::ingest::noise::fetch_noise_measurements;
use crate::model::{
    Granularity, LocationId, MeasurementCollection, NoiseAggregate, NoiseApiError,
    NoiseRequestParams, Period,
};

// ---------------------------------------------------------------------------
// Summary types
// ---------------------------------------------------------------------------

/// One computed window average: the instant it is valid for and its value
/// in dB.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseSummaryPoint {
    pub timestamp: DateTime<FixedOffset>,
    pub value: f64,
}

/// The windowed summary a presentation layer renders for one location.
///
/// Sub-summaries are `None` where the window held no samples; that state is
/// distinct from a failed fetch, which surfaces as an error from
/// `summarize_location` instead.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationNoiseSummary {
    /// End of the location's lifetime aggregate; reference for every window.
    pub latest: DateTime<FixedOffset>,
    /// Whole-history average.
    pub lifetime: NoiseSummaryPoint,
    pub last_hour: Option<NoiseSummaryPoint>,
    /// Average over the configured long window (`summary.window_days`).
    pub last_window: Option<NoiseSummaryPoint>,
    pub day: Option<NoiseSummaryPoint>,
    pub evening: Option<NoiseSummaryPoint>,
    pub night: Option<NoiseSummaryPoint>,
    /// Length of the long window, in days, as configured at fetch time.
    pub window_days: i64,
}

// ---------------------------------------------------------------------------
// Aggregate reduction
// ---------------------------------------------------------------------------

/// Reduce a window query's aggregates to a summary point.
///
/// The server contract is exactly one aggregate per `life-time` query; the
/// first one is used. A missing aggregate or a zero sample count is
/// `IncompleteData`, never a NaN value. The point's timestamp is the
/// aggregate's `end`, falling back to `reference` when the server omits it.
pub fn summary_point_from_aggregates(
    aggregates: &[NoiseAggregate],
    reference: DateTime<FixedOffset>,
) -> Result<NoiseSummaryPoint, NoiseApiError> {
    let aggregate = aggregates.first().ok_or_else(|| {
        NoiseApiError::IncompleteData("window query returned no aggregate".to_string())
    })?;

    if aggregate.count == 0 {
        return Err(NoiseApiError::IncompleteData(
            "window aggregate folds zero samples".to_string(),
        ));
    }

    let timestamp = match &aggregate.end {
        Some(end) => parse_reported_timestamp(end)?.with_timezone(&reference.timezone()),
        None => reference,
    };

    Ok(NoiseSummaryPoint {
        timestamp,
        value: aggregate.mean,
    })
}

// ---------------------------------------------------------------------------
// Window queries
// ---------------------------------------------------------------------------

/// Compute the average noise over the window `[reference - hours, ...]`,
/// optionally constrained to one daily sub-period server-side.
pub fn window_average(
    client: &ApiClient,
    config: &Config,
    location_id: &LocationId,
    reference: DateTime<FixedOffset>,
    window_hours: i64,
    period: Option<Period>,
    cancel: &CancelToken,
) -> Result<NoiseSummaryPoint, NoiseApiError> {
    let params = NoiseRequestParams {
        granularity: Some(Granularity::LifeTime),
        start: Some(reference - Duration::hours(window_hours)),
        period,
        ..NoiseRequestParams::default()
    };

    let collection = fetch_noise_measurements(client, config, location_id, Some(params), cancel)?;
    match collection {
        MeasurementCollection::Aggregates(aggregates) => {
            summary_point_from_aggregates(&aggregates, reference)
        }
        MeasurementCollection::Samples(_) => Err(NoiseApiError::Parse(
            "life-time query returned timed samples".to_string(),
        )),
    }
}

/// Map "window held no samples" to `None`, pass every other error through.
fn optional(
    result: Result<NoiseSummaryPoint, NoiseApiError>,
) -> Result<Option<NoiseSummaryPoint>, NoiseApiError> {
    match result {
        Ok(point) => Ok(Some(point)),
        Err(NoiseApiError::IncompleteData(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Fetch the full windowed summary for one location.
///
/// One prerequisite life-time query establishes the reference timestamp
/// (the end of the location's history); the last-hour, long-window and
/// per-period averages all hang off that reference. Those follow-up
/// queries have no ordering dependency on each other.
pub fn summarize_location(
    client: &ApiClient,
    config: &Config,
    location_id: &LocationId,
    cancel: &CancelToken,
) -> Result<LocationNoiseSummary, NoiseApiError> {
    let lifetime_params = NoiseRequestParams {
        granularity: Some(Granularity::LifeTime),
        ..NoiseRequestParams::default()
    };
    let collection =
        fetch_noise_measurements(client, config, location_id, Some(lifetime_params), cancel)?;
    let aggregates = match collection {
        MeasurementCollection::Aggregates(aggregates) => aggregates,
        MeasurementCollection::Samples(_) => {
            return Err(NoiseApiError::Parse(
                "life-time query returned timed samples".to_string(),
            ));
        }
    };

    let lifetime_end = aggregates
        .first()
        .and_then(|a| a.end.clone())
        .ok_or_else(|| {
            NoiseApiError::IncompleteData(format!(
                "location {} has no lifetime aggregate to anchor windows on",
                location_id
            ))
        })?;
    let reference =
        parse_reported_timestamp(&lifetime_end)?.with_timezone(&config.fixed_offset());
    let lifetime = summary_point_from_aggregates(&aggregates, reference)?;

    let window_days = config.summary.window_days;
    let window_hours = window_days * 24;

    let last_hour = optional(window_average(
        client,
        config,
        location_id,
        reference,
        1,
        None,
        cancel,
    ))?;
    let last_window = optional(window_average(
        client,
        config,
        location_id,
        reference,
        window_hours,
        None,
        cancel,
    ))?;
    let day = optional(window_average(
        client,
        config,
        location_id,
        reference,
        window_hours,
        Some(Period::Day),
        cancel,
    ))?;
    let evening = optional(window_average(
        client,
        config,
        location_id,
        reference,
        window_hours,
        Some(Period::Evening),
        cancel,
    ))?;
    let night = optional(window_average(
        client,
        config,
        location_id,
        reference,
        window_hours,
        Some(Period::Night),
        cancel,
    ))?;

    Ok(LocationNoiseSummary {
        latest: reference,
        lifetime,
        last_hour,
        last_window,
        day,
        evening,
        night,
        window_days,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
