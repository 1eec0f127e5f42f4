//! Core data types for the noise monitoring service.
//!
//! This module defines the shared domain model imported by all other modules:
//! locations, the two measurement shapes, request parameters, and the error
//! taxonomy. It performs no I/O.

use std::fmt;

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Location identifiers
// ---------------------------------------------------------------------------

/// Opaque identifier of a sensor location.
///
/// The upstream API has emitted both numeric and string ids across versions,
/// so the token is kept as a string end-to-end. Preserves leading zeros and
/// non-numeric ids. Validated once, at the system boundary, via
/// [`LocationId::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationId(String);

impl LocationId {
    /// Validate a raw token and wrap it.
    ///
    /// Accepts non-empty ASCII alphanumeric tokens, with `-` and `_` allowed.
    /// Anything else (including path separators) is rejected so an id can be
    /// spliced into an endpoint path without escaping.
    pub fn parse(raw: &str) -> Result<Self, NoiseApiError> {
        if raw.is_empty() {
            return Err(NoiseApiError::Parse("empty location id".to_string()));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(NoiseApiError::Parse(format!(
                "invalid location id token: {:?}",
                raw
            )));
        }
        Ok(LocationId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

/// A fixed sensor location as reported by the `/locations` directory.
///
/// Records are passed through a fixed-field projection on ingest: fields the
/// server adds beyond these are dropped. `latest_timestamp` stays in its
/// ISO 8601 wire form and is parsed where consumed (see `activity`).
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub id: LocationId,
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Coverage radius around the sensor, in meters.
    pub radius: f64,
    /// Server-reported active flag.
    pub active: bool,
    /// Timestamp of the most recent measurement, ISO 8601.
    pub latest_timestamp: String,
}

// ---------------------------------------------------------------------------
// Measurements
// ---------------------------------------------------------------------------

/// One point-in-time noise reading, in dB.
///
/// Returned for `raw` and `hourly` granularity queries.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NoiseSample {
    /// ISO 8601, e.g. "2024-05-01T12:00:00-04:00".
    pub timestamp: String,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// One noise summary over a time interval, in dB.
///
/// Returned for `life-time` granularity queries. `count` is the number of
/// underlying raw samples folded into the interval; a `count` of zero means
/// the interval had no data and the min/max/mean fields are meaningless.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NoiseAggregate {
    pub start: Option<String>,
    pub end: Option<String>,
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// An ordered sequence of measurements of a single shape.
///
/// The shape is selected once from the request granularity and never
/// reinterpreted downstream. Order is server-defined (chronological
/// ascending) and preserved across page concatenation; nothing here
/// re-sorts.
#[derive(Debug, Clone, PartialEq)]
pub enum MeasurementCollection {
    Samples(Vec<NoiseSample>),
    Aggregates(Vec<NoiseAggregate>),
}

impl MeasurementCollection {
    pub fn len(&self) -> usize {
        match self {
            MeasurementCollection::Samples(v) => v.len(),
            MeasurementCollection::Aggregates(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The timed samples, if this collection holds the sample shape.
    pub fn samples(&self) -> Option<&[NoiseSample]> {
        match self {
            MeasurementCollection::Samples(v) => Some(v),
            MeasurementCollection::Aggregates(_) => None,
        }
    }

    /// The interval aggregates, if this collection holds the aggregate shape.
    pub fn aggregates(&self) -> Option<&[NoiseAggregate]> {
        match self {
            MeasurementCollection::Samples(_) => None,
            MeasurementCollection::Aggregates(v) => Some(v),
        }
    }
}

// ---------------------------------------------------------------------------
// Request parameters
// ---------------------------------------------------------------------------

/// Server-side aggregation level of returned measurements.
///
/// `Raw` is the server default when the parameter is omitted. `LifeTime`
/// returns exactly one aggregate spanning the location's entire history and
/// never paginates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Raw,
    Hourly,
    LifeTime,
}

impl Granularity {
    /// Wire value of the `granularity` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Raw => "raw",
            Granularity::Hourly => "hourly",
            Granularity::LifeTime => "life-time",
        }
    }
}

/// One of the three fixed daily sub-windows used to split a longer window's
/// average. Boundary hours are configuration (see `config::PeriodBoundaries`);
/// the three periods are disjoint and jointly exhaustive over 24 hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    Evening,
    Night,
}

impl Period {
    /// Wire value of the `hours` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Day => "day",
            Period::Evening => "evening",
            Period::Night => "night",
        }
    }

    pub const ALL: [Period; 3] = [Period::Day, Period::Evening, Period::Night];
}

/// Parameters of a noise measurement query.
///
/// Absent fields are omitted from the request entirely, never sent as empty
/// strings. `start`/`end` are formatted in the deployment's fixed reporting
/// timezone on serialization (see `ingest::noise::build_query`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoiseRequestParams {
    pub granularity: Option<Granularity>,
    pub start: Option<chrono::DateTime<chrono::FixedOffset>>,
    pub end: Option<chrono::DateTime<chrono::FixedOffset>>,
    /// Zero-based page index. Setting this explicitly disables pagination.
    pub page: Option<u32>,
    /// Constrain the query to one daily sub-period, server-side.
    pub period: Option<Period>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching or aggregating noise data.
///
/// Transport and parse failures are surfaced to callers rather than
/// swallowed, so an empty page and a failed request stay distinguishable.
#[derive(Debug, Clone, PartialEq)]
pub enum NoiseApiError {
    /// Network-level failure (DNS, connect, timeout).
    Transport(String),
    /// Non-2xx HTTP response from the API.
    Http(u16),
    /// The response body could not be deserialized, or a value in it
    /// (timestamp, id token) was malformed.
    Parse(String),
    /// A lookup by id returned zero locations. A domain condition, not a
    /// transport failure.
    LocationNotFound(String),
    /// An aggregation was requested over a window with zero underlying
    /// samples. Callers wanting "no value" instead of an error can map this
    /// variant away.
    IncompleteData(String),
    /// The pagination loop hit the configured page ceiling without the
    /// server ever returning an empty page.
    PageLimitExceeded { fetched: u32, limit: u32 },
    /// The caller's cancellation token was set mid-fetch.
    Cancelled,
    /// Invalid or unreadable runtime configuration.
    Config(String),
}

impl fmt::Display for NoiseApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoiseApiError::Transport(msg) => write!(f, "Transport error: {}", msg),
            NoiseApiError::Http(code) => write!(f, "HTTP error: {}", code),
            NoiseApiError::Parse(msg) => write!(f, "Parse error: {}", msg),
            NoiseApiError::LocationNotFound(id) => write!(f, "Location not found: {}", id),
            NoiseApiError::IncompleteData(msg) => write!(f, "Incomplete data: {}", msg),
            NoiseApiError::PageLimitExceeded { fetched, limit } => write!(
                f,
                "Pagination did not terminate after {} pages (ceiling {})",
                fetched, limit
            ),
            NoiseApiError::Cancelled => write!(f, "Fetch cancelled by caller"),
            NoiseApiError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for NoiseApiError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
