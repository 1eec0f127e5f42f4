//! Location directory accessor.
//!
//! Fetches the list of known sensor locations, or a single location by
//! identifier, and normalizes each record to the fixed field set of
//! `model::Location`. Fields the server adds beyond that set are dropped.

use serde::{Deserialize, Deserializer};

use crate::ingest::client::ApiClient;
use crate::model::{Location, LocationId, NoiseApiError};

/// Placeholder written over sentinel `latestTimestamp` values. The upstream
/// reports year-0000 timestamps for devices that have never sent a
/// measurement; those do not parse as real instants, so they are rewritten
/// to a fixed date safely older than any activity cutoff.
pub const NEVER_REPORTED_PLACEHOLDER: &str = "1892-01-03 01:11:00-04:00";

// ---------------------------------------------------------------------------
// API Response Structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct LocationsResponse {
    locations: Vec<LocationRecord>,
}

/// One directory record as it appears on the wire. The `id` field has been
/// emitted both as a JSON number and as a string across API versions; both
/// are accepted and normalized to the string token.
#[derive(Debug, Deserialize)]
struct LocationRecord {
    #[serde(deserialize_with = "id_token")]
    id: String,
    label: String,
    latitude: f64,
    longitude: f64,
    radius: f64,
    active: bool,
    #[serde(rename = "latestTimestamp")]
    latest_timestamp: String,
}

fn id_token<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Numeric(u64),
        Token(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Numeric(n) => Ok(n.to_string()),
        RawId::Token(s) => Ok(s),
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

fn normalize_latest_timestamp(raw: String) -> String {
    if raw.starts_with("0000") {
        NEVER_REPORTED_PLACEHOLDER.to_string()
    } else {
        raw
    }
}

fn normalize(record: LocationRecord) -> Result<Location, NoiseApiError> {
    Ok(Location {
        id: LocationId::parse(&record.id)?,
        label: record.label,
        latitude: record.latitude,
        longitude: record.longitude,
        radius: record.radius,
        active: record.active,
        latest_timestamp: normalize_latest_timestamp(record.latest_timestamp),
    })
}

// ---------------------------------------------------------------------------
// Accessors
// ---------------------------------------------------------------------------

/// Fetch the full location directory.
pub fn list_locations(client: &ApiClient) -> Result<Vec<Location>, NoiseApiError> {
    let response: LocationsResponse = client.get("/locations", &[])?;
    response.locations.into_iter().map(normalize).collect()
}

/// Fetch a single location by id.
///
/// The server answers a specific-id request with zero or one records; zero
/// is the not-found signal and maps to `Ok(None)`, not to an error. Callers
/// that require presence can map `None` to
/// `NoiseApiError::LocationNotFound`.
pub fn get_location(
    client: &ApiClient,
    id: &LocationId,
) -> Result<Option<Location>, NoiseApiError> {
    let endpoint = format!("/locations/{}", id);
    let response: LocationsResponse = client.get(&endpoint, &[])?;
    response
        .locations
        .into_iter()
        .next()
        .map(normalize)
        .transpose()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
