//! Paginated noise measurement retrieval.
//!
//! The measurement endpoint serves bounded pages with no total-count or
//! next-cursor signal; an empty page is the sole termination condition. The
//! engine here decides whether to paginate at all (granularity resolution),
//! drives the page loop with a ceiling and a cancellation check, and merges
//! pages into one collection whose shape follows the requested granularity.

use serde::Deserialize;

use crate::config::Config;
use crate::ingest::CancelToken;
use crate::ingest::client::ApiClient;
use crate::model::{
    Granularity, LocationId, MeasurementCollection, NoiseAggregate, NoiseApiError,
    NoiseRequestParams, NoiseSample,
};

// ---------------------------------------------------------------------------
// Granularity resolution
// ---------------------------------------------------------------------------

/// Decide effective request parameters and whether the engine paginates.
///
/// Rules, in priority order:
/// - no params given: synthesize `page = 0`, paginate;
/// - params given, `page` unset, granularity not `life-time`: set `page = 0`,
///   paginate;
/// - params given with `page` already set, or `life-time` granularity:
///   pass through unchanged, single request.
///
/// Pure function; performs no I/O.
pub fn resolve_pagination(params: Option<NoiseRequestParams>) -> (NoiseRequestParams, bool) {
    match params {
        None => (
            NoiseRequestParams {
                page: Some(0),
                ..NoiseRequestParams::default()
            },
            true,
        ),
        Some(mut params) => {
            if params.page.is_none() && params.granularity != Some(Granularity::LifeTime) {
                params.page = Some(0);
                (params, true)
            } else {
                (params, false)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Query serialization
// ---------------------------------------------------------------------------

/// Serialize request parameters to a flat string-keyed query list.
///
/// Numeric values take their decimal string form; timestamps are converted
/// into the deployment's fixed reporting offset and formatted without
/// fractional seconds. Absent parameters are omitted entirely.
pub fn build_query(
    params: &NoiseRequestParams,
    offset: chrono::FixedOffset,
) -> Vec<(String, String)> {
    let mut query = Vec::new();

    if let Some(granularity) = params.granularity {
        query.push(("granularity".to_string(), granularity.as_str().to_string()));
    }
    if let Some(start) = params.start {
        query.push(("start".to_string(), format_query_timestamp(start, offset)));
    }
    if let Some(end) = params.end {
        query.push(("end".to_string(), format_query_timestamp(end, offset)));
    }
    if let Some(page) = params.page {
        query.push(("page".to_string(), page.to_string()));
    }
    if let Some(period) = params.period {
        query.push(("hours".to_string(), period.as_str().to_string()));
    }

    query
}

fn format_query_timestamp(
    dt: chrono::DateTime<chrono::FixedOffset>,
    offset: chrono::FixedOffset,
) -> String {
    dt.with_timezone(&offset)
        .format("%Y-%m-%dT%H:%M:%S%:z")
        .to_string()
}

// ---------------------------------------------------------------------------
// Page loop
// ---------------------------------------------------------------------------

/// Drive the page loop over an arbitrary page source and merge the results.
///
/// Always performs at least one fetch. While paginating, the page index is
/// incremented after every non-empty page and the loop stops at the first
/// empty one. Two guards bound the loop: the caller's cancellation token is
/// checked before every fetch, and the total number of fetches may not
/// exceed `max_pages`.
///
/// Factored over a closure so the termination and merge behavior is
/// testable without a network; the HTTP paths below supply the real fetch.
pub fn collect_pages<T, F>(
    mut fetch_page: F,
    mut params: NoiseRequestParams,
    paginate: bool,
    max_pages: u32,
    cancel: &CancelToken,
) -> Result<Vec<T>, NoiseApiError>
where
    F: FnMut(&NoiseRequestParams) -> Result<Vec<T>, NoiseApiError>,
{
    let mut collected: Vec<T> = Vec::new();
    let mut fetched: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(NoiseApiError::Cancelled);
        }
        if fetched >= max_pages {
            return Err(NoiseApiError::PageLimitExceeded {
                fetched,
                limit: max_pages,
            });
        }

        let page = fetch_page(&params)?;
        fetched += 1;

        let page_was_empty = page.is_empty();
        collected.extend(page);

        if !paginate || page_was_empty {
            return Ok(collected);
        }

        params.page = Some(params.page.unwrap_or(0) + 1);
    }
}

// ---------------------------------------------------------------------------
// Measurement fetch
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct MeasurementsResponse<T> {
    measurements: Vec<T>,
}

/// Fetch all noise measurements for one location.
///
/// Resolves pagination from `params`, drives the page loop against the
/// location's measurement endpoint, and returns one concatenated collection.
/// The collection's shape follows the requested granularity: `life-time`
/// yields interval aggregates, everything else yields timed samples. Order
/// within and across pages is preserved as served.
pub fn fetch_noise_measurements(
    client: &ApiClient,
    config: &Config,
    location_id: &LocationId,
    params: Option<NoiseRequestParams>,
    cancel: &CancelToken,
) -> Result<MeasurementCollection, NoiseApiError> {
    let (effective, paginate) = resolve_pagination(params);
    let endpoint = format!("/locations/{}/noise", location_id);
    let offset = config.fixed_offset();

    match effective.granularity {
        Some(Granularity::LifeTime) => {
            let aggregates = collect_pages(
                |p| fetch_one_page::<NoiseAggregate>(client, &endpoint, p, offset),
                effective,
                paginate,
                config.api.max_pages,
                cancel,
            )?;
            Ok(MeasurementCollection::Aggregates(aggregates))
        }
        _ => {
            let samples = collect_pages(
                |p| fetch_one_page::<NoiseSample>(client, &endpoint, p, offset),
                effective,
                paginate,
                config.api.max_pages,
                cancel,
            )?;
            Ok(MeasurementCollection::Samples(samples))
        }
    }
}

fn fetch_one_page<T: serde::de::DeserializeOwned>(
    client: &ApiClient,
    endpoint: &str,
    params: &NoiseRequestParams,
    offset: chrono::FixedOffset,
) -> Result<Vec<T>, NoiseApiError> {
    let response: MeasurementsResponse<T> = client.get(endpoint, &build_query(params, offset))?;
    Ok(response.measurements)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    use crate::model::Period;

    fn reporting_offset() -> FixedOffset {
        FixedOffset::west_opt(4 * 3600).unwrap()
    }

    // --- resolve_pagination -------------------------------------------------

    #[test]
    fn test_no_params_synthesizes_page_zero_and_paginates() {
        let (params, paginate) = resolve_pagination(None);
        assert_eq!(params.page, Some(0));
        assert_eq!(params.granularity, None);
        assert!(paginate);
    }

    #[test]
    fn test_unset_page_with_raw_granularity_paginates() {
        let input = NoiseRequestParams {
            granularity: Some(Granularity::Raw),
            ..NoiseRequestParams::default()
        };
        let (params, paginate) = resolve_pagination(Some(input));
        assert_eq!(params.page, Some(0));
        assert!(paginate);
    }

    #[test]
    fn test_life_time_granularity_never_paginates() {
        let input = NoiseRequestParams {
            granularity: Some(Granularity::LifeTime),
            ..NoiseRequestParams::default()
        };
        let (params, paginate) = resolve_pagination(Some(input.clone()));
        assert_eq!(params, input, "life-time params pass through unchanged");
        assert!(!paginate);
    }

    #[test]
    fn test_explicit_page_disables_pagination() {
        let input = NoiseRequestParams {
            page: Some(3),
            ..NoiseRequestParams::default()
        };
        let (params, paginate) = resolve_pagination(Some(input.clone()));
        assert_eq!(params, input, "explicit-page params pass through unchanged");
        assert!(!paginate);
    }

    // --- build_query --------------------------------------------------------

    #[test]
    fn test_absent_params_are_omitted() {
        let query = build_query(&NoiseRequestParams::default(), reporting_offset());
        assert!(query.is_empty());
    }

    #[test]
    fn test_numbers_are_stringified() {
        let params = NoiseRequestParams {
            granularity: Some(Granularity::Hourly),
            page: Some(7),
            ..NoiseRequestParams::default()
        };
        let query = build_query(&params, reporting_offset());
        assert_eq!(
            query,
            vec![
                ("granularity".to_string(), "hourly".to_string()),
                ("page".to_string(), "7".to_string()),
            ]
        );
    }

    #[test]
    fn test_timestamps_take_the_reporting_offset() {
        // 12:00 UTC is 08:00 in the -04:00 reporting timezone.
        let start = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .unwrap();
        let params = NoiseRequestParams {
            start: Some(start),
            ..NoiseRequestParams::default()
        };
        let query = build_query(&params, reporting_offset());
        assert_eq!(
            query,
            vec![("start".to_string(), "2024-05-01T08:00:00-04:00".to_string())]
        );
    }

    #[test]
    fn test_period_is_sent_as_hours_parameter() {
        let params = NoiseRequestParams {
            period: Some(Period::Evening),
            ..NoiseRequestParams::default()
        };
        let query = build_query(&params, reporting_offset());
        assert_eq!(query, vec![("hours".to_string(), "evening".to_string())]);
    }

    // --- collect_pages ------------------------------------------------------

    /// A scripted page source: serves the given pages in order, then empty
    /// pages forever, and records the page index of every request.
    fn scripted_source(
        pages: Vec<Vec<u32>>,
    ) -> (
        Box<dyn FnMut(&NoiseRequestParams) -> Result<Vec<u32>, NoiseApiError>>,
        std::rc::Rc<std::cell::RefCell<Vec<Option<u32>>>>,
    ) {
        let calls = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let calls_clone = calls.clone();
        let mut remaining = pages.into_iter();
        let fetch = move |params: &NoiseRequestParams| -> Result<Vec<u32>, NoiseApiError> {
            calls_clone.borrow_mut().push(params.page);
            Ok(remaining.next().unwrap_or_default())
        };
        (Box::new(fetch), calls)
    }

    fn paginating_params() -> NoiseRequestParams {
        NoiseRequestParams {
            page: Some(0),
            ..NoiseRequestParams::default()
        }
    }

    #[test]
    fn test_terminates_after_first_empty_page() {
        // Pages [2, 3, 0] measurements: k = 2 non-empty pages, k + 1 calls.
        let (fetch, calls) = scripted_source(vec![vec![1, 2], vec![3, 4, 5]]);
        let collected =
            collect_pages(fetch, paginating_params(), true, 1000, &CancelToken::new()).unwrap();

        assert_eq!(collected, vec![1, 2, 3, 4, 5]);
        assert_eq!(*calls.borrow(), vec![Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn test_order_is_preserved_across_concatenation() {
        // [A, B] then [] concatenates to A ++ B, order-equal.
        let (fetch, _calls) = scripted_source(vec![vec![10, 20], vec![30]]);
        let collected =
            collect_pages(fetch, paginating_params(), true, 1000, &CancelToken::new()).unwrap();
        assert_eq!(collected, vec![10, 20, 30]);
    }

    #[test]
    fn test_empty_first_page_yields_empty_collection() {
        let (fetch, calls) = scripted_source(vec![]);
        let collected =
            collect_pages(fetch, paginating_params(), true, 1000, &CancelToken::new()).unwrap();
        assert!(collected.is_empty());
        assert_eq!(calls.borrow().len(), 1, "no error and exactly one call");
    }

    #[test]
    fn test_single_fetch_when_pagination_disabled() {
        // Non-empty page with pagination off: one call, no follow-up.
        let (fetch, calls) = scripted_source(vec![vec![1, 2, 3]]);
        let params = NoiseRequestParams {
            page: Some(3),
            ..NoiseRequestParams::default()
        };
        let collected = collect_pages(fetch, params, false, 1000, &CancelToken::new()).unwrap();
        assert_eq!(collected, vec![1, 2, 3]);
        assert_eq!(*calls.borrow(), vec![Some(3)]);
    }

    #[test]
    fn test_page_ceiling_stops_a_server_that_never_drains() {
        let fetch = |_: &NoiseRequestParams| Ok(vec![1u32]);
        let result = collect_pages(fetch, paginating_params(), true, 5, &CancelToken::new());
        assert_eq!(
            result,
            Err(NoiseApiError::PageLimitExceeded {
                fetched: 5,
                limit: 5
            })
        );
    }

    #[test]
    fn test_cancellation_is_checked_before_first_fetch() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let fetch = |_: &NoiseRequestParams| -> Result<Vec<u32>, NoiseApiError> {
            panic!("must not fetch after cancellation")
        };
        let result = collect_pages(fetch, paginating_params(), true, 1000, &cancel);
        assert_eq!(result, Err(NoiseApiError::Cancelled));
    }

    #[test]
    fn test_mid_pagination_failure_propagates() {
        // A transport failure on page 1 must surface, not truncate silently.
        let mut served = 0;
        let fetch = move |_: &NoiseRequestParams| {
            served += 1;
            if served == 1 {
                Ok(vec![1u32, 2])
            } else {
                Err(NoiseApiError::Transport("connection reset".to_string()))
            }
        };
        let result = collect_pages(fetch, paginating_params(), true, 1000, &CancelToken::new());
        assert_eq!(
            result,
            Err(NoiseApiError::Transport("connection reset".to_string()))
        );
    }

    // --- response deserialization -------------------------------------------

    #[test]
    fn test_sample_page_deserializes() {
        let body = serde_json::json!({
            "measurements": [
                { "timestamp": "2024-05-01T11:00:00-04:00", "min": 38.1, "max": 71.3, "mean": 52.4 },
                { "timestamp": "2024-05-01T12:00:00-04:00", "min": 40.0, "max": 68.9, "mean": 50.1 }
            ]
        });
        let response: MeasurementsResponse<NoiseSample> = serde_json::from_value(body).unwrap();
        assert_eq!(response.measurements.len(), 2);
        assert_eq!(response.measurements[0].mean, 52.4);
    }

    #[test]
    fn test_aggregate_page_deserializes() {
        let body = serde_json::json!({
            "measurements": [
                {
                    "start": "2023-01-15T00:00:00-04:00",
                    "end": "2024-05-01T12:00:00-04:00",
                    "count": 181044,
                    "min": 31.2,
                    "max": 94.7,
                    "mean": 49.8
                }
            ]
        });
        let response: MeasurementsResponse<NoiseAggregate> = serde_json::from_value(body).unwrap();
        assert_eq!(response.measurements.len(), 1);
        assert_eq!(response.measurements[0].count, 181044);
    }
}
