//! HTTP client for the noise measurement API.
//!
//! One method, one request: `get` issues a single GET against one endpoint
//! with one set of query parameters and deserializes the JSON body. Every
//! failure mode (network, non-2xx status, unparseable body) is logged at the
//! failure site and surfaced as a typed `NoiseApiError`, so callers can tell
//! a failed request apart from a legitimately empty response.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::logging;
use crate::model::NoiseApiError;

/// Blocking HTTP client bound to one API base URL.
pub struct ApiClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client from configuration (base URL, timeout).
    pub fn new(config: &Config) -> Result<ApiClient, NoiseApiError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.api.timeout_secs))
            .build()
            .map_err(|e| NoiseApiError::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(ApiClient {
            http,
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Issue one GET request and deserialize the JSON response body.
    ///
    /// `query` is a flat, ordered list of string pairs; absent parameters
    /// must be omitted by the caller rather than passed as empty strings.
    pub fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(String, String)],
    ) -> Result<T, NoiseApiError> {
        let url = format!("{}{}", self.base_url, endpoint);

        let mut request = self.http.get(&url).header("Accept", "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().map_err(|e| {
            let err = NoiseApiError::Transport(e.to_string());
            logging::log_api_failure(None, &format!("GET {}", endpoint), &err);
            err
        })?;

        let status = response.status();
        if !status.is_success() {
            let err = NoiseApiError::Http(status.as_u16());
            logging::log_api_failure(None, &format!("GET {}", endpoint), &err);
            return Err(err);
        }

        response.json::<T>().map_err(|e| {
            let err = NoiseApiError::Parse(e.to_string());
            logging::log_api_failure(None, &format!("GET {}", endpoint), &err);
            err
        })
    }
}
