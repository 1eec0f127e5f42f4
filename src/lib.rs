//! Noise measurement retrieval and aggregation service.
//!
//! Fetches time-series noise levels for fixed sensor locations from the
//! measurement API and reduces them to windowed summary statistics. The
//! pipeline is a pure request/transform pass: nothing is persisted or
//! cached across calls, and the caller owns whatever comes back.
//!
//! Module map:
//! - `model` - shared domain types and the error taxonomy.
//! - `config` - TOML + environment configuration.
//! - `logging` - leveled, location-tagged logging.
//! - `activity` - the derived "recently sending data" flag.
//! - `ingest` - HTTP client, location directory, paginated measurement fetch.
//! - `analysis` - period splits and windowed averages.
//! - `verify` - live-API verification harness.

pub mod activity;
pub mod analysis;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod verify;
