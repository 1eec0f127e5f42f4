//! Aggregation of fetched measurements into summary statistics.
//!
//! Submodules:
//! - `periods` - day/evening/night membership and client-side split averages.
//! - `windows` - windowed averages and the per-location summary fan-out.

pub mod periods;
pub mod windows;
