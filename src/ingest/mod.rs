//! Data retrieval from the noise measurement API.
//!
//! Submodules:
//! - `client` - one-request HTTP client with typed failures.
//! - `locations` - the `/locations` directory accessor.
//! - `noise` - the paginated measurement fetch and granularity resolution.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub mod client;
pub mod locations;
pub mod noise;

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Caller-supplied cancellation signal, checked before every network request
/// in the pagination and fan-out paths.
///
/// Clones share the same flag, so a caller can hand one clone to a fetch and
/// trip the other from wherever the abandonment is detected. A fetch that
/// observes the flag returns `NoiseApiError::Cancelled` instead of issuing
/// further requests.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
