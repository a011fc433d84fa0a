// src/checker/settings.rs
// =============================================================================
// Settings for one checking run. Built once by the caller and never changed
// while the run is in progress.
// =============================================================================

use crate::headers::Identity;
use std::time::Duration;

/// Configuration for a checking run.
#[derive(Debug, Clone)]
pub struct CheckSettings {
    /// Maximum number of URLs being probed at the same time (at least 1)
    pub concurrency: usize,
    /// Timeout for each individual request
    pub timeout: Duration,
    /// Follow 3xx responses to their final destination
    pub follow_redirects: bool,
    /// Send HEAD first, falling back to GET when HEAD gets a status >= 400
    pub head_then_get: bool,
    /// Extra attempts after a transport failure
    pub retries: u32,
    /// Identity used for the primary probe
    pub identity: Identity,
    /// Retry 403/404 responses with an alternate identity
    pub alternate_identity_retry: bool,
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            concurrency: 10,
            timeout: Duration::from_secs(15),
            follow_redirects: true,
            head_then_get: true,
            retries: 1,
            identity: Identity::default(),
            alternate_identity_retry: true,
        }
    }
}
