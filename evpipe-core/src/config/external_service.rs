//! External HTTP service configuration.

use std::time::Duration;
use url::Url;

/// Target of the delivery stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalServiceConfig {
    /// Endpoint that receives one POST per delivered record.
    pub url: Url,
    /// Upper bound for both the rate-limit wait and the HTTP exchange.
    pub timeout: Duration,
}

impl ExternalServiceConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(url: Url) -> Self {
        Self {
            url,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}
