//! Delivery throttling configuration.

use std::num::NonZeroU32;
use std::time::Duration;

/// Maximum number of deliveries admitted per period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleConfig {
    /// Admissions allowed within one period.
    pub max_count: NonZeroU32,
    /// Length of the admission window.
    pub period: Duration,
}

impl ThrottleConfig {
    pub const DEFAULT_MAX_COUNT: NonZeroU32 = NonZeroU32::MIN;
    pub const DEFAULT_PERIOD: Duration = Duration::from_millis(1000);
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_count: Self::DEFAULT_MAX_COUNT,
            period: Self::DEFAULT_PERIOD,
        }
    }
}
