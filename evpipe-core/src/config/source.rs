//! Inbound source configuration.

use std::num::NonZeroUsize;

/// Inbound topic and the number of records processed concurrently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Topic the pipeline consumes.
    pub topic: String,
    /// Maximum number of records in flight at once.
    pub workers: NonZeroUsize,
}

impl SourceConfig {
    pub const DEFAULT_WORKERS: NonZeroUsize = match NonZeroUsize::new(16) {
        Some(n) => n,
        None => NonZeroUsize::MIN,
    };

    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            workers: Self::DEFAULT_WORKERS,
        }
    }
}
