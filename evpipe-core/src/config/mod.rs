//! Configuration types for the evpipe pipeline.
//!
//! These types represent the validated runtime configuration. The actual
//! config loading/parsing is handled by the server crate.

mod external_service;
mod source;
mod throttle;

pub use external_service::ExternalServiceConfig;
pub use source::SourceConfig;
pub use throttle::ThrottleConfig;

/// Complete pipeline configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Inbound topic and worker settings.
    pub source: SourceConfig,
    /// Outbound admission rate.
    pub throttling: ThrottleConfig,
    /// Outbound HTTP target.
    pub external_service: ExternalServiceConfig,
}
