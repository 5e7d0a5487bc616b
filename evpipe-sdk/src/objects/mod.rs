pub mod event;
pub mod ingest;
pub mod metrics;

pub use event::Event;
pub use ingest::RecordAccepted;
pub use metrics::{CounterName, MetricsSnapshot};
