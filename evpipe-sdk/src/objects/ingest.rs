//! Ingest endpoint DTOs.

use serde::{Deserialize, Serialize};

/// Content type used when publishing encoded events.
pub const ENCODED_EVENT_CONTENT_TYPE: &str = "application/octet-stream";

/// Response body of `POST /topics/{topic}/records`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordAccepted {
    /// Offset assigned to the record by the server.
    pub offset: u64,
}
