//! Message type definitions.

use bytes::Bytes;

/// An undecoded inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Position assigned by the inbound adapter. Used only for diagnostics.
    pub offset: u64,
    /// The encoded event bytes, possibly malformed.
    pub payload: Bytes,
}

impl RawRecord {
    pub fn new(offset: u64, payload: impl Into<Bytes>) -> Self {
        Self {
            offset,
            payload: payload.into(),
        }
    }
}

/// A pipeline step with its own failure domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Decode,
    Transform,
    Delivery,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Decode => write!(f, "decode"),
            Stage::Transform => write!(f, "transform"),
            Stage::Delivery => write!(f, "delivery"),
        }
    }
}
