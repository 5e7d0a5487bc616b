//! Message types and channels feeding the pipeline.
//!
//! # Record Flow
//!
//! 1. The inbound adapter wraps each payload in a `RawRecord` and sends it
//!    on the raw record channel
//! 2. `PipelineRunner` receives it and spawns one pipeline run per record
//! 3. The run ends `Delivered`, `FilteredOut` or `Failed`; nothing is
//!    re-enqueued

pub mod channels;
pub mod types;

pub use channels::{
    DEFAULT_CHANNEL_BUFFER, RawRecordReceiver, RawRecordSender, raw_record_channel,
};

pub use types::{RawRecord, Stage};
