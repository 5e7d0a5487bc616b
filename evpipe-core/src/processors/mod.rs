//! Pipeline stages and the runner that drives them.
//!
//! - `DecodeStage`: Receives `RawRecord`, emits `Event`
//! - `TransformStage`: Receives `Event`, emits `TransformedPayload` for eligible events
//! - `DeliveryStage`: Receives `TransformedPayload`, posts it to the external service
//! - `ErrorSink`: Receives `DeadLetter` from any stage, counts and logs it
//! - `PipelineRunner`: Receives `RawRecord` from the channel, runs the pipeline per record

pub mod decode;
pub mod delivery;
pub mod error_sink;
pub mod runner;
pub mod transform;

pub use decode::DecodeStage;
pub use delivery::{DeliveryError, DeliveryStage, EventSink, HttpSink, OutboundRequest};
pub use error_sink::{DeadLetter, ErrorSink};
pub use runner::PipelineRunner;
pub use transform::{ProcessingError, TransformStage, TransformedPayload};
