//! Raw record channel factory and handles.

use super::types::RawRecord;
use tokio::sync::mpsc;

/// Default buffer size for the raw record channel.
///
/// This provides enough buffer to handle bursts while keeping memory bounded.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for RawRecord messages.
pub type RawRecordSender = mpsc::Sender<RawRecord>;
/// Receiver handle for RawRecord messages.
pub type RawRecordReceiver = mpsc::Receiver<RawRecord>;

/// Create a new RawRecord channel.
///
/// Returns a (sender, receiver) pair. Multiple senders can be cloned from
/// the returned sender; the receiver belongs to the `PipelineRunner`.
pub fn raw_record_channel() -> (RawRecordSender, RawRecordReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}
