//! PipelineRunner: drives the pipeline from the raw record channel.
//!
//! The PipelineRunner is responsible for:
//! - Receiving `RawRecord` messages from the channel
//! - Running each record as its own task, at most `workers` at a time
//! - Routing runs that die unexpectedly (panics) to the `ErrorSink`
//! - Draining in-flight runs on shutdown

use crate::events::RawRecordReceiver;
use crate::pipeline::{Pipeline, PipelineError, PipelineOutcome};
use crate::processors::delivery::EventSink;
use crate::processors::error_sink::DeadLetter;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::{Semaphore, watch};
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{debug, info, warn};

/// Runs the pipeline for every received record.
pub struct PipelineRunner<S: EventSink + 'static> {
    pipeline: Arc<Pipeline<S>>,
    record_rx: RawRecordReceiver,
    shutdown_rx: watch::Receiver<bool>,
    workers: NonZeroUsize,
}

/// Offsets of in-flight runs, keyed by task id.
type InFlight = HashMap<Id, u64>;

impl<S: EventSink + 'static> PipelineRunner<S> {
    /// Create a new PipelineRunner.
    ///
    /// # Arguments
    ///
    /// * `pipeline` - The pipeline shared by all runs
    /// * `record_rx` - Receiver for RawRecord messages
    /// * `shutdown_rx` - Receiver for shutdown signal
    /// * `workers` - Maximum number of concurrent runs
    pub fn new(
        pipeline: Arc<Pipeline<S>>,
        record_rx: RawRecordReceiver,
        shutdown_rx: watch::Receiver<bool>,
        workers: NonZeroUsize,
    ) -> Self {
        Self {
            pipeline,
            record_rx,
            shutdown_rx,
            workers,
        }
    }

    /// Run until shutdown is signaled or every sender is dropped.
    pub async fn run(mut self) {
        info!(workers = self.workers.get(), "PipelineRunner started");

        let permits = Arc::new(Semaphore::new(self.workers.get()));
        let mut tasks: JoinSet<PipelineOutcome> = JoinSet::new();
        let mut in_flight = InFlight::new();

        'receive: loop {
            // A free worker comes first, so no record is taken off the
            // channel that could not start right away.
            let permit = tokio::select! {
                biased;

                // Check for shutdown
                changed = self.shutdown_rx.changed() => {
                    if Self::is_shutdown(changed, &self.shutdown_rx) {
                        break 'receive;
                    }
                    continue 'receive;
                }

                // Reap finished runs
                Some(joined) = tasks.join_next_with_id(), if !tasks.is_empty() => {
                    self.reap(joined, &mut in_flight);
                    continue 'receive;
                }

                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        warn!("Worker semaphore closed");
                        break 'receive;
                    }
                },
            };

            // Receive RawRecord messages
            let record = loop {
                tokio::select! {
                    biased;

                    changed = self.shutdown_rx.changed() => {
                        if Self::is_shutdown(changed, &self.shutdown_rx) {
                            break 'receive;
                        }
                    }

                    Some(joined) = tasks.join_next_with_id(), if !tasks.is_empty() => {
                        self.reap(joined, &mut in_flight);
                    }

                    record = self.record_rx.recv() => match record {
                        Some(record) => break record,
                        None => {
                            info!("RawRecord channel closed");
                            break 'receive;
                        }
                    },
                }
            };

            let offset = record.offset;
            let pipeline = Arc::clone(&self.pipeline);
            let handle = tasks.spawn(async move {
                let _permit = permit;
                pipeline.run(record).await
            });
            in_flight.insert(handle.id(), offset);
        }

        if !tasks.is_empty() {
            info!(in_flight = tasks.len(), "Draining in-flight records");
        }
        while let Some(joined) = tasks.join_next_with_id().await {
            self.reap(joined, &mut in_flight);
        }

        info!("PipelineRunner shutdown complete");
    }

    /// A dropped sender also means shutdown.
    fn is_shutdown(
        changed: Result<(), watch::error::RecvError>,
        shutdown_rx: &watch::Receiver<bool>,
    ) -> bool {
        let shutdown = changed.is_err() || *shutdown_rx.borrow();
        if shutdown {
            info!("PipelineRunner received shutdown signal");
        }
        shutdown
    }

    fn reap(&self, joined: Result<(Id, PipelineOutcome), JoinError>, in_flight: &mut InFlight) {
        match joined {
            Ok((id, outcome)) => {
                let offset = in_flight.remove(&id);
                debug!(offset, outcome = outcome_label(&outcome), "Record finished");
            }
            Err(join_error) => {
                let offset = in_flight.remove(&join_error.id()).unwrap_or_default();
                let cause = if join_error.is_panic() {
                    "pipeline run panicked".to_string()
                } else {
                    join_error.to_string()
                };
                self.pipeline.error_sink().handle(&DeadLetter {
                    offset,
                    event_id: None,
                    error: PipelineError::Unexpected(cause),
                });
            }
        }
    }
}

fn outcome_label(outcome: &PipelineOutcome) -> &'static str {
    match outcome {
        PipelineOutcome::Delivered => "delivered",
        PipelineOutcome::FilteredOut => "filtered_out",
        PipelineOutcome::Failed(_) => "failed",
    }
}
