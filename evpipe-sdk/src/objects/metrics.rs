//! Counter names and the metrics snapshot exposed by the server.

use serde::{Deserialize, Serialize};

/// Names of every counter maintained by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterName {
    RecordsIn,
    RecordsUnmarshalled,
    RecordsUnmarshallFailure,
    RecordsFiltered,
    RecordsProcessed,
    RecordsProcessingFailure,
    RecordsOut,
    RecordsFailed,
    UnexpectedFailures,
}

impl CounterName {
    /// All counters, in pipeline order.
    pub const ALL: [CounterName; 9] = [
        CounterName::RecordsIn,
        CounterName::RecordsUnmarshalled,
        CounterName::RecordsUnmarshallFailure,
        CounterName::RecordsFiltered,
        CounterName::RecordsProcessed,
        CounterName::RecordsProcessingFailure,
        CounterName::RecordsOut,
        CounterName::RecordsFailed,
        CounterName::UnexpectedFailures,
    ];

    /// The exported metric name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterName::RecordsIn => "recordsIn",
            CounterName::RecordsUnmarshalled => "recordsUnmarshalled",
            CounterName::RecordsUnmarshallFailure => "recordsUnmarshallFailure",
            CounterName::RecordsFiltered => "recordsFiltered",
            CounterName::RecordsProcessed => "recordsProcessed",
            CounterName::RecordsProcessingFailure => "recordsProcessingFailure",
            CounterName::RecordsOut => "recordsOut",
            CounterName::RecordsFailed => "recordsFailed",
            CounterName::UnexpectedFailures => "unexpectedFailures",
        }
    }

    /// Position of this counter inside [`CounterName::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for CounterName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time values of all pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub records_in: u64,
    pub records_unmarshalled: u64,
    pub records_unmarshall_failure: u64,
    pub records_filtered: u64,
    pub records_processed: u64,
    pub records_processing_failure: u64,
    pub records_out: u64,
    pub records_failed: u64,
    pub unexpected_failures: u64,
}

impl MetricsSnapshot {
    pub fn get(&self, counter: CounterName) -> u64 {
        match counter {
            CounterName::RecordsIn => self.records_in,
            CounterName::RecordsUnmarshalled => self.records_unmarshalled,
            CounterName::RecordsUnmarshallFailure => self.records_unmarshall_failure,
            CounterName::RecordsFiltered => self.records_filtered,
            CounterName::RecordsProcessed => self.records_processed,
            CounterName::RecordsProcessingFailure => self.records_processing_failure,
            CounterName::RecordsOut => self.records_out,
            CounterName::RecordsFailed => self.records_failed,
            CounterName::UnexpectedFailures => self.unexpected_failures,
        }
    }

    /// Sum of every failure counter.
    pub fn total_failures(&self) -> u64 {
        self.records_unmarshall_failure
            .saturating_add(self.records_processing_failure)
            .saturating_add(self.records_failed)
            .saturating_add(self.unexpected_failures)
    }
}
