//! Bounded worker pool for one batch.
//!
//! ## Ordering
//!
//! Workers pull the next unclaimed input index from a shared cursor and store
//! each outcome in the slot for that index. Output position therefore always
//! equals input position, whatever order workers finish in.
//!
//! ## Lifetime
//!
//! Workers are scoped threads: every worker spawned for a batch has exited
//! before [`BatchExecutor::run`] returns.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use thiserror::Error;
use tracing::{debug, error, info, info_span};

use batchinfer_core::{Clock, InputRecord, OutputRecord};

use crate::client::{InferenceClient, InvocationError};
use crate::processor::{RecordError, RecordOutcome, RecordProcessor};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("failed to spawn any batch worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Ordered outputs for one batch, index-for-index with the input.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub outputs: Vec<OutputRecord>,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn into_outputs(self) -> Vec<OutputRecord> {
        self.outputs
    }
}

#[derive(Debug, Clone)]
pub struct BatchExecutor {
    max_workers: usize,
    name: String,
}

impl BatchExecutor {
    /// `max_workers` is clamped to at least one.
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            name: "batch-worker".to_string(),
        }
    }

    /// Prefix for worker thread names.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn run<C, K>(
        &self,
        processor: &RecordProcessor<C, K>,
        records: &[InputRecord],
    ) -> Result<BatchResult, BatchError>
    where
        C: InferenceClient,
        K: Clock,
    {
        if records.is_empty() {
            return Ok(BatchResult {
                outputs: Vec::new(),
                succeeded: 0,
                failed: 0,
            });
        }

        let workers = self.max_workers.min(records.len());
        let cursor = AtomicUsize::new(0);
        let slots: Vec<OnceLock<RecordOutcome>> = (0..records.len()).map(|_| OnceLock::new()).collect();

        info!(records = records.len(), workers, "batch started");

        let spawned = thread::scope(|scope| -> Result<usize, std::io::Error> {
            let mut handles = Vec::with_capacity(workers);
            let mut spawn_error = None;

            for n in 0..workers {
                let worker = format!("{}-{n}", self.name);
                let cursor = &cursor;
                let slots = &slots;
                let spawned = thread::Builder::new()
                    .name(worker.clone())
                    .spawn_scoped(scope, move || worker_loop(&worker, processor, records, cursor, slots));
                match spawned {
                    Ok(h) => handles.push(h),
                    Err(e) => {
                        error!(error = %e, spawned = handles.len(), "failed to spawn batch worker");
                        spawn_error = Some(e);
                        break;
                    }
                }
            }

            let spawned = handles.len();
            for h in handles {
                if h.join().is_err() {
                    error!("batch worker panicked; its in-flight record is reported as failed");
                }
            }

            match spawn_error {
                Some(e) if spawned == 0 => Err(e),
                _ => Ok(spawned),
            }
        })?;

        let mut succeeded = 0;
        let mut failed = 0;
        let outputs: Vec<OutputRecord> = slots
            .into_iter()
            .zip(records)
            .map(|(slot, record)| {
                let outcome = slot.into_inner().unwrap_or_else(|| RecordOutcome::Failure {
                    record_id: record.record_id.clone(),
                    model_input: record.echo(),
                    error: RecordError::Invocation(InvocationError::Transport(
                        "worker terminated before producing a result".to_string(),
                    )),
                });
                if outcome.is_success() {
                    succeeded += 1;
                } else {
                    failed += 1;
                }
                outcome.into_output()
            })
            .collect();

        info!(records = outputs.len(), succeeded, failed, workers = spawned, "batch finished");

        Ok(BatchResult {
            outputs,
            succeeded,
            failed,
        })
    }
}

fn worker_loop<C, K>(
    worker: &str,
    processor: &RecordProcessor<C, K>,
    records: &[InputRecord],
    cursor: &AtomicUsize,
    slots: &[OnceLock<RecordOutcome>],
) where
    C: InferenceClient,
    K: Clock,
{
    let span = info_span!("worker", worker = %worker);
    let _guard = span.enter();
    let mut handled = 0usize;

    loop {
        let idx = cursor.fetch_add(1, Ordering::Relaxed);
        let Some(record) = records.get(idx) else {
            break;
        };
        let outcome = processor.process(record);
        let _ = slots[idx].set(outcome);
        handled += 1;
    }

    debug!(handled, "batch worker finished");
}
