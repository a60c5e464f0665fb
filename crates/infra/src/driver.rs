//! Job driver: runs every input dataset of a job through the engine, one file
//! at a time.
//!
//! - Files are processed strictly in list order; concurrency exists only inside
//!   one file's batch.
//! - Uris without the dataset extension are skipped with a warning.
//! - The first file-level failure (read, write, worker spawn) stops the run.
//! - Record-level failures never stop anything; they are counted and written.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, info_span, warn};

use batchinfer_core::{Clock, JobConfig, MonotonicClock, RunId};
use batchinfer_engine::{BatchError, BatchExecutor, InferenceClient, RateLimiter, RecordProcessor};

use crate::dataset::{DatasetError, DatasetIo};
use crate::object_store::{ObjectStore, ObjectStoreError, ObjectUri};

/// Input objects must end with this to be processed.
pub const DATASET_EXTENSION: &str = ".jsonl";

/// Appended to the input file name to form the output object name.
pub const OUTPUT_SUFFIX: &str = ".out";

#[derive(Debug, Error)]
pub enum JobError {
    #[error("invalid uri: {0}")]
    InvalidUri(#[source] ObjectStoreError),

    #[error("failed to read {uri}: {source}")]
    Read {
        uri: String,
        #[source]
        source: DatasetError,
    },

    #[error("failed to write {uri}: {source}")]
    Write {
        uri: String,
        #[source]
        source: DatasetError,
    },

    #[error("failed to process {uri}: {source}")]
    Batch {
        uri: String,
        #[source]
        source: BatchError,
    },
}

/// Per-file summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub input: String,
    pub output: String,
    pub records: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Summary of one completed run.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub run_id: RunId,
    pub target: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub files: Vec<FileReport>,
    pub skipped: Vec<String>,
}

impl JobReport {
    pub fn total_records(&self) -> usize {
        self.files.iter().map(|f| f.records).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.files.iter().map(|f| f.failed).sum()
    }
}

/// Output location for `input` under `output_prefix`: `prefix/ + basename + ".out"`.
pub fn output_uri_for(input: &ObjectUri, output_prefix: &ObjectUri) -> Option<ObjectUri> {
    let name = input.file_name()?;
    Some(output_prefix.child(&format!("{name}{OUTPUT_SUFFIX}")))
}

pub struct JobDriver<S, C, K: Clock = MonotonicClock> {
    dataset: DatasetIo<S>,
    processor: RecordProcessor<C, K>,
    executor: BatchExecutor,
    target: String,
}

impl<S: ObjectStore, C: InferenceClient> JobDriver<S, C, MonotonicClock> {
    /// One limiter per driver: its quota covers exactly this job's target.
    pub fn for_config(store: S, client: C, config: &JobConfig) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.rate_limit));
        Self::new(store, client, limiter, config.max_workers)
            .with_target(config.target.identity())
    }
}

impl<S: ObjectStore, C: InferenceClient, K: Clock> JobDriver<S, C, K> {
    pub fn new(store: S, client: C, limiter: Arc<RateLimiter<K>>, max_workers: usize) -> Self {
        Self {
            dataset: DatasetIo::new(store),
            processor: RecordProcessor::new(client, limiter),
            executor: BatchExecutor::new(max_workers),
            target: String::new(),
        }
    }

    /// Label for logs and the run report.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn dataset(&self) -> &DatasetIo<S> {
        &self.dataset
    }

    pub fn run(&self, input_uris: &[String], output_prefix: &str) -> Result<JobReport, JobError> {
        let run_id = RunId::new();
        let span = info_span!("job", run_id = %run_id, inference_target = %self.target);
        let _guard = span.enter();

        let started_at = Utc::now();
        let prefix = ObjectUri::parse(output_prefix).map_err(JobError::InvalidUri)?;
        info!(files = input_uris.len(), output_prefix = %prefix, "job started");

        let mut files = Vec::new();
        let mut skipped = Vec::new();

        for raw in input_uris.iter().map(|u| u.trim()).filter(|u| !u.is_empty()) {
            // Extension first: anything that is not a dataset is skipped, whatever its scheme.
            if !raw.ends_with(DATASET_EXTENSION) {
                warn!(uri = raw, expected = DATASET_EXTENSION, "skipping input without dataset extension");
                skipped.push(raw.to_string());
                continue;
            }
            let input = ObjectUri::parse(raw).map_err(JobError::InvalidUri).inspect_err(|e| {
                error!(uri = raw, error = %e, "invalid input uri");
            })?;

            let report = self.run_file(&input, &prefix).inspect_err(|e| {
                error!(uri = %input, error = %e, "file processing failed; stopping run");
            })?;
            files.push(report);
        }

        let finished_at = Utc::now();
        info!(
            files = files.len(),
            skipped = skipped.len(),
            elapsed_ms = (finished_at - started_at).num_milliseconds(),
            "job finished"
        );

        Ok(JobReport {
            run_id,
            target: self.target.clone(),
            started_at,
            finished_at,
            files,
            skipped,
        })
    }

    fn run_file(&self, input: &ObjectUri, prefix: &ObjectUri) -> Result<FileReport, JobError> {
        let output = output_uri_for(input, prefix).ok_or_else(|| {
            JobError::InvalidUri(ObjectStoreError::InvalidUri {
                uri: input.to_string(),
                reason: "no file name".to_string(),
            })
        })?;
        info!(input = %input, output = %output, "processing file");

        let records = self.dataset.read(input).map_err(|source| JobError::Read {
            uri: input.to_string(),
            source,
        })?;

        let result = self
            .executor
            .run(&self.processor, &records)
            .map_err(|source| JobError::Batch {
                uri: input.to_string(),
                source,
            })?;

        let (succeeded, failed) = (result.succeeded, result.failed);
        let outputs = result.into_outputs();

        self.dataset
            .write(&outputs, &output)
            .map_err(|source| JobError::Write {
                uri: output.to_string(),
                source,
            })?;

        Ok(FileReport {
            input: input.to_string(),
            output: output.to_string(),
            records: outputs.len(),
            succeeded,
            failed,
        })
    }
}
