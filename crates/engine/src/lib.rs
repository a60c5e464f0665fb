//! `batchinfer-engine`
//!
//! **Responsibility:** rate-limited, concurrent execution of one ordered batch.
//!
//! - [`RateLimiter`] is the only state shared between workers.
//! - [`RecordProcessor`] turns every record into an outcome; failures are data.
//! - [`BatchExecutor`] fans a batch out over a bounded worker pool and collects
//!   results by input position.
//!
//! This crate stays storage-agnostic: records are handed in by callers (infra).

pub mod client;
pub mod executor;
pub mod processor;
pub mod rate_limiter;

pub use client::{FnClient, InferenceClient, InvocationError};
pub use executor::{BatchError, BatchExecutor, BatchResult};
pub use processor::{RecordError, RecordOutcome, RecordProcessor};
pub use rate_limiter::{Admission, RateLimiter, RateLimiterState};
