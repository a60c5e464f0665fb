//! `batchinfer-core`: data building blocks shared by every layer.
//!
//! This crate contains **pure data** (records, identifiers, configuration, clock)
//! and no I/O.

pub mod clock;
pub mod config;
pub mod error;
pub mod id;
pub mod record;

pub use clock::{Clock, ManualClock, MonotonicClock, Timestamp};
pub use config::{Credentials, InferenceTarget, JobConfig, RateLimitPolicy};
pub use error::{ConfigError, ConfigResult};
pub use id::RunId;
pub use record::{InputRecord, OutputRecord};
