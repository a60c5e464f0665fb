use std::sync::Arc;

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, warn};

use batchinfer_core::{Clock, InputRecord, MonotonicClock, OutputRecord};

use crate::client::{InferenceClient, InvocationError};
use crate::rate_limiter::RateLimiter;

/// Why one record produced no model output.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("No model input found in the record.")]
    MissingInput,

    #[error(transparent)]
    Invocation(#[from] InvocationError),
}

/// Tagged result of processing one record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Success {
        record_id: String,
        model_input: JsonValue,
        model_output: JsonValue,
    },
    Failure {
        record_id: String,
        model_input: JsonValue,
        error: RecordError,
    },
}

impl RecordOutcome {
    pub fn record_id(&self) -> &str {
        match self {
            RecordOutcome::Success { record_id, .. } | RecordOutcome::Failure { record_id, .. } => {
                record_id
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RecordOutcome::Success { .. })
    }

    pub fn into_output(self) -> OutputRecord {
        match self {
            RecordOutcome::Success {
                record_id,
                model_input,
                model_output,
            } => OutputRecord::success(record_id, model_input, model_output),
            RecordOutcome::Failure {
                record_id,
                model_input,
                error,
            } => OutputRecord::failure(record_id, model_input, error.to_string()),
        }
    }
}

/// Rate limiter + client, composed once per engine and shared by every worker.
pub struct RecordProcessor<C, K: Clock = MonotonicClock> {
    client: C,
    limiter: Arc<RateLimiter<K>>,
}

impl<C: InferenceClient, K: Clock> RecordProcessor<C, K> {
    pub fn new(client: C, limiter: Arc<RateLimiter<K>>) -> Self {
        Self { client, limiter }
    }

    pub fn limiter(&self) -> &RateLimiter<K> {
        &self.limiter
    }

    /// Process one record. Never panics on bad input and never returns `Err`:
    /// every failure is folded into [`RecordOutcome::Failure`].
    pub fn process(&self, record: &InputRecord) -> RecordOutcome {
        let record_id = record.record_id.clone();
        let model_input = record.echo();

        let Some(payload) = record.payload() else {
            warn!(record_id = %record_id, "record has no model input");
            return RecordOutcome::Failure {
                record_id,
                model_input,
                error: RecordError::MissingInput,
            };
        };

        let admission = self.limiter.acquire();
        let state = self.limiter.snapshot();
        debug!(
            record_id = %record_id,
            window_ordinal = admission.ordinal,
            suspensions = admission.suspensions,
            calls_in_window = state.calls_in_window,
            window_remaining_ms = state.remaining_at(self.limiter.clock().now()).as_millis() as u64,
            "processing record"
        );

        match self.client.invoke(payload) {
            Ok(body) => {
                debug!(record_id = %record_id, "record processed");
                RecordOutcome::Success {
                    record_id,
                    model_input,
                    model_output: body,
                }
            }
            Err(e) => {
                warn!(record_id = %record_id, error = %e, "invocation failed");
                RecordOutcome::Failure {
                    record_id,
                    model_input,
                    error: e.into(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use batchinfer_core::{ManualClock, RateLimitPolicy};
    use serde_json::json;

    use crate::client::FnClient;

    fn limiter(quota: u32) -> Arc<RateLimiter<Arc<ManualClock>>> {
        Arc::new(RateLimiter::with_clock(
            RateLimitPolicy::new(quota, Duration::from_secs(60)),
            Arc::new(ManualClock::new()),
        ))
    }

    #[test]
    fn success_echoes_input_and_wraps_body() {
        let client = FnClient::new(|p| Ok(json!({ "echo": p })));
        let processor = RecordProcessor::new(client, limiter(5));

        let outcome = processor.process(&InputRecord::new("a", json!({"q": 1})));

        assert!(outcome.is_success());
        let out = outcome.into_output();
        assert_eq!(out.record_id, "a");
        assert_eq!(out.model_input, json!({"q": 1}));
        assert_eq!(out.model_output, json!({"echo": {"q": 1}}));
    }

    #[test]
    fn invocation_failure_becomes_error_data() {
        let client = FnClient::new(|_| Err(InvocationError::Throttled("slow down".to_string())));
        let processor = RecordProcessor::new(client, limiter(5));

        let out = processor
            .process(&InputRecord::new("b", json!({"q": 2})))
            .into_output();

        assert_eq!(out.record_id, "b");
        assert_eq!(
            out.model_output,
            json!({"error": "throttled by provider: slow down"})
        );
    }

    #[test]
    fn missing_input_fails_without_calling_client_or_spending_quota() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let client = FnClient::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(json!({}))
        });
        let limiter = limiter(5);
        let processor = RecordProcessor::new(client, limiter.clone());

        let record: InputRecord = serde_json::from_str(r#"{"recordId":"c"}"#).unwrap();
        let outcome = processor.process(&record);

        assert_eq!(
            outcome,
            RecordOutcome::Failure {
                record_id: "c".to_string(),
                model_input: json!({}),
                error: RecordError::MissingInput,
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(limiter.snapshot().calls_in_window, 0);
        assert_eq!(
            outcome.into_output().error_message(),
            Some("No model input found in the record.")
        );
    }
}
