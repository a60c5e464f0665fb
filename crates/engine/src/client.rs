use std::sync::Arc;

use serde_json::Value as JsonValue;
use thiserror::Error;

/// One outbound call to a model-invocation service.
///
/// Implementations perform exactly one network call per `invoke` and never retry;
/// retry policy belongs to the caller.
pub trait InferenceClient: Send + Sync {
    fn invoke(&self, payload: &JsonValue) -> Result<JsonValue, InvocationError>;
}

impl<C: InferenceClient + ?Sized> InferenceClient for Arc<C> {
    fn invoke(&self, payload: &JsonValue) -> Result<JsonValue, InvocationError> {
        (**self).invoke(payload)
    }
}

impl<C: InferenceClient + ?Sized> InferenceClient for Box<C> {
    fn invoke(&self, payload: &JsonValue) -> Result<JsonValue, InvocationError> {
        (**self).invoke(payload)
    }
}

/// Adapts a closure into a client (stubs, fixtures, local models).
pub struct FnClient<F>(pub F);

impl<F> FnClient<F>
where
    F: Fn(&JsonValue) -> Result<JsonValue, InvocationError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> InferenceClient for FnClient<F>
where
    F: Fn(&JsonValue) -> Result<JsonValue, InvocationError> + Send + Sync,
{
    fn invoke(&self, payload: &JsonValue) -> Result<JsonValue, InvocationError> {
        (self.0)(payload)
    }
}

/// Why a single invocation failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvocationError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("throttled by provider: {0}")]
    Throttled(String),

    #[error("provider rejected request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl InvocationError {
    /// Map a non-success HTTP status and body to the matching variant.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let message = body.into();
        match status {
            401 | 403 => Self::Unauthorized(message),
            400 | 404 | 413 | 422 => Self::InvalidRequest(message),
            408 => Self::Timeout(message),
            429 => Self::Throttled(message),
            _ => Self::Rejected { status, message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_codes_map_to_variants() {
        assert!(matches!(InvocationError::from_status(403, "no"), InvocationError::Unauthorized(_)));
        assert!(matches!(InvocationError::from_status(400, "bad"), InvocationError::InvalidRequest(_)));
        assert!(matches!(InvocationError::from_status(429, "slow"), InvocationError::Throttled(_)));
        assert_eq!(
            InvocationError::from_status(503, "down"),
            InvocationError::Rejected { status: 503, message: "down".to_string() }
        );
    }

    #[test]
    fn closures_and_shared_clients_are_clients() {
        let client = Arc::new(FnClient::new(|p| Ok(json!({ "echo": p }))));
        let boxed: Box<dyn InferenceClient> = Box::new(client.clone());

        assert_eq!(client.invoke(&json!(1)).unwrap(), json!({"echo": 1}));
        assert_eq!(boxed.invoke(&json!("x")).unwrap(), json!({"echo": "x"}));
    }
}
