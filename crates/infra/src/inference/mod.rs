//! HTTP inference clients.
//!
//! Each client performs exactly one request per `invoke` and maps the outcome
//! onto [`InvocationError`]. Retrying is left to the caller.

pub mod bedrock;
pub mod workflow;

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde_json::Value as JsonValue;
use thiserror::Error;

use batchinfer_core::{Credentials, InferenceTarget, JobConfig};
use batchinfer_engine::{InferenceClient, InvocationError};

pub use bedrock::BedrockRuntimeClient;
pub use workflow::WorkflowClient;

/// Longest slice of an error body kept in an error message.
const MAX_ERROR_BODY: usize = 2048;

#[derive(Debug, Error)]
pub enum ClientSetupError {
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("failed to build http client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Build the client for a job's inference target.
pub fn client_for(config: &JobConfig) -> Result<Box<dyn InferenceClient>, ClientSetupError> {
    let timeout = config.request_timeout;
    match &config.target {
        InferenceTarget::Model {
            model_id,
            region,
            endpoint,
            credentials,
        } => {
            let client = BedrockRuntimeClient::new(
                model_id,
                region,
                endpoint.as_deref(),
                credentials.clone(),
                timeout,
            )?;
            Ok(Box::new(client))
        }
        InferenceTarget::Workflow { url, credentials } => {
            let client = WorkflowClient::new(url, credentials.clone(), timeout)?;
            Ok(Box::new(client))
        }
    }
}

fn http_client(timeout: Option<Duration>) -> Result<Client, ClientSetupError> {
    // reqwest's blocking client defaults to a 30s timeout; `None` means no bound.
    let client = Client::builder().timeout(timeout).build()?;
    Ok(client)
}

fn authorize(req: RequestBuilder, credentials: &Credentials) -> RequestBuilder {
    match credentials.token() {
        Some(token) => req.bearer_auth(token),
        None => req,
    }
}

/// Send one JSON request and decode the JSON response body.
fn send_json(req: RequestBuilder) -> Result<JsonValue, InvocationError> {
    let resp = req.send().map_err(classify)?;
    let status = resp.status();
    let body = resp.bytes().map_err(classify)?;

    if !status.is_success() {
        let text = String::from_utf8_lossy(&body);
        let text = truncate_chars(&text, MAX_ERROR_BODY);
        return Err(InvocationError::from_status(status.as_u16(), text));
    }

    serde_json::from_slice(&body).map_err(|e| InvocationError::MalformedResponse(e.to_string()))
}

fn classify(e: reqwest::Error) -> InvocationError {
    if e.is_timeout() {
        InvocationError::Timeout(e.to_string())
    } else {
        InvocationError::Transport(e.to_string())
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}


#[cfg(test)]
mod tests {
    use super::*;
    use batchinfer_core::RateLimitPolicy;

    #[test]
    fn client_for_builds_both_target_kinds() {
        let model = JobConfig::new(
            InferenceTarget::Model {
                model_id: "m".to_string(),
                region: "us-east-1".to_string(),
                endpoint: None,
                credentials: Credentials::Anonymous,
            },
            10,
            vec!["a.jsonl".to_string()],
            "out/",
        );
        let workflow = JobConfig::new(
            InferenceTarget::Workflow {
                url: "http://127.0.0.1:1/v1/workflows/run".to_string(),
                credentials: Credentials::bearer("k"),
            },
            10,
            vec!["a.jsonl".to_string()],
            "out/",
        )
        .with_rate_limit(RateLimitPolicy::per_minute(5));

        assert!(client_for(&model).is_ok());
        assert!(client_for(&workflow).is_ok());
    }

    #[test]
    fn unreachable_host_is_a_transport_error() {
        let client = http_client(Some(Duration::from_secs(2))).unwrap();
        let err = send_json(client.post("http://127.0.0.1:1/invoke").body("{}")).unwrap_err();
        assert!(matches!(
            err,
            InvocationError::Transport(_) | InvocationError::Timeout(_)
        ));
    }
}
