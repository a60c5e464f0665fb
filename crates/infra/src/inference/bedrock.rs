use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value as JsonValue;
use tracing::trace;

use batchinfer_core::Credentials;
use batchinfer_engine::{InferenceClient, InvocationError};

use super::{ClientSetupError, authorize, http_client, send_json};

/// Model-invocation runtime client (`POST {endpoint}/model/{modelId}/invoke`).
///
/// The request body is the record's `modelInput` verbatim; the response body is
/// returned verbatim as the record's `modelOutput`.
#[derive(Debug, Clone)]
pub struct BedrockRuntimeClient {
    client: Client,
    invoke_url: Url,
    credentials: Credentials,
}

impl BedrockRuntimeClient {
    /// `endpoint` overrides the regional default
    /// `https://bedrock-runtime.{region}.amazonaws.com`.
    pub fn new(
        model_id: &str,
        region: &str,
        endpoint: Option<&str>,
        credentials: Credentials,
        timeout: Option<Duration>,
    ) -> Result<Self, ClientSetupError> {
        let base = match endpoint {
            Some(e) => e.to_string(),
            None => format!("https://bedrock-runtime.{region}.amazonaws.com"),
        };
        let invoke_url = invoke_url(&base, model_id)?;

        Ok(Self {
            client: http_client(timeout)?,
            invoke_url,
            credentials,
        })
    }

    pub fn invoke_url(&self) -> &Url {
        &self.invoke_url
    }
}

fn invoke_url(base: &str, model_id: &str) -> Result<Url, ClientSetupError> {
    let invalid = |reason: String| ClientSetupError::InvalidEndpoint {
        endpoint: base.to_string(),
        reason,
    };
    let mut url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| invalid("endpoint cannot be a base url".to_string()))?
        .pop_if_empty()
        .push("model")
        .push(model_id)
        .push("invoke");
    Ok(url)
}

impl InferenceClient for BedrockRuntimeClient {
    fn invoke(&self, payload: &JsonValue) -> Result<JsonValue, InvocationError> {
        trace!(url = %self.invoke_url, "invoking model");
        let req = self
            .client
            .post(self.invoke_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(payload);
        send_json(authorize(req, &self.credentials))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::inference::test_server::serve_once;

    #[test]
    fn regional_endpoint_is_derived_and_model_id_is_one_segment() {
        let client = BedrockRuntimeClient::new(
            "anthropic.claude-3-haiku-20240307-v1:0",
            "us-west-2",
            None,
            Credentials::Anonymous,
            None,
        )
        .unwrap();

        assert_eq!(
            client.invoke_url().as_str(),
            "https://bedrock-runtime.us-west-2.amazonaws.com/model/anthropic.claude-3-haiku-20240307-v1:0/invoke"
        );
    }

    #[test]
    fn model_ids_with_slashes_are_escaped() {
        let url = invoke_url("http://localhost:8080/", "arn:aws:bedrock:x/profile").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/model/arn:aws:bedrock:x%2Fprofile/invoke"
        );
    }

    #[test]
    fn posts_payload_with_bearer_and_returns_body() {
        let (base, server) = serve_once(200, r#"{"content":[{"type":"text","text":"hi"}]}"#);
        let client =
            BedrockRuntimeClient::new("m-1", "", Some(&base), Credentials::bearer("tok"), None)
                .unwrap();

        let body = client.invoke(&json!({"max_tokens": 8})).unwrap();
        let captured = server.join().unwrap();

        assert_eq!(body, json!({"content":[{"type":"text","text":"hi"}]}));
        assert_eq!(captured.request_line, "POST /model/m-1/invoke HTTP/1.1");
        assert_eq!(captured.header("authorization"), Some("Bearer tok"));
        assert_eq!(captured.body, r#"{"max_tokens":8}"#);
    }

    #[test]
    fn provider_rejection_maps_to_invocation_error() {
        let (base, server) = serve_once(400, r#"{"message":"malformed input request"}"#);
        let client =
            BedrockRuntimeClient::new("m-1", "", Some(&base), Credentials::Anonymous, None).unwrap();

        let err = client.invoke(&json!({"x": 1})).unwrap_err();
        server.join().unwrap();

        assert_eq!(
            err,
            InvocationError::InvalidRequest(r#"{"message":"malformed input request"}"#.to_string())
        );
    }

    #[test]
    fn non_json_success_body_is_malformed() {
        let (base, server) = serve_once(200, "not json");
        let client =
            BedrockRuntimeClient::new("m-1", "", Some(&base), Credentials::Anonymous, None).unwrap();

        let err = client.invoke(&json!({"x": 1})).unwrap_err();
        server.join().unwrap();

        assert!(matches!(err, InvocationError::MalformedResponse(_)));
    }
}
