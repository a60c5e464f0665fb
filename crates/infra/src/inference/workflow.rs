use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use serde_json::{Value as JsonValue, json};

use batchinfer_core::Credentials;
use batchinfer_engine::{InferenceClient, InvocationError};

use super::{ClientSetupError, authorize, http_client, send_json};

const DEFAULT_USER: &str = "batch-inference";

/// Hosted workflow runner: each record's payload becomes the workflow `inputs`,
/// run in blocking mode. The full response body is the record's output.
#[derive(Debug, Clone)]
pub struct WorkflowClient {
    client: Client,
    url: Url,
    credentials: Credentials,
    user: String,
}

impl WorkflowClient {
    pub fn new(
        url: &str,
        credentials: Credentials,
        timeout: Option<Duration>,
    ) -> Result<Self, ClientSetupError> {
        let url = Url::parse(url).map_err(|e| ClientSetupError::InvalidEndpoint {
            endpoint: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            client: http_client(timeout)?,
            url,
            credentials,
            user: DEFAULT_USER.to_string(),
        })
    }

    /// End-user tag the workflow service attributes runs to.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }
}

impl InferenceClient for WorkflowClient {
    fn invoke(&self, payload: &JsonValue) -> Result<JsonValue, InvocationError> {
        let body = json!({
            "inputs": payload,
            "response_mode": "blocking",
            "user": self.user,
        });
        let req = self.client.post(self.url.clone()).json(&body);
        send_json(authorize(req, &self.credentials))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::inference::test_server::serve_once;

    #[test]
    fn wraps_payload_as_blocking_workflow_inputs() {
        let (base, server) = serve_once(200, r#"{"data":{"outputs":{"answer":"ok"}}}"#);
        let client = WorkflowClient::new(
            &format!("{base}/v1/workflows/run"),
            Credentials::bearer("app-key"),
            Some(Duration::from_secs(5)),
        )
        .unwrap()
        .with_user("tester");

        let out = client.invoke(&json!({"query": "hello"})).unwrap();
        let captured = server.join().unwrap();

        assert_eq!(out["data"]["outputs"]["answer"], json!("ok"));
        assert_eq!(captured.request_line, "POST /v1/workflows/run HTTP/1.1");
        assert_eq!(captured.header("authorization"), Some("Bearer app-key"));
        let sent: JsonValue = serde_json::from_str(&captured.body).unwrap();
        assert_eq!(
            sent,
            json!({"inputs": {"query": "hello"}, "response_mode": "blocking", "user": "tester"})
        );
    }

    #[test]
    fn unauthorized_maps_to_invocation_error() {
        let (base, server) = serve_once(401, r#"{"code":"unauthorized"}"#);
        let client = WorkflowClient::new(&base, Credentials::Anonymous, None).unwrap();

        let err = client.invoke(&json!({"q": 1})).unwrap_err();
        server.join().unwrap();

        assert!(matches!(err, InvocationError::Unauthorized(_)));
    }

    #[test]
    fn invalid_url_is_rejected_at_construction() {
        assert!(WorkflowClient::new("::nope::", Credentials::Anonymous, None).is_err());
    }
}
