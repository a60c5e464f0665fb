use std::time::Duration;

use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::Client;

use batchinfer_core::Credentials;

use super::{ObjectStore, ObjectStoreError, ObjectUri};

/// S3-compatible object store spoken over plain HTTP (path-style addressing).
///
/// `s3://bucket/key` maps to `{endpoint}/bucket/key`. Requests carry an optional
/// bearer token, which suits gateways and presigning proxies in front of a bucket.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    endpoint: Url,
    client: Client,
    credentials: Credentials,
}

impl HttpObjectStore {
    pub fn new(endpoint: &str, credentials: Credentials) -> Result<Self, ObjectStoreError> {
        let endpoint = Url::parse(endpoint).map_err(|e| ObjectStoreError::InvalidUri {
            uri: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| ObjectStoreError::Transport {
                uri: endpoint.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            endpoint,
            client,
            credentials,
        })
    }

    fn url_for(&self, uri: &ObjectUri) -> Result<Url, ObjectStoreError> {
        let ObjectUri::Bucket { bucket, key } = uri else {
            return Err(ObjectStoreError::Unsupported(format!(
                "http store only addresses bucket uris, got {uri}"
            )));
        };

        let mut url = self.endpoint.clone();
        {
            let mut segs = url.path_segments_mut().map_err(|_| ObjectStoreError::InvalidUri {
                uri: self.endpoint.to_string(),
                reason: "endpoint cannot be a base url".to_string(),
            })?;
            segs.pop_if_empty().push(bucket);
            for seg in key.split('/').filter(|s| !s.is_empty()) {
                segs.push(seg);
            }
        }
        Ok(url)
    }

    fn authorize(
        &self,
        req: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        match self.credentials.token() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

fn transport(uri: &ObjectUri, e: reqwest::Error) -> ObjectStoreError {
    ObjectStoreError::Transport {
        uri: uri.to_string(),
        message: e.to_string(),
    }
}

fn check(uri: &ObjectUri, resp: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, ObjectStoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(ObjectStoreError::NotFound(uri.to_string()));
    }
    let message = resp.text().unwrap_or_default();
    Err(ObjectStoreError::Http {
        uri: uri.to_string(),
        status: status.as_u16(),
        message,
    })
}

impl ObjectStore for HttpObjectStore {
    fn get(&self, uri: &ObjectUri) -> Result<Vec<u8>, ObjectStoreError> {
        let url = self.url_for(uri)?;
        let resp = self
            .authorize(self.client.get(url))
            .send()
            .map_err(|e| transport(uri, e))?;
        let body = check(uri, resp)?.bytes().map_err(|e| transport(uri, e))?;
        Ok(body.to_vec())
    }

    fn put(&self, uri: &ObjectUri, body: &[u8]) -> Result<(), ObjectStoreError> {
        let url = self.url_for(uri)?;
        let resp = self
            .authorize(self.client.put(url))
            .body(body.to_vec())
            .send()
            .map_err(|e| transport(uri, e))?;
        check(uri, resp)?;
        Ok(())
    }
}
