//! Job configuration handed to the engine by the launcher.

use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Opaque credential forwarded to the inference client.
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Credentials {
    #[default]
    Anonymous,
    Bearer(String),
}

impl Credentials {
    /// Empty tokens collapse to `Anonymous`.
    pub fn bearer(token: impl Into<String>) -> Self {
        let token = token.into();
        if token.trim().is_empty() {
            Self::Anonymous
        } else {
            Self::Bearer(token)
        }
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            Credentials::Anonymous => None,
            Credentials::Bearer(t) => Some(t),
        }
    }
}

impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Credentials::Anonymous => f.write_str("Anonymous"),
            Credentials::Bearer(_) => f.write_str("Bearer(<redacted>)"),
        }
    }
}

/// Which external service a job talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceTarget {
    /// A hosted model invoked by id (one request body in, one response body out).
    Model {
        model_id: String,
        region: String,
        /// Overrides the regional endpoint derived from `region`.
        endpoint: Option<String>,
        credentials: Credentials,
    },
    /// A hosted workflow run in blocking mode with the record payload as its inputs.
    Workflow { url: String, credentials: Credentials },
}

impl InferenceTarget {
    /// Human-readable identity used in logs.
    pub fn identity(&self) -> &str {
        match self {
            InferenceTarget::Model { model_id, .. } => model_id,
            InferenceTarget::Workflow { url, .. } => url,
        }
    }
}

/// Fixed-window admission policy: at most `quota` calls per `window`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub quota: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub fn new(quota: u32, window: Duration) -> Self {
        Self { quota, window }
    }

    pub fn per_minute(requests_per_minute: u32) -> Self {
        Self::new(requests_per_minute, Duration::from_secs(60))
    }
}

/// Everything one run needs. Constructed by the launcher, never mutated by the engine.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub target: InferenceTarget,
    pub rate_limit: RateLimitPolicy,
    pub max_workers: usize,
    pub input_uris: Vec<String>,
    pub output_prefix: String,
    /// Upper bound for a single outbound call; `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl JobConfig {
    pub fn new(
        target: InferenceTarget,
        requests_per_minute: u32,
        input_uris: Vec<String>,
        output_prefix: impl Into<String>,
    ) -> Self {
        Self {
            target,
            rate_limit: RateLimitPolicy::per_minute(requests_per_minute),
            max_workers: 10,
            input_uris,
            output_prefix: output_prefix.into(),
            request_timeout: None,
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn with_rate_limit(mut self, policy: RateLimitPolicy) -> Self {
        self.rate_limit = policy;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Boundary check run by the launcher before handing the config to the driver.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.rate_limit.quota == 0 {
            return Err(ConfigError::invalid("requests per window must be >= 1"));
        }
        if self.rate_limit.window.is_zero() {
            return Err(ConfigError::invalid("rate limit window must be > 0"));
        }
        if self.max_workers == 0 {
            return Err(ConfigError::invalid("max_workers must be >= 1"));
        }
        if self.input_uris.iter().all(|u| u.trim().is_empty()) {
            return Err(ConfigError::missing("input uri list"));
        }
        if self.output_prefix.trim().is_empty() {
            return Err(ConfigError::missing("output prefix"));
        }
        match &self.target {
            InferenceTarget::Model { model_id, region, endpoint, .. } => {
                if model_id.trim().is_empty() {
                    return Err(ConfigError::missing("model id"));
                }
                if region.trim().is_empty() && endpoint.is_none() {
                    return Err(ConfigError::missing("region or endpoint"));
                }
            }
            InferenceTarget::Workflow { url, .. } => {
                if url.trim().is_empty() {
                    return Err(ConfigError::missing("workflow url"));
                }
            }
        }
        Ok(())
    }
}
