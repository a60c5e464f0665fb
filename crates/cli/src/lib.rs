//! `batchinfer-cli`: launcher boundary.
//!
//! Turns command-line arguments (and secret-bearing environment variables) into
//! a validated [`JobConfig`], an object store and an inference client, then hands
//! them to the job driver.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::info;

use batchinfer_core::{ConfigError, Credentials, InferenceTarget, JobConfig};
use batchinfer_infra::inference::client_for;
use batchinfer_infra::{
    HttpObjectStore, JobDriver, JobReport, LocalObjectStore, ObjectStore, ObjectStoreError,
};
use batchinfer_observability::LogFormat;

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// Local filesystem; `s3://` uris are mirrored under `--store-root`.
    Local,
    /// S3-compatible HTTP endpoint (`--store-endpoint`).
    Http,
}

/// Rate-limited batch inference over line-delimited JSON datasets.
#[derive(Debug, Parser)]
#[command(name = "batchinfer", version, about)]
pub struct Args {
    /// Comma-separated input dataset uris (`.jsonl`), processed in order.
    #[arg(long = "input-uri-list", value_delimiter = ',', required = true)]
    pub input_uri_list: Vec<String>,

    /// Output prefix; each result lands at `<prefix>/<input name>.out`.
    #[arg(long = "output-uri")]
    pub output_uri: String,

    /// Model identity to invoke.
    #[arg(long, required_unless_present = "workflow_url")]
    pub model_id: Option<String>,

    /// Requests per minute, shared by all workers.
    #[arg(long)]
    pub rpm: u32,

    /// Concurrent workers per file.
    #[arg(long = "max-worker", visible_alias = "max-workers", default_value_t = 10)]
    pub max_workers: usize,

    #[arg(long, env = "AWS_REGION", default_value = "")]
    pub region: String,

    /// Overrides the regional model endpoint.
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Bearer credential for the model endpoint.
    #[arg(long, env = "BATCHINFER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Run a hosted workflow per record instead of invoking a model.
    #[arg(long, conflicts_with = "model_id")]
    pub workflow_url: Option<String>,

    #[arg(long, env = "BATCHINFER_WORKFLOW_KEY", hide_env_values = true)]
    pub workflow_key: Option<String>,

    /// Upper bound for one outbound call.
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,

    #[arg(long, value_enum, default_value_t = StoreKind::Local)]
    pub store: StoreKind,

    #[arg(long, default_value = ".")]
    pub store_root: PathBuf,

    #[arg(long, required_if_eq("store", "http"))]
    pub store_endpoint: Option<String>,

    #[arg(long, env = "BATCHINFER_STORE_TOKEN", hide_env_values = true)]
    pub store_token: Option<String>,

    /// `json` or `pretty`.
    #[arg(long, default_value = "json")]
    pub log_format: LogFormat,
}

impl Args {
    pub fn job_config(&self) -> Result<JobConfig, ConfigError> {
        let target = match (&self.workflow_url, &self.model_id) {
            (Some(url), _) => InferenceTarget::Workflow {
                url: url.clone(),
                credentials: secret(&self.workflow_key),
            },
            (None, Some(model_id)) => InferenceTarget::Model {
                model_id: model_id.clone(),
                region: self.region.clone(),
                endpoint: self.endpoint.clone(),
                credentials: secret(&self.api_key),
            },
            (None, None) => return Err(ConfigError::missing("model id or workflow url")),
        };

        let mut config = JobConfig::new(
            target,
            self.rpm,
            self.input_uri_list.clone(),
            self.output_uri.clone(),
        )
        .with_max_workers(self.max_workers);
        if let Some(secs) = self.request_timeout_secs {
            config = config.with_request_timeout(Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn object_store(&self) -> Result<Box<dyn ObjectStore>, ObjectStoreError> {
        match self.store {
            StoreKind::Local => Ok(Box::new(LocalObjectStore::new(&self.store_root))),
            StoreKind::Http => {
                let endpoint = self.store_endpoint.as_deref().ok_or_else(|| {
                    ObjectStoreError::Unsupported("http store needs --store-endpoint".to_string())
                })?;
                Ok(Box::new(HttpObjectStore::new(endpoint, secret(&self.store_token))?))
            }
        }
    }
}

fn secret(value: &Option<String>) -> Credentials {
    value.as_deref().map(Credentials::bearer).unwrap_or_default()
}

/// Run one job to completion, stopping at the first file-level failure.
pub fn run(args: &Args, config: &JobConfig) -> anyhow::Result<JobReport> {
    info!(
        inference_target = config.target.identity(),
        files = config.input_uris.len(),
        rpm = config.rate_limit.quota,
        max_workers = config.max_workers,
        "starting batch inference"
    );

    let client = client_for(config).context("failed to build inference client")?;
    let store = args.object_store().context("failed to open object store")?;
    let driver = JobDriver::for_config(store, client, config);

    let report = driver.run(&config.input_uris, &config.output_prefix)?;
    Ok(report)
}
