use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{ClientConfig, PollConfig};
use crate::decode::{decode, DecodedImage};
use crate::error::{GenerateError, PollError, SubmissionError};
use crate::graph::RequestGraph;
use crate::poller::{Poller, StatusSource};
use crate::request::GenerationRequest;
use crate::types::{Job, JobId, JobOutcome, JobState, StatusReport};
use crate::workflow::{build_workflow, PipelineModels};

#[derive(Serialize)]
struct RunBody<'a> {
    input: RunInput<'a>,
}

#[derive(Serialize)]
struct RunInput<'a> {
    workflow: &'a RequestGraph,
}

/// Async client for a serverless ComfyUI endpoint.
///
/// Cheap to clone; clones share one connection pool. Holds no per-job
/// state, so concurrent generations through one client are independent.
///
/// # Example
/// ```no_run
/// use runpod_comfy::{ClientConfig, GenerationRequest, RunpodClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = RunpodClient::new(ClientConfig::from_env()?);
/// let request = GenerationRequest::new("a ceramic bowl on a wooden table").seed(42);
/// let image = client
///     .generate(&request, |state| println!("{}", state.label()))
///     .await?;
/// std::fs::write(format!("out.{}", image.extension()), &image.bytes)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RunpodClient {
    http: Client,
    config: ClientConfig,
    poller: Poller,
    models: PipelineModels,
}

impl RunpodClient {
    /// Create a client with the reference poll timing and models.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: Client::new(),
            config,
            poller: Poller::default(),
            models: PipelineModels::default(),
        }
    }

    /// Use a custom `reqwest::Client` (for connection pooling, proxies, TLS).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Override poll interval, retry delay and timeout.
    pub fn with_poll_config(mut self, config: PollConfig) -> Self {
        self.poller = Poller::new(config);
        self
    }

    /// Override the model files wired into generated workflows.
    pub fn with_models(mut self, models: PipelineModels) -> Self {
        self.models = models;
        self
    }

    /// Returns the configured endpoint base URL.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn poll_config(&self) -> &PollConfig {
        self.poller.config()
    }

    pub fn models(&self) -> &PipelineModels {
        &self.models
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.timeout(self.config.request_timeout);
        match &self.config.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    fn require_key(&self) -> Result<(), SubmissionError> {
        match &self.config.api_key {
            Some(key) if !key.is_empty() => Ok(()),
            _ => Err(SubmissionError::AuthMissing),
        }
    }

    fn transport(&self, what: &str, source: reqwest::Error) -> SubmissionError {
        SubmissionError::Transport {
            context: format!(
                "Cannot reach endpoint at {} while {} \u{2014} is it deployed?",
                self.config.base_url, what
            ),
            source,
        }
    }

    async fn reject_unless_success(resp: Response) -> Result<Response, SubmissionError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Err(SubmissionError::RemoteRejected { status, body })
    }

    // ── Health ──────────────────────────────────────────────────────

    /// Check whether the endpoint answers `/health` with a success status.
    pub async fn health(&self) -> Result<bool, SubmissionError> {
        self.require_key()?;
        let url = format!("{}/health", self.config.base_url);
        let resp = self
            .authorized(self.http.get(&url))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| self.transport("checking health", e))?;
        Ok(resp.status().is_success())
    }

    // ── Submission ──────────────────────────────────────────────────

    /// Submit a workflow to `/run`. Returns the local mirror of the queued job.
    pub async fn submit(&self, graph: &RequestGraph) -> Result<Job, SubmissionError> {
        self.require_key()?;

        let url = format!("{}/run", self.config.base_url);
        let body = RunBody {
            input: RunInput { workflow: graph },
        };

        let resp = self
            .authorized(self.http.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport("submitting a job", e))?;
        let resp = Self::reject_unless_success(resp).await?;

        let text = resp
            .text()
            .await
            .map_err(|e| self.transport("reading the submission reply", e))?;
        let json: Value = serde_json::from_str(&text)
            .map_err(|e| SubmissionError::MalformedResponse(format!("body is not JSON: {}", e)))?;

        let id = json
            .get("id")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SubmissionError::MalformedResponse("No job ID in response".into()))?;

        info!(job_id = %id, "Job submitted");
        Ok(Job::submitted(JobId(id.to_string())))
    }

    // ── Status ──────────────────────────────────────────────────────

    /// Query `/status/{id}` once.
    pub async fn status(&self, id: &JobId) -> Result<StatusReport, PollError> {
        let url = format!("{}/status/{}", self.config.base_url, id);
        let resp = self.authorized(self.http.get(&url)).send().await?;

        if !resp.status().is_success() {
            return Err(PollError::Http {
                status: resp.status().as_u16(),
            });
        }

        let text = resp.text().await?;
        let report: StatusReport =
            serde_json::from_str(&text).map_err(|e| PollError::Malformed(e.to_string()))?;
        debug!(job_id = %id, status = %report.status, "Status received");
        Ok(report)
    }

    // ── Control ─────────────────────────────────────────────────────

    /// Ask the endpoint to cancel a job. Never called implicitly.
    pub async fn cancel(&self, id: &JobId) -> Result<(), SubmissionError> {
        self.require_key()?;
        let url = format!("{}/cancel/{}", self.config.base_url, id);
        let resp = self
            .authorized(self.http.post(&url))
            .send()
            .await
            .map_err(|e| self.transport("cancelling a job", e))?;
        Self::reject_unless_success(resp).await?;
        info!(job_id = %id, "Cancellation requested");
        Ok(())
    }

    // ── Completion waiting ──────────────────────────────────────────

    /// Poll until `job` finishes or the configured timeout passes.
    pub async fn wait<F>(&self, job: &mut Job, on_transition: F) -> JobOutcome
    where
        F: FnMut(JobState) + Send,
    {
        self.poller.wait(self, job, on_transition).await
    }

    /// Build, submit, wait and decode in one call.
    ///
    /// The request is expected to be validated by the caller. On timeout
    /// the remote job is left running.
    pub async fn generate<F>(
        &self,
        request: &GenerationRequest,
        on_transition: F,
    ) -> Result<DecodedImage, GenerateError>
    where
        F: FnMut(JobState) + Send,
    {
        let graph = build_workflow(request, &self.models);
        let mut job = self.submit(&graph).await?;
        drop(graph);

        match self.wait(&mut job, on_transition).await {
            JobOutcome::Completed(envelope) => Ok(decode(&envelope)?),
            JobOutcome::Failed(reason) => Err(GenerateError::Failed(reason)),
            JobOutcome::Cancelled(reason) => Err(GenerateError::Cancelled(reason)),
            JobOutcome::TimedOut => Err(GenerateError::TimedOut {
                after: self.poller.config().timeout,
            }),
        }
    }
}

#[async_trait]
impl StatusSource for RunpodClient {
    async fn fetch_status(&self, id: &JobId) -> Result<StatusReport, PollError> {
        self.status(id).await
    }
}
