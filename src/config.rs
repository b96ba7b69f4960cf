use std::env;
use std::time::Duration;

use crate::error::ConfigError;

/// Root of RunPod's serverless v2 API. Endpoint ids are appended to it.
pub const DEFAULT_API_ROOT: &str = "https://api.runpod.ai/v2";

/// Resolutions offered by the reference deployment (multiples of 64).
pub const REFERENCE_RESOLUTIONS: [u32; 9] = [512, 576, 640, 704, 768, 832, 896, 960, 1024];

/// Width of the remote adapter-stack node.
pub const DEFAULT_SLOT_COUNT: usize = 4;

fn normalize(endpoint: String) -> String {
    endpoint.trim_end_matches('/').to_string()
}

/// Connection settings for [`RunpodClient`](crate::RunpodClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Endpoint base URL, e.g. `https://api.runpod.ai/v2/<endpoint-id>`.
    pub base_url: String,
    /// Bearer token. `None` makes every submission fail with `AuthMissing`.
    pub api_key: Option<String>,
    /// Per-HTTP-request timeout (default: 30s).
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Create a config pointing at the given endpoint base URL, without credentials.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize(base_url.into()),
            api_key: None,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Create a config for a RunPod endpoint id.
    pub fn for_endpoint(endpoint_id: &str) -> Self {
        Self::new(format!("{}/{}", DEFAULT_API_ROOT, endpoint_id))
    }

    /// Load settings from the process environment, reading `.env` first if present.
    ///
    /// - `RUNPOD_API_BASE` overrides the full base URL
    /// - otherwise `RUNPOD_ENDPOINT_ID` is appended to [`DEFAULT_API_ROOT`]
    /// - `RUNPOD_API_KEY` is optional here; its absence surfaces at submit time
    /// - `RUNPOD_REQUEST_TIMEOUT_SECS` optionally overrides the request timeout
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env");
        }

        let mut config = match (non_empty("RUNPOD_API_BASE"), non_empty("RUNPOD_ENDPOINT_ID")) {
            (Some(base), _) => Self::new(base),
            (None, Some(id)) => Self::for_endpoint(&id),
            (None, None) => return Err(ConfigError::MissingEndpoint),
        };

        config.api_key = non_empty("RUNPOD_API_KEY");

        if let Some(raw) = non_empty("RUNPOD_REQUEST_TIMEOUT_SECS") {
            let secs = parse_secs("RUNPOD_REQUEST_TIMEOUT_SECS", &raw)?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Set the bearer token.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the per-request HTTP timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Timing of the status polling loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between successful status queries (default: 4s).
    pub poll_interval: Duration,
    /// Delay after a failed status query before retrying (default: 4s).
    pub retry_delay: Duration,
    /// Wall-clock budget measured from submission (default: 300s).
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(4),
            retry_delay: Duration::from_secs(4),
            timeout: Duration::from_secs(300),
        }
    }
}

impl PollConfig {
    /// Start building a config with the builder pattern.
    pub fn builder() -> PollConfigBuilder {
        PollConfigBuilder::default()
    }
}

/// Builder for [`PollConfig`].
#[derive(Default)]
pub struct PollConfigBuilder {
    config: PollConfig,
}

impl PollConfigBuilder {
    /// Set the delay between status queries.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Set the delay applied after a failed status query.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    /// Set the overall deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Build the final [`PollConfig`].
    pub fn build(self) -> PollConfig {
        self.config
    }
}

/// Bounds a [`GenerationRequest`](crate::GenerationRequest) is validated against.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestLimits {
    /// Number of adapter slots every request carries (2 or 4).
    pub slot_count: usize,
    /// Allowed values for both width and height.
    pub resolutions: Vec<u32>,
    pub min_steps: u32,
    pub max_steps: u32,
    pub min_strength: f64,
    pub max_strength: f64,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            slot_count: DEFAULT_SLOT_COUNT,
            resolutions: REFERENCE_RESOLUTIONS.to_vec(),
            min_steps: 1,
            max_steps: 100,
            min_strength: 0.0,
            max_strength: 2.0,
        }
    }
}

impl RequestLimits {
    /// Set the adapter slot count.
    pub fn with_slot_count(mut self, count: usize) -> Self {
        self.slot_count = count;
        self
    }

    /// Replace the allowed resolution set.
    pub fn with_resolutions(mut self, resolutions: impl IntoIterator<Item = u32>) -> Self {
        self.resolutions = resolutions.into_iter().collect();
        self
    }

    /// Set inclusive step bounds.
    pub fn with_steps(mut self, min: u32, max: u32) -> Self {
        self.min_steps = min;
        self.max_steps = max;
        self
    }

    /// Set inclusive adapter strength bounds.
    pub fn with_strength(mut self, min: f64, max: f64) -> Self {
        self.min_strength = min;
        self.max_strength = max;
        self
    }

    pub fn allows_resolution(&self, value: u32) -> bool {
        self.resolutions.contains(&value)
    }
}

fn non_empty(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn parse_secs(var: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|e| ConfigError::Invalid {
        var: var.to_string(),
        reason: format!("{}", e),
    })
}
