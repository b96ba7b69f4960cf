use std::time::Duration;

use thiserror::Error;

/// Errors returned when submitting (or cancelling) a job.
#[derive(Error, Debug)]
pub enum SubmissionError {
    /// No API key is configured. Checked before any network call.
    #[error("No API key configured \u{2014} set RUNPOD_API_KEY")]
    AuthMissing,

    /// Network-level request failure with context.
    #[error("{context}: {source}")]
    Transport {
        context: String,
        source: reqwest::Error,
    },

    /// The endpoint answered with a client or server error status.
    #[error("Endpoint rejected the request with HTTP {status}: {body}")]
    RemoteRejected { status: u16, body: String },

    /// The endpoint answered successfully but broke the response contract.
    #[error("Malformed response from endpoint: {0}")]
    MalformedResponse(String),
}

/// A failed status query. Always treated as transient by the poller.
#[derive(Error, Debug)]
pub enum PollError {
    #[error("Status query failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Status query returned HTTP {status}")]
    Http { status: u16 },

    #[error("Status response was not understood: {0}")]
    Malformed(String),
}

/// Errors extracting an image from a completed job's output.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The output envelope is not an object carrying a string `message`.
    #[error("Unexpected output format: {0}")]
    MissingField(String),

    /// The payload is not valid base64 or not a readable image.
    #[error("Error decoding image: {0}")]
    BadEncoding(String),
}

/// A generation request that falls outside the configured limits.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Prompt must not be empty")]
    EmptyPrompt,

    #[error("Unsupported resolution {width}x{height}")]
    Resolution { width: u32, height: u32 },

    #[error("Steps must be between {min} and {max}, got {got}")]
    Steps { min: u32, max: u32, got: u32 },

    #[error("Guidance scale must be a finite number")]
    Guidance,

    #[error("Adapter slot {slot} strength {got} is outside {min}..={max}")]
    Strength {
        slot: usize,
        got: f64,
        min: f64,
        max: f64,
    },

    #[error("Unknown style adapter '{0}'")]
    UnknownAdapter(String),

    #[error("Adapter slot {slot} is disabled but has strength {got}")]
    DisabledSlotStrength { slot: usize, got: f64 },

    #[error("Request has {got} adapter slots, deployment expects {expected}")]
    SlotCount { expected: usize, got: usize },
}

/// A request graph that violates its structural invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Node {node} input '{input}' references missing node {target}")]
    DanglingLink {
        node: String,
        input: String,
        target: String,
    },

    #[error("Cycle detected through node {0}")]
    Cycle(String),
}

/// Configuration could not be assembled from the environment.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Neither RUNPOD_API_BASE nor RUNPOD_ENDPOINT_ID is set")]
    MissingEndpoint,

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Terminal failure of the whole generate flow, suitable for showing to a user.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error("Job failed: {0}")]
    Failed(String),

    #[error("Job cancelled: {0}")]
    Cancelled(String),

    #[error("Job timed out after {} seconds", .after.as_secs())]
    TimedOut { after: Duration },

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Convenience alias.
pub type Result<T, E = GenerateError> = std::result::Result<T, E>;
