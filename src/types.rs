use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;

/// Opaque job identifier assigned by the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a job as observed by the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    /// Map a remote status string. `None` for statuses this client does not know.
    pub fn from_remote(status: &str) -> Option<Self> {
        match status {
            "IN_QUEUE" => Some(Self::Queued),
            "IN_PROGRESS" => Some(Self::Running),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" | "TIMED_OUT" => Some(Self::Failed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Rough completion fraction for a progress bar.
    pub fn progress(&self) -> f32 {
        match self {
            Self::Queued => 0.2,
            Self::Running => 0.6,
            Self::Completed | Self::Failed | Self::Cancelled => 1.0,
        }
    }

    /// Short human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Queued => "Job is queued...",
            Self::Running => "Generating image...",
            Self::Completed => "Processing completed!",
            Self::Failed => "Job failed",
            Self::Cancelled => "Job cancelled",
        }
    }
}

/// Local mirror of a submitted job.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub state: JobState,
    /// Present only once the job has completed.
    pub output: Option<Value>,
    /// Deadline origin for the poller.
    pub submitted_at: Instant,
}

impl Job {
    /// A freshly submitted job, implicitly queued.
    pub fn submitted(id: JobId) -> Self {
        Self {
            id,
            state: JobState::Queued,
            output: None,
            submitted_at: Instant::now(),
        }
    }
}

/// Parsed body of a successful status query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusReport {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl StatusReport {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            ..Default::default()
        }
    }

    pub fn with_output(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(Value::String(error.into()));
        self
    }

    /// The remote's error detail, or a placeholder when it gave none.
    pub fn error_reason(&self) -> String {
        match &self.error {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::Null) | None => "Unknown error".to_string(),
            Some(Value::String(_)) => "Unknown error".to_string(),
            Some(other) => other.to_string(),
        }
    }
}

/// How a poll loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// The job completed; carries the raw `output` envelope.
    Completed(Value),
    Failed(String),
    Cancelled(String),
    /// The local deadline passed. The remote job may still finish unobserved.
    TimedOut,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_remote_status_mapping() {
        assert_eq!(JobState::from_remote("IN_QUEUE"), Some(JobState::Queued));
        assert_eq!(JobState::from_remote("IN_PROGRESS"), Some(JobState::Running));
        assert_eq!(JobState::from_remote("COMPLETED"), Some(JobState::Completed));
        assert_eq!(JobState::from_remote("FAILED"), Some(JobState::Failed));
        assert_eq!(JobState::from_remote("TIMED_OUT"), Some(JobState::Failed));
        assert_eq!(JobState::from_remote("CANCELLED"), Some(JobState::Cancelled));
        assert_eq!(JobState::from_remote("in_queue"), None);
        assert_eq!(JobState::from_remote(""), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
    }

    #[test]
    fn test_parse_status_response() {
        let report: StatusReport = serde_json::from_str(
            r#"{
            "id": "sync-123",
            "status": "COMPLETED",
            "delayTime": 812,
            "executionTime": 20431,
            "output": {"message": "aGVsbG8=", "status": "success"}
        }"#,
        )
        .unwrap();
        assert_eq!(report.status, "COMPLETED");
        assert_eq!(report.output.unwrap()["message"], "aGVsbG8=");
        assert!(report.error.is_none());
    }

    #[test]
    fn test_error_reason_placeholder() {
        assert_eq!(StatusReport::new("FAILED").error_reason(), "Unknown error");
        assert_eq!(
            StatusReport::new("FAILED").with_error("CUDA out of memory").error_reason(),
            "CUDA out of memory"
        );
        let structured = StatusReport {
            error: Some(json!({"type": "oom"})),
            ..StatusReport::new("FAILED")
        };
        assert_eq!(structured.error_reason(), r#"{"type":"oom"}"#);
    }

    #[test]
    fn test_job_starts_queued() {
        let job = Job::submitted(JobId("abc".into()));
        assert_eq!(job.state, JobState::Queued);
        assert!(job.output.is_none());
        assert_eq!(job.id.to_string(), "abc");
    }

    #[test]
    fn test_job_id_is_transparent() {
        let id: JobId = serde_json::from_str(r#""job-1""#).unwrap();
        assert_eq!(id.as_str(), "job-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""job-1""#);
    }
}
