use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::PollConfig;
use crate::error::PollError;
use crate::types::{Job, JobId, JobOutcome, JobState, StatusReport};

/// Anything that can report a job's remote status.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, id: &JobId) -> Result<StatusReport, PollError>;
}

/// Drives a submitted job to a terminal outcome.
///
/// Queries the source, sleeps `poll_interval` between answers and
/// `retry_delay` after failed queries, and gives up with
/// [`JobOutcome::TimedOut`] once `timeout` has elapsed since submission.
/// Failed queries never end the loop on their own. Nothing is sent to the
/// remote when the loop gives up.
#[derive(Debug, Clone, Default)]
pub struct Poller {
    config: PollConfig,
}

impl Poller {
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Poll until `job` reaches a terminal state or the deadline passes.
    ///
    /// `on_transition` is called once for every distinct new state, in order.
    /// The job mirror is updated as statuses arrive.
    pub async fn wait<S, F>(&self, source: &S, job: &mut Job, mut on_transition: F) -> JobOutcome
    where
        S: StatusSource + ?Sized,
        F: FnMut(JobState) + Send,
    {
        let mut last_reported: Option<JobState> = None;
        let mut failed_queries: u32 = 0;

        loop {
            let elapsed = job.submitted_at.elapsed();
            if elapsed > self.config.timeout {
                warn!(
                    job_id = %job.id,
                    elapsed_secs = elapsed.as_secs(),
                    "Job timed out; it is no longer observed"
                );
                return JobOutcome::TimedOut;
            }

            let report = match source.fetch_status(&job.id).await {
                Ok(report) => report,
                Err(e) => {
                    failed_queries += 1;
                    warn!(job_id = %job.id, attempt = failed_queries, error = %e, "Error checking job status");
                    sleep(self.config.retry_delay).await;
                    continue;
                }
            };

            let Some(state) = JobState::from_remote(&report.status) else {
                debug!(job_id = %job.id, status = %report.status, "Ignoring unrecognised status");
                sleep(self.config.poll_interval).await;
                continue;
            };

            job.state = state;
            if last_reported != Some(state) {
                info!(job_id = %job.id, state = ?state, "Job state changed");
                on_transition(state);
                last_reported = Some(state);
            }

            match state {
                JobState::Completed => {
                    let output = report.output.unwrap_or_default();
                    job.output = Some(output.clone());
                    return JobOutcome::Completed(output);
                }
                JobState::Failed => return JobOutcome::Failed(report.error_reason()),
                JobState::Cancelled => return JobOutcome::Cancelled(report.error_reason()),
                JobState::Queued | JobState::Running => {}
            }

            sleep(self.config.poll_interval).await;
        }
    }
}
