//! The pipeline as a scheduled job.
use async_trait::async_trait;
use newsdesk_core::{PipelineRunner, RunResult, RunStatus};
use newsdesk_schedule::{FireContext, JobOutcome, ScheduledJob};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::state::AppState;

pub struct PipelineJob {
    runner: PipelineRunner,
    state: AppState,
}

impl PipelineJob {
    pub fn new(runner: PipelineRunner, state: AppState) -> Self {
        Self { runner, state }
    }

    /// Run once and publish the result to the status state.
    pub async fn run_once(&self, shutdown: &CancellationToken) -> RunResult {
        let result = self.runner.run(shutdown).await;
        self.state.record(result.clone());
        result
    }
}

/// Only a blocking failure is worth a retry; partial deliveries are not repeated.
pub fn job_outcome(result: &RunResult) -> JobOutcome {
    match result.overall_status() {
        RunStatus::Failed => JobOutcome::Failed(format!("run {} failed", result.run_id())),
        RunStatus::Succeeded | RunStatus::PartialFailure | RunStatus::Cancelled => {
            JobOutcome::Succeeded
        }
    }
}

#[async_trait]
impl ScheduledJob for PipelineJob {
    async fn run(&self, fire: FireContext, shutdown: CancellationToken) -> JobOutcome {
        info!(day = %fire.day, attempt = fire.attempt, "Daily pipeline run");
        let result = self.run_once(&shutdown).await;
        job_outcome(&result)
    }
}
