//! Pipeline Runner: runs the stages in order and records a RunResult
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::context::RunContext;
use crate::data_model::{RunRecorder, RunResult, RunStatus, StageOutcome};
use crate::error::{panic_message, ErrorKind};
use crate::stage::Stage;

pub struct PipelineRunner {
    stages: Vec<Box<dyn Stage>>,
    pipeline_id: String,
    output_dir: PathBuf,
    last_success: Mutex<Option<DateTime<Utc>>>,
}

impl PipelineRunner {
    pub fn new(stages: Vec<Box<dyn Stage>>, output_dir: impl Into<PathBuf>) -> Self {
        let pipeline_id = stages
            .iter()
            .map(|s| s.id().split('.').next().unwrap_or("?"))
            .collect::<Vec<_>>()
            .join("→");

        Self {
            stages,
            pipeline_id,
            output_dir: output_dir.into(),
            last_success: Mutex::new(None),
        }
    }

    /// Seed the "since last success" look-back (ex: restored from a previous process).
    pub fn with_last_success(self, at: DateTime<Utc>) -> Self {
        self.set_last_success(at);
        self
    }

    pub fn pipeline_id(&self) -> &str {
        &self.pipeline_id
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        *self.last_success.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set_last_success(&self, at: DateTime<Utc>) {
        *self.last_success.lock().unwrap_or_else(|p| p.into_inner()) = Some(at);
    }

    /// Execute every stage once.
    ///
    /// After a blocking failure, or once `shutdown` is cancelled, the
    /// remaining stages are recorded as skipped instead of being invoked,
    /// so the result always has one outcome per stage. Cancellation is only
    /// observed between stages.
    pub async fn run(&self, shutdown: &CancellationToken) -> RunResult {
        let mut ctx = RunContext::new(&self.output_dir, self.last_success());
        let mut recorder = RunRecorder::new(ctx.run_id, ctx.started_at);
        let run_id = ctx.run_id;
        let mut halted: Option<String> = None;

        info!(%run_id, pipeline = %self.pipeline_id, "Run started");

        for stage in &self.stages {
            let kind = stage.kind();

            if halted.is_none() && shutdown.is_cancelled() {
                info!(%run_id, stage = kind.name(), "Shutdown requested, stopping before stage");
                recorder.mark_cancelled();
                halted = Some("shutdown".to_string());
            }

            if let Some(reason) = &halted {
                recorder.record(StageOutcome::skipped(kind, stage.id(), reason.clone()));
                continue;
            }

            let start = Instant::now();
            let result = AssertUnwindSafe(stage.execute(&mut ctx)).catch_unwind().await;
            let latency_ms = start.elapsed().as_millis() as u64;

            let outcome = match result {
                Ok(Ok(output)) => {
                    info!(
                        %run_id,
                        stage = kind.name(),
                        items = output.items,
                        latency_ms,
                        "Stage succeeded"
                    );
                    StageOutcome::succeeded(kind, stage.id(), output, latency_ms)
                }
                Ok(Err(err)) => {
                    if err.is_blocking() {
                        halted = Some(format!("{} failed", kind.name()));
                    }
                    warn!(%run_id, stage = kind.name(), error = %err, latency_ms, "Stage failed");
                    StageOutcome::failed(kind, stage.id(), err, latency_ms)
                }
                Err(panic) => {
                    let err = kind.error(ErrorKind::Unexpected(panic_message(panic.as_ref())));
                    error!(%run_id, stage = kind.name(), error = %err, "Stage panicked");
                    halted = Some(format!("{} failed", kind.name()));
                    StageOutcome::failed(kind, stage.id(), err, latency_ms)
                }
            };
            recorder.record(outcome);
        }

        let result = recorder.finish(ctx, Utc::now());
        self.report(&result);
        if result.is_success() {
            self.set_last_success(result.started_at());
        }
        result
    }

    fn report(&self, result: &RunResult) {
        let run_id = result.run_id();
        let status = result.overall_status().as_str();
        match result.overall_status() {
            RunStatus::Succeeded => info!(
                %run_id,
                status,
                duration_ms = result.duration_ms(),
                documents = result.documents().len(),
                deliveries = result.deliveries().len(),
                "Run finished"
            ),
            _ => {
                let detail = serde_json::to_string(result).unwrap_or_default();
                warn!(%run_id, status, %detail, "Run finished with failures");
            }
        }
    }
}
