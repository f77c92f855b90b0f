//! Data Model: NewsItem, Summary, documents, deliveries and RunResult
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::context::RunContext;
use crate::error::{ErrorKind, StageError};
use crate::stage::{StageKind, StageOutput};

/// One collected headline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub source: String,
    /// Publication time, ISO-8601 on the wire
    pub timestamp: DateTime<Utc>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub text: String,
    pub source_item_count: usize,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextDirection {
    Ltr,
    Rtl,
}

/// Language codes rendered right-to-left
const RTL_CODES: &[&str] = &["he", "iw", "ar", "fa", "ur", "yi"];

impl TextDirection {
    /// Infer the direction from an ISO-639 code (`he`, `he-IL`, ...).
    pub fn for_code(code: &str) -> Self {
        let primary = code.split(['-', '_']).next().unwrap_or(code).to_ascii_lowercase();
        if RTL_CODES.contains(&primary.as_str()) {
            TextDirection::Rtl
        } else {
            TextDirection::Ltr
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TextDirection::Ltr => "ltr",
            TextDirection::Rtl => "rtl",
        }
    }

    pub fn is_rtl(&self) -> bool {
        matches!(self, TextDirection::Rtl)
    }
}

/// A translation target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    /// ISO code (ex: "hi", "ta", "he")
    pub code: String,
    /// Human name handed to the model (ex: "Hindi")
    pub name: String,
    pub direction: TextDirection,
}

impl Language {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        let code = code.into();
        let direction = TextDirection::for_code(&code);
        Self {
            code,
            name: name.into(),
            direction,
        }
    }

    pub fn with_direction(mut self, direction: TextDirection) -> Self {
        self.direction = direction;
        self
    }
}

/// Reference to a rendered file on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub path: PathBuf,
    pub mime: String,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentStatus {
    Rendered,
    Failed { error: ErrorKind },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatedDocument {
    pub language: Language,
    /// Present only when rendered
    pub document: Option<DocumentRef>,
    pub status: DocumentStatus,
}

impl TranslatedDocument {
    pub fn rendered(language: Language, document: DocumentRef) -> Self {
        Self {
            language,
            document: Some(document),
            status: DocumentStatus::Rendered,
        }
    }

    pub fn failed(language: Language, error: ErrorKind) -> Self {
        Self {
            language,
            document: None,
            status: DocumentStatus::Failed { error },
        }
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self.status, DocumentStatus::Rendered) && self.document.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Delivered,
    Failed,
}

/// Outcome of one (document, channel) attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionRecord {
    pub channel: String,
    pub language: String,
    pub document: PathBuf,
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

/// A document left out of distribution because its translation failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusion {
    pub language: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Succeeded,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage: StageKind,
    pub stage_id: String,
    pub status: StageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StageError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    /// Output size (items, documents, deliveries)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<usize>,
    /// Output identity, `blake3:<hex>`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub latency_ms: u64,
}

impl StageOutcome {
    pub fn succeeded(
        stage: StageKind,
        stage_id: impl Into<String>,
        output: StageOutput,
        latency_ms: u64,
    ) -> Self {
        Self {
            stage,
            stage_id: stage_id.into(),
            status: StageStatus::Succeeded,
            error: None,
            skip_reason: None,
            items: Some(output.items),
            digest: output.digest,
            detail: output.detail,
            latency_ms,
        }
    }

    pub fn failed(
        stage: StageKind,
        stage_id: impl Into<String>,
        error: StageError,
        latency_ms: u64,
    ) -> Self {
        Self {
            stage,
            stage_id: stage_id.into(),
            status: StageStatus::Failed,
            error: Some(error),
            skip_reason: None,
            items: None,
            digest: None,
            detail: None,
            latency_ms,
        }
    }

    pub fn skipped(stage: StageKind, stage_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            stage,
            stage_id: stage_id.into(),
            status: StageStatus::Skipped,
            error: None,
            skip_reason: Some(reason.into()),
            items: None,
            digest: None,
            detail: None,
            latency_ms: 0,
        }
    }

    pub fn stage_name(&self) -> &'static str {
        self.stage.name()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    /// Every stage ran, at least one failed without blocking the rest
    PartialFailure,
    /// A blocking failure; later stages were skipped
    Failed,
    /// Shutdown between stages
    Cancelled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Succeeded => "succeeded",
            RunStatus::PartialFailure => "partial_failure",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
        }
    }
}

/// Immutable record of one pipeline execution.
///
/// Built through [`RunRecorder`]; there is no way to change a `RunResult`
/// once [`RunRecorder::finish`] returned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    stage_outcomes: Vec<StageOutcome>,
    overall_status: RunStatus,
    documents: Vec<TranslatedDocument>,
    deliveries: Vec<DistributionRecord>,
    exclusions: Vec<Exclusion>,
}

impl RunResult {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    pub fn stage_outcomes(&self) -> &[StageOutcome] {
        &self.stage_outcomes
    }

    pub fn overall_status(&self) -> RunStatus {
        self.overall_status
    }

    pub fn documents(&self) -> &[TranslatedDocument] {
        &self.documents
    }

    pub fn deliveries(&self) -> &[DistributionRecord] {
        &self.deliveries
    }

    pub fn exclusions(&self) -> &[Exclusion] {
        &self.exclusions
    }

    pub fn outcome(&self, stage: StageKind) -> Option<&StageOutcome> {
        self.stage_outcomes.iter().find(|o| o.stage == stage)
    }

    pub fn is_success(&self) -> bool {
        self.overall_status == RunStatus::Succeeded
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Accumulates stage outcomes while a run is executing.
#[derive(Debug)]
pub struct RunRecorder {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    stage_outcomes: Vec<StageOutcome>,
    cancelled: bool,
}

impl RunRecorder {
    pub fn new(run_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            started_at,
            stage_outcomes: Vec::new(),
            cancelled: false,
        }
    }

    pub fn record(&mut self, outcome: StageOutcome) {
        self.stage_outcomes.push(outcome);
    }

    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    pub fn outcomes(&self) -> &[StageOutcome] {
        &self.stage_outcomes
    }

    fn overall_status(&self) -> RunStatus {
        let mut failed = false;
        let mut blocking = false;
        for outcome in &self.stage_outcomes {
            if outcome.status == StageStatus::Failed {
                failed = true;
                blocking |= outcome.error.as_ref().map_or(true, StageError::is_blocking);
            }
        }

        match (failed, blocking) {
            (true, true) => RunStatus::Failed,
            (true, false) => RunStatus::PartialFailure,
            _ if self.cancelled => RunStatus::Cancelled,
            _ => RunStatus::Succeeded,
        }
    }

    /// Seal the run, moving the artifacts out of the context.
    pub fn finish(self, ctx: RunContext, finished_at: DateTime<Utc>) -> RunResult {
        let overall_status = self.overall_status();
        RunResult {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at,
            stage_outcomes: self.stage_outcomes,
            overall_status,
            documents: ctx.documents,
            deliveries: ctx.deliveries,
            exclusions: ctx.exclusions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn output(items: usize) -> StageOutput {
        StageOutput::new(items)
    }

    fn recorder() -> (RunRecorder, RunContext) {
        let ctx = RunContext::new(Path::new("/tmp/newsdesk"), None);
        (RunRecorder::new(ctx.run_id, ctx.started_at), ctx)
    }

    #[test]
    fn test_direction_inferred_from_code() {
        assert_eq!(TextDirection::for_code("he"), TextDirection::Rtl);
        assert_eq!(TextDirection::for_code("he-IL"), TextDirection::Rtl);
        assert_eq!(TextDirection::for_code("AR"), TextDirection::Rtl);
        assert_eq!(TextDirection::for_code("hi"), TextDirection::Ltr);
        assert_eq!(TextDirection::for_code("ta"), TextDirection::Ltr);
        assert!(Language::new("he", "Hebrew").direction.is_rtl());
    }

    #[test]
    fn test_all_succeeded_run() {
        let (mut rec, ctx) = recorder();
        for kind in StageKind::ALL {
            rec.record(StageOutcome::succeeded(kind, kind.name(), output(1), 3));
        }
        let result = rec.finish(ctx, Utc::now());
        assert_eq!(result.overall_status(), RunStatus::Succeeded);
        assert!(result.is_success());
    }

    #[test]
    fn test_partial_failure_is_never_succeeded() {
        let (mut rec, ctx) = recorder();
        rec.record(StageOutcome::succeeded(StageKind::Collect, "collect", output(4), 1));
        rec.record(StageOutcome::succeeded(StageKind::Summarize, "summarize", output(1), 1));
        rec.record(StageOutcome::failed(
            StageKind::Translate,
            "translate",
            StageError::Translation(ErrorKind::PartialFailure { failed: 1, total: 3 }),
            1,
        ));
        rec.record(StageOutcome::succeeded(StageKind::Distribute, "distribute", output(4), 1));
        let result = rec.finish(ctx, Utc::now());
        assert_eq!(result.overall_status(), RunStatus::PartialFailure);
    }

    #[test]
    fn test_blocking_failure_marks_run_failed() {
        let (mut rec, ctx) = recorder();
        rec.record(StageOutcome::failed(
            StageKind::Collect,
            "collect",
            StageError::Collection(ErrorKind::EmptyResult),
            1,
        ));
        for kind in [StageKind::Summarize, StageKind::Translate, StageKind::Distribute] {
            rec.record(StageOutcome::skipped(kind, kind.name(), "collect failed"));
        }
        rec.mark_cancelled();
        let result = rec.finish(ctx, Utc::now());
        assert_eq!(result.overall_status(), RunStatus::Failed);
        assert_eq!(result.stage_outcomes().len(), 4);
    }

    #[test]
    fn test_cancelled_without_failures() {
        let (mut rec, ctx) = recorder();
        rec.record(StageOutcome::succeeded(StageKind::Collect, "collect", output(2), 1));
        rec.mark_cancelled();
        for kind in [StageKind::Summarize, StageKind::Translate, StageKind::Distribute] {
            rec.record(StageOutcome::skipped(kind, kind.name(), "shutdown"));
        }
        let result = rec.finish(ctx, Utc::now());
        assert_eq!(result.overall_status(), RunStatus::Cancelled);
    }

    #[test]
    fn test_run_result_json_shape() {
        let (mut rec, ctx) = recorder();
        rec.record(StageOutcome::skipped(StageKind::Collect, "collect", "shutdown"));
        rec.mark_cancelled();
        let result = rec.finish(ctx, Utc::now());

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["overall_status"], "cancelled");
        assert_eq!(value["stage_outcomes"][0]["status"], "skipped");
        assert_eq!(value["stage_outcomes"][0]["skip_reason"], "shutdown");
        assert!(value["stage_outcomes"][0].get("error").is_none());

        let back: RunResult = serde_json::from_value(value).unwrap();
        assert_eq!(back, result);
    }
}
