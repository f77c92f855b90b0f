use async_trait::async_trait;
use chrono::{DateTime, Utc};
use newsdesk_core::{
    call_with_timeout, ErrorKind, LookbackWindow, NewsSource, RunContext, Stage, StageError,
    StageKind, StageOutput,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::snapshot::{write_snapshot, SNAPSHOT_FILE};

pub struct CollectStage {
    source: Arc<dyn NewsSource>,
    default_lookback: Duration,
    max_lookback: Duration,
    call_timeout: Duration,
    snapshot: bool,
}

impl CollectStage {
    pub fn new(source: Arc<dyn NewsSource>, call_timeout: Duration) -> Self {
        Self {
            source,
            default_lookback: Duration::from_secs(3600),
            max_lookback: Duration::from_secs(24 * 3600),
            call_timeout,
            snapshot: false,
        }
    }

    pub fn with_lookback(mut self, default: Duration, max: Duration) -> Self {
        self.default_lookback = default;
        self.max_lookback = max.max(default);
        self
    }

    pub fn with_snapshot(mut self, enabled: bool) -> Self {
        self.snapshot = enabled;
        self
    }

    /// Interval since the previous successful run, capped; the default
    /// look-back when there was none.
    pub fn window(&self, now: DateTime<Utc>, last_success: Option<DateTime<Utc>>) -> LookbackWindow {
        let span = match last_success {
            Some(prev) if prev < now => (now - prev)
                .to_std()
                .map(|span| span.min(self.max_lookback))
                .unwrap_or(self.default_lookback),
            _ => self.default_lookback,
        };
        LookbackWindow::ending_at(now, span)
    }
}

#[async_trait]
impl Stage for CollectStage {
    fn id(&self) -> &'static str {
        "collect.news.v1"
    }

    fn kind(&self) -> StageKind {
        StageKind::Collect
    }

    async fn execute(&self, ctx: &mut RunContext) -> Result<StageOutput, StageError> {
        let window = self.window(ctx.started_at, ctx.last_success);
        debug!(run_id = %ctx.run_id, from = %window.from, to = %window.to, "Searching news");

        let items = call_with_timeout(self.call_timeout, self.source.search(window))
            .await
            .map_err(StageError::Collection)?;

        if items.is_empty() {
            return Err(StageError::Collection(ErrorKind::EmptyResult));
        }

        if self.snapshot {
            let path = ctx.work_dir.join(SNAPSHOT_FILE);
            if let Err(err) = write_snapshot(&path, &items).await {
                warn!(run_id = %ctx.run_id, path = %path.display(), error = %err, "Snapshot not written");
            }
        }

        let digest_input = items
            .iter()
            .map(|item| item.url.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let output = StageOutput::new(items.len())
            .with_digest(digest_input.as_bytes())
            .with_detail(format!("window {}s", window.span().as_secs()));

        ctx.news_items = items;
        Ok(output)
    }
}
