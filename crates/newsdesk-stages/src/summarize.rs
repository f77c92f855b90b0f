use async_trait::async_trait;
use chrono::Utc;
use newsdesk_core::{
    call_with_timeout, ErrorKind, LanguageModel, RunContext, Stage, StageError, StageKind,
    StageOutput, Summary,
};
use std::sync::Arc;
use std::time::Duration;

pub struct SummarizeStage {
    model: Arc<dyn LanguageModel>,
    target_words: usize,
    call_timeout: Duration,
}

impl SummarizeStage {
    pub fn new(model: Arc<dyn LanguageModel>, target_words: usize, call_timeout: Duration) -> Self {
        Self {
            model,
            target_words,
            call_timeout,
        }
    }
}

#[async_trait]
impl Stage for SummarizeStage {
    fn id(&self) -> &'static str {
        "summarize.llm.v1"
    }

    fn kind(&self) -> StageKind {
        StageKind::Summarize
    }

    async fn execute(&self, ctx: &mut RunContext) -> Result<StageOutput, StageError> {
        if ctx.news_items.is_empty() {
            return Err(StageError::Summarization(ErrorKind::EmptyResult));
        }

        let text = call_with_timeout(
            self.call_timeout,
            self.model.summarize(&ctx.news_items, self.target_words),
        )
        .await
        .map_err(StageError::Summarization)?;

        let text = text.trim();
        if text.is_empty() {
            return Err(StageError::Summarization(ErrorKind::EmptyResult));
        }

        let words = text.split_whitespace().count();
        let output = StageOutput::new(1)
            .with_digest(text.as_bytes())
            .with_detail(format!("{words} words"));

        ctx.summary = Some(Summary {
            text: text.to_string(),
            source_item_count: ctx.news_items.len(),
            generated_at: Utc::now(),
        });
        Ok(output)
    }
}
