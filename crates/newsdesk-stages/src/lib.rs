//! Newsdesk Stages: the four steps of the daily news pipeline.
//!
//! # Pipeline Flow
//!
//! ```text
//! NewsSource → Collect → Summarize → Translate ──┬─ hi ─┐
//!                 ↓          ↓                    ├─ ta ─┼→ Distribute ──┬─ email
//!          news_items.json  Summary               └─ he ─┘               └─ telegram
//! ```
//!
//! Collaborators are injected through [`Collaborators`]; nothing here knows
//! which HTTP provider sits behind them.

mod collect;
mod distribute;
pub mod snapshot;
mod summarize;
mod translate;

pub use collect::CollectStage;
pub use distribute::DistributeStage;
pub use summarize::SummarizeStage;
pub use translate::TranslateStage;

use newsdesk_core::{
    FanOut, LanguageModel, NewsSource, PipelineConfig, PipelineRunner, Renderer, Sender, Stage,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Collaborators shared by the stages of one pipeline.
#[derive(Clone)]
pub struct Collaborators {
    pub news: Arc<dyn NewsSource>,
    pub model: Arc<dyn LanguageModel>,
    pub renderer: Arc<dyn Renderer>,
    /// Keyed by channel name
    pub senders: HashMap<String, Arc<dyn Sender>>,
}

/// Stages in their fixed order: `collect → summarize → translate → distribute`.
pub fn default_stages(config: &PipelineConfig, collaborators: &Collaborators) -> Vec<Box<dyn Stage>> {
    let fanout = FanOut::new(config.max_concurrency, config.unit_timeout());

    vec![
        Box::new(
            CollectStage::new(Arc::clone(&collaborators.news), config.call_timeout())
                .with_lookback(config.default_lookback(), config.max_lookback())
                .with_snapshot(config.snapshot),
        ),
        Box::new(SummarizeStage::new(
            Arc::clone(&collaborators.model),
            config.summary_words,
            config.call_timeout(),
        )),
        Box::new(
            TranslateStage::new(
                Arc::clone(&collaborators.model),
                Arc::clone(&collaborators.renderer),
                config.languages(),
                fanout,
                config.call_timeout(),
            )
            .with_title(config.report_title.clone()),
        ),
        Box::new(DistributeStage::new(
            config.channels.clone(),
            collaborators.senders.clone(),
            fanout,
            config.call_timeout(),
        )),
    ]
}

/// Build the orchestrator for a validated config.
pub fn build_pipeline(config: &PipelineConfig, collaborators: &Collaborators) -> PipelineRunner {
    PipelineRunner::new(default_stages(config, collaborators), config.output_dir.clone())
}
