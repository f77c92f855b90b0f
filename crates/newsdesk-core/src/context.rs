//! Run Context: state threaded through the stages of one run
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::data_model::{DistributionRecord, Exclusion, NewsItem, Summary, TranslatedDocument};

/// Owned by exclusively one `PipelineRunner::run` call; only the stage
/// currently executing mutates it.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Start of the previous successful run, if any
    pub last_success: Option<DateTime<Utc>>,
    /// Per-run working directory (`<output_dir>/<run_id>`)
    pub work_dir: PathBuf,
    pub news_items: Vec<NewsItem>,
    pub summary: Option<Summary>,
    /// One entry per configured language, in configured order
    pub documents: Vec<TranslatedDocument>,
    pub deliveries: Vec<DistributionRecord>,
    pub exclusions: Vec<Exclusion>,
}

impl RunContext {
    pub fn new(output_dir: &Path, last_success: Option<DateTime<Utc>>) -> Self {
        let run_id = Uuid::new_v4();
        Self {
            run_id,
            started_at: Utc::now(),
            last_success,
            work_dir: output_dir.join(run_id.to_string()),
            news_items: Vec::new(),
            summary: None,
            documents: Vec::new(),
            deliveries: Vec::new(),
            exclusions: Vec::new(),
        }
    }

    /// Document produced for a language code.
    pub fn document(&self, code: &str) -> Option<&TranslatedDocument> {
        self.documents.iter().find(|d| d.language.code == code)
    }

    pub fn rendered_documents(&self) -> impl Iterator<Item = &TranslatedDocument> {
        self.documents.iter().filter(|d| d.is_rendered())
    }
}
