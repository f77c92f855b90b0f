//! External collaborators: narrow traits the stages call out to
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

use crate::config::ChannelConfig;
use crate::data_model::{DocumentRef, Language, NewsItem, TextDirection};
use crate::error::ProviderError;

/// Time range a news search covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookbackWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl LookbackWindow {
    pub fn ending_at(to: DateTime<Utc>, span: Duration) -> Self {
        let span = chrono::Duration::from_std(span).unwrap_or_else(|_| chrono::Duration::hours(1));
        Self { from: to - span, to }
    }

    pub fn span(&self) -> Duration {
        (self.to - self.from).to_std().unwrap_or_default()
    }
}

#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn search(&self, window: LookbackWindow) -> Result<Vec<NewsItem>, ProviderError>;
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn summarize(
        &self,
        items: &[NewsItem],
        target_words: usize,
    ) -> Result<String, ProviderError>;

    async fn translate(&self, text: &str, language: &Language) -> Result<String, ProviderError>;
}

/// Everything the renderer needs to produce one document.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub run_id: Uuid,
    pub title: &'a str,
    pub text: &'a str,
    pub language: &'a Language,
    pub direction: TextDirection,
}

#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, request: RenderRequest<'_>) -> Result<DocumentRef, ProviderError>;
}

/// Provider acknowledgement for a delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub reference: Option<String>,
}

impl DeliveryReceipt {
    pub fn with_reference(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
        }
    }
}

/// Sends one document over one channel; the channel carries its recipients.
#[async_trait]
pub trait Sender: Send + Sync {
    async fn send(
        &self,
        document: &DocumentRef,
        channel: &ChannelConfig,
    ) -> Result<DeliveryReceipt, ProviderError>;
}
