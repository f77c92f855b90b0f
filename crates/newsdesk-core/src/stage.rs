//! Stage Trait: single contract shared by every pipeline step
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::context::RunContext;
use crate::error::{ErrorKind, ProviderError, StageError};

/// The four pipeline steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Collect,
    Summarize,
    Translate,
    Distribute,
}

impl StageKind {
    pub const ALL: [StageKind; 4] = [
        StageKind::Collect,
        StageKind::Summarize,
        StageKind::Translate,
        StageKind::Distribute,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Collect => "collect",
            StageKind::Summarize => "summarize",
            StageKind::Translate => "translate",
            StageKind::Distribute => "distribute",
        }
    }

    /// Wrap a sub-kind into this stage's typed error.
    pub fn error(&self, kind: ErrorKind) -> StageError {
        match self {
            StageKind::Collect => StageError::Collection(kind),
            StageKind::Summarize => StageError::Summarization(kind),
            StageKind::Translate => StageError::Translation(kind),
            StageKind::Distribute => StageError::Distribution(kind),
        }
    }
}

/// What a successful stage reports back to the runner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageOutput {
    pub items: usize,
    pub digest: Option<String>,
    pub detail: Option<String>,
}

impl StageOutput {
    pub fn new(items: usize) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn with_digest(mut self, data: &[u8]) -> Self {
        self.digest = Some(hash_bytes(data));
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Single contract of a Newsdesk stage
#[async_trait]
pub trait Stage: Send + Sync {
    /// Unique stage id (ex: "collect.news.v1")
    fn id(&self) -> &'static str;

    fn kind(&self) -> StageKind;

    /// Run the stage against the shared context.
    ///
    /// Collaborator failures must be converted to the stage's own
    /// [`StageError`] variant; nothing raw escapes to the runner.
    async fn execute(&self, ctx: &mut RunContext) -> Result<StageOutput, StageError>;
}

pub fn hash_bytes(data: &[u8]) -> String {
    format!("blake3:{}", blake3::hash(data))
}

/// Await a collaborator call, turning an overrun into [`ErrorKind::Timeout`].
pub async fn call_with_timeout<T, F>(limit: Duration, call: F) -> Result<T, ErrorKind>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(ErrorKind::from),
        Err(_) => Err(ErrorKind::Timeout(limit.as_millis() as u64)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_and_names() {
        let names: Vec<_> = StageKind::ALL.iter().map(|k| k.name()).collect();
        assert_eq!(names, ["collect", "summarize", "translate", "distribute"]);
    }

    #[test]
    fn test_kind_wraps_error() {
        let err = StageKind::Translate.error(ErrorKind::EmptyResult);
        assert_eq!(err, StageError::Translation(ErrorKind::EmptyResult));
    }

    #[test]
    fn test_output_digest_is_stable() {
        let a = StageOutput::new(1).with_digest(b"summary");
        let b = StageOutput::new(1).with_digest(b"summary");
        assert_eq!(a.digest, b.digest);
        assert!(a.digest.unwrap().starts_with("blake3:"));
    }

    #[tokio::test]
    async fn test_call_with_timeout_maps_provider_error() {
        let result: Result<(), _> = call_with_timeout(Duration::from_secs(1), async {
            Err(ProviderError::Http("503".into()))
        })
        .await;
        assert_eq!(result, Err(ErrorKind::Provider("HTTP/503".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_with_timeout_expires() {
        let result: Result<(), _> = call_with_timeout(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;
        assert_eq!(result, Err(ErrorKind::Timeout(50)));
    }
}
