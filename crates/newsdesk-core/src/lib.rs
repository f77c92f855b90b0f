//! Newsdesk Core: Stage trait, fan-out runner, orchestrator and data model
//!
//! A run threads one [`RunContext`] through four stages in a fixed order:
//!
//! ```text
//! Collect → Summarize → Translate (fan-out over languages) → Distribute (fan-out over channels)
//!                                                                   ↓
//!                                                               RunResult
//! ```
//!
//! Collaborators (news API, language model, renderer, senders) are traits in
//! [`collaborators`]; concrete stages live in `newsdesk-stages`.

pub mod collaborators;
pub mod config;
pub mod context;
pub mod data_model;
pub mod error;
pub mod fanout;
pub mod runner;
pub mod stage;

pub use collaborators::{
    DeliveryReceipt, LanguageModel, LookbackWindow, NewsSource, RenderRequest, Renderer, Sender,
};
pub use config::{ChannelConfig, ChannelKind, ConfigError, LanguageConfig, PipelineConfig};
pub use context::RunContext;
pub use data_model::{
    DeliveryStatus, DistributionRecord, DocumentRef, DocumentStatus, Exclusion, Language,
    NewsItem, RunRecorder, RunResult, RunStatus, StageOutcome, StageStatus, Summary,
    TextDirection, TranslatedDocument,
};
pub use error::{ErrorKind, ProviderError, StageError};
pub use fanout::{FanOut, FanOutReport, RollUp};
pub use runner::PipelineRunner;
pub use stage::{call_with_timeout, hash_bytes, Stage, StageKind, StageOutput};

/// Newsdesk engine version
pub const NEWSDESK_VERSION: &str = env!("CARGO_PKG_VERSION");
