//! Daemon configuration: one YAML file, environment interpolated, validated once.
//!
//! ```yaml
//! schedule:
//!   trigger: "16:30"
//!   poll_interval_secs: 60
//!   retry: { max_attempts: 2, delay_secs: 600 }
//! pipeline:
//!   output_dir: reports
//!   languages:
//!     - { code: hi, name: Hindi }
//!     - { code: he, name: Hebrew }
//!   channels:
//!     - { name: email, kind: email, recipients: ["desk@example.com"] }
//! providers:
//!   llm: { api_key: "${HUGGINGFACE_API_KEY}" }
//! status:
//!   addr: "127.0.0.1:9090"
//! ```
//!
//! Credentials left unset in the file are read from `HUGGINGFACE_API_KEY`,
//! `BREVO_API_KEY`, `TELEGRAM_BOT_TOKEN` and `NEWS_API_KEY`.

use newsdesk_core::{ConfigError, PipelineConfig};
use newsdesk_providers::{BrevoConfig, LlmConfig, NewsApiConfig, TelegramConfig};
use newsdesk_schedule::{ScheduleConfig, ScheduleError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::vars;

#[derive(Debug, Error)]
pub enum DaemonConfigError {
    #[error("CONFIG/read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CONFIG/unset variables: {}", .0.join(", "))]
    Interpolation(Vec<String>),

    #[error("CONFIG/yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Pipeline(#[from] ConfigError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("CONFIG/{field}: {reason}")]
    Invalid { field: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub http_timeout_secs: u64,
    pub news: NewsApiConfig,
    pub llm: LlmConfig,
    pub email: BrevoConfig,
    pub telegram: TelegramConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: 90,
            news: NewsApiConfig::default(),
            llm: LlmConfig::default(),
            email: BrevoConfig::default(),
            telegram: TelegramConfig::default(),
        }
    }
}

impl ProvidersConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Status server address; disabled when unset
    pub addr: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub schedule: ScheduleConfig,
    pub pipeline: PipelineConfig,
    pub providers: ProvidersConfig,
    pub status: StatusConfig,
    /// Custom report templates file
    pub templates: Option<PathBuf>,
}

impl DaemonConfig {
    /// Load `path` if it exists, otherwise defaults; then environment credentials and validation.
    pub fn load(path: Option<&Path>) -> Result<Self, DaemonConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(path)?,
            Some(path) => {
                warn!(path = %path.display(), "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, DaemonConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| DaemonConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, DaemonConfigError> {
        let text = vars::interpolate(raw).map_err(DaemonConfigError::Interpolation)?;
        Ok(serde_yaml::from_str(&text)?)
    }

    /// Fill credentials missing from the file from well-known variables.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let fill = |slot: &mut Option<String>, name: &str| {
            let unset = slot.as_deref().map_or(true, |v| v.trim().is_empty());
            if unset {
                if let Some(value) = lookup(name).filter(|v| !v.is_empty()) {
                    *slot = Some(value);
                }
            }
        };

        fill(&mut self.providers.llm.api_key, "HUGGINGFACE_API_KEY");
        fill(&mut self.providers.email.api_key, "BREVO_API_KEY");
        fill(&mut self.providers.telegram.bot_token, "TELEGRAM_BOT_TOKEN");
        fill(&mut self.providers.news.api_key, "NEWS_API_KEY");
    }

    pub fn validate(&self) -> Result<(), DaemonConfigError> {
        self.pipeline.validate()?;
        self.schedule.validate()?;

        if self.providers.http_timeout_secs == 0 {
            return Err(DaemonConfigError::Invalid {
                field: "providers.http_timeout_secs".into(),
                reason: "must be positive".into(),
            });
        }
        if let Some(addr) = &self.status.addr {
            addr.parse::<std::net::SocketAddr>()
                .map_err(|e| DaemonConfigError::Invalid {
                    field: "status.addr".into(),
                    reason: format!("'{addr}': {e}"),
                })?;
        }
        Ok(())
    }
}
