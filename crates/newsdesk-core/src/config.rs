//! Pipeline configuration, built once at start-up and shared read-only
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::data_model::{Language, TextDirection};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("CONFIG/{field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub code: String,
    pub name: String,
    /// Inferred from `code` when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<TextDirection>,
}

impl LanguageConfig {
    pub fn new(code: &str, name: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            direction: None,
        }
    }

    pub fn to_language(&self) -> Language {
        let language = Language::new(&self.code, &self.name);
        match self.direction {
            Some(direction) => language.with_direction(direction),
            None => language,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Email,
    Telegram,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Unique channel name, used in distribution records
    pub name: String,
    pub kind: ChannelKind,
    /// E-mail addresses or chat ids, depending on `kind`
    #[serde(default)]
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Look-back used when no previous successful run is known
    pub default_lookback_secs: u64,
    /// Upper bound for the "since last success" window
    pub max_lookback_secs: u64,
    pub summary_words: usize,
    pub report_title: String,
    pub languages: Vec<LanguageConfig>,
    pub channels: Vec<ChannelConfig>,
    /// Timeout for a single collaborator call
    pub call_timeout_secs: u64,
    /// Timeout for one fan-out unit (text, title and render calls, or one send)
    pub unit_timeout_secs: u64,
    pub max_concurrency: usize,
    pub output_dir: PathBuf,
    /// Write `news_items.json` into the run directory
    pub snapshot: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_lookback_secs: 3600,
            max_lookback_secs: 24 * 3600,
            summary_words: 500,
            report_title: "Financial News Summary".to_string(),
            languages: vec![
                LanguageConfig::new("hi", "Hindi"),
                LanguageConfig::new("ta", "Tamil"),
                LanguageConfig::new("he", "Hebrew"),
            ],
            channels: vec![
                ChannelConfig {
                    name: "email".to_string(),
                    kind: ChannelKind::Email,
                    recipients: Vec::new(),
                },
                ChannelConfig {
                    name: "telegram".to_string(),
                    kind: ChannelKind::Telegram,
                    recipients: Vec::new(),
                },
            ],
            call_timeout_secs: 120,
            unit_timeout_secs: 420,
            max_concurrency: 4,
            output_dir: PathBuf::from("reports"),
            snapshot: true,
        }
    }
}

impl PipelineConfig {
    pub fn default_lookback(&self) -> Duration {
        Duration::from_secs(self.default_lookback_secs)
    }

    pub fn max_lookback(&self) -> Duration {
        Duration::from_secs(self.max_lookback_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn unit_timeout(&self) -> Duration {
        Duration::from_secs(self.unit_timeout_secs)
    }

    pub fn languages(&self) -> Vec<Language> {
        self.languages.iter().map(LanguageConfig::to_language).collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.languages.is_empty() {
            return Err(ConfigError::invalid("languages", "at least one language is required"));
        }
        if self.channels.is_empty() {
            return Err(ConfigError::invalid("channels", "at least one channel is required"));
        }

        let mut codes = HashSet::new();
        for language in &self.languages {
            if language.code.trim().is_empty() {
                return Err(ConfigError::invalid("languages", "language code is empty"));
            }
            if !codes.insert(language.code.as_str()) {
                return Err(ConfigError::invalid(
                    "languages",
                    format!("duplicate language code '{}'", language.code),
                ));
            }
        }

        let mut names = HashSet::new();
        for channel in &self.channels {
            if !names.insert(channel.name.as_str()) {
                return Err(ConfigError::invalid(
                    "channels",
                    format!("duplicate channel name '{}'", channel.name),
                ));
            }
        }

        if self.default_lookback_secs == 0 {
            return Err(ConfigError::invalid("default_lookback_secs", "must be positive"));
        }
        if self.max_lookback_secs < self.default_lookback_secs {
            return Err(ConfigError::invalid(
                "max_lookback_secs",
                "must not be shorter than default_lookback_secs",
            ));
        }
        if self.summary_words == 0 {
            return Err(ConfigError::invalid("summary_words", "must be positive"));
        }
        if self.call_timeout_secs == 0 || self.unit_timeout_secs == 0 {
            return Err(ConfigError::invalid("timeouts", "must be positive"));
        }
        if self.unit_timeout_secs < self.call_timeout_secs {
            return Err(ConfigError::invalid(
                "unit_timeout_secs",
                "must not be shorter than call_timeout_secs",
            ));
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::invalid("max_concurrency", "must be positive"));
        }
        Ok(())
    }
}
