//! Unified Error Model
use serde::{Deserialize, Serialize};
use std::any::Any;
use thiserror::Error;

/// Sub-kind shared by every stage error.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ErrorKind {
    #[error("PROVIDER/{0}")]
    Provider(String),

    #[error("TIMEOUT/{0}ms")]
    Timeout(u64),

    #[error("EMPTY")]
    EmptyResult,

    /// Fan-out where some, but not all, units failed.
    #[error("PARTIAL/{failed} of {total} failed")]
    PartialFailure { failed: usize, total: usize },

    /// Fan-out where every unit failed.
    #[error("ALL_FAILED/{total}")]
    AllFailed { total: usize },

    #[error("UNEXPECTED/{0}")]
    Unexpected(String),
}

/// Typed error returned by a stage. The variant names the stage family,
/// the inner [`ErrorKind`] says what went wrong.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", content = "error", rename_all = "snake_case")]
pub enum StageError {
    #[error("COLLECT/{0}")]
    Collection(ErrorKind),

    #[error("SUMMARIZE/{0}")]
    Summarization(ErrorKind),

    #[error("TRANSLATE/{0}")]
    Translation(ErrorKind),

    #[error("DISTRIBUTE/{0}")]
    Distribution(ErrorKind),
}

impl StageError {
    pub fn kind(&self) -> &ErrorKind {
        match self {
            Self::Collection(kind)
            | Self::Summarization(kind)
            | Self::Translation(kind)
            | Self::Distribution(kind) => kind,
        }
    }

    /// Whether later stages must be skipped after this error.
    ///
    /// A partially failed fan-out still produced usable artifacts, so the
    /// pipeline keeps going with them.
    pub fn is_blocking(&self) -> bool {
        !matches!(self.kind(), ErrorKind::PartialFailure { .. })
    }
}

/// Error raised by an external collaborator (news API, model, renderer, sender).
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP/{0}")]
    Http(String),

    #[error("AUTH/{0}")]
    Auth(String),

    #[error("DECODE/{0}")]
    Decode(String),

    #[error("CONFIG/{0}")]
    Config(String),

    #[error("IO/{0}")]
    Io(#[from] std::io::Error),

    #[error("PROVIDER/{0}")]
    Other(String),
}

impl From<ProviderError> for ErrorKind {
    fn from(err: ProviderError) -> Self {
        ErrorKind::Provider(err.to_string())
    }
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_failure_is_not_blocking() {
        let err = StageError::Translation(ErrorKind::PartialFailure { failed: 1, total: 3 });
        assert!(!err.is_blocking());

        let err = StageError::Translation(ErrorKind::AllFailed { total: 3 });
        assert!(err.is_blocking());

        let err = StageError::Collection(ErrorKind::EmptyResult);
        assert!(err.is_blocking());
    }

    #[test]
    fn test_display_codes() {
        let err = StageError::Summarization(ErrorKind::Timeout(1500));
        assert_eq!(err.to_string(), "SUMMARIZE/TIMEOUT/1500ms");

        let err = StageError::Collection(ProviderError::Auth("bad key".into()).into());
        assert_eq!(err.to_string(), "COLLECT/PROVIDER/AUTH/bad key");
    }

    #[test]
    fn test_stage_error_serializes_with_kind() {
        let err = StageError::Distribution(ErrorKind::PartialFailure { failed: 2, total: 4 });
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["stage"], "distribution");
        assert_eq!(value["error"]["kind"], "partial_failure");
        assert_eq!(value["error"]["detail"]["failed"], 2);
    }

    #[test]
    fn test_panic_message_variants() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(boxed.as_ref()), "owned boom");

        let boxed: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(boxed.as_ref()), "panic with non-string payload");
    }
}
