//! Newsdesk Providers: HTTP adapters for the pipeline collaborators
//!
//! - [`HttpNewsSource`]: news search API returning article lists
//! - [`HttpLanguageModel`]: hosted text-generation endpoint (`{"inputs": ...}`)
//! - [`BrevoEmailSender`]: transactional e-mail with the report attached
//! - [`TelegramSender`]: bot `sendDocument` upload per chat

pub mod email;
pub mod llm;
pub mod news;
pub mod telegram;

pub use email::{BrevoConfig, BrevoEmailSender};
pub use llm::{HttpLanguageModel, LlmConfig};
pub use news::{HttpNewsSource, NewsApiConfig};
pub use telegram::{TelegramConfig, TelegramSender};

use newsdesk_core::{ProviderError, NEWSDESK_VERSION};
use reqwest::{Client, Response, StatusCode};
use std::path::Path;
use std::time::Duration;

/// Shared HTTP client for all providers.
pub fn http_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(format!("newsdesk/{NEWSDESK_VERSION}"))
        .build()
        .map_err(|e| ProviderError::Config(format!("http client: {e}")))
}

/// Turn a non-2xx response into a typed error, keeping a bounded slice of the body.
pub(crate) async fn check_status(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(300).collect();
    Err(status_error(status, &body))
}

pub(crate) fn status_error(status: StatusCode, body: &str) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::Auth(format!("{status}: {body}"))
        }
        _ => ProviderError::Http(format!("{status}: {body}")),
    }
}

pub(crate) fn transport_error(e: reqwest::Error) -> ProviderError {
    ProviderError::Http(e.to_string())
}

pub(crate) fn decode_error(e: impl std::fmt::Display) -> ProviderError {
    ProviderError::Decode(e.to_string())
}

pub(crate) fn require_key<'a>(key: &'a Option<String>, what: &str) -> Result<&'a str, ProviderError> {
    match key.as_deref() {
        Some(k) if !k.trim().is_empty() => Ok(k),
        _ => Err(ProviderError::Config(format!("{what} is not set"))),
    }
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report.html".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_kinds() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, "bad key"),
            ProviderError::Auth(_)
        ));
        let err = status_error(StatusCode::SERVICE_UNAVAILABLE, "loading");
        assert_eq!(err.to_string(), "HTTP/503 Service Unavailable: loading");
    }

    #[test]
    fn test_require_key() {
        assert!(require_key(&None, "BREVO_API_KEY").is_err());
        assert!(require_key(&Some("  ".into()), "BREVO_API_KEY").is_err());
        assert_eq!(require_key(&Some("k".into()), "x").unwrap(), "k");
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(Path::new("/tmp/run/report_he.html")), "report_he.html");
        assert_eq!(file_name(Path::new("/")), "report.html");
    }
}
