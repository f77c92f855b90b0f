//! Brevo transactional e-mail sender.
//!
//! One request per document; every channel recipient goes in `to`. The
//! rendered report travels as a base64 attachment.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use newsdesk_core::{ChannelConfig, DeliveryReceipt, DocumentRef, ProviderError, Sender};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::{check_status, decode_error, file_name, require_key, transport_error};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrevoConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub sender_email: String,
    pub sender_name: String,
    pub subject: String,
}

impl Default for BrevoConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.brevo.com/v3/smtp/email".to_string(),
            api_key: None,
            sender_email: "reports@newsdesk.local".to_string(),
            sender_name: "Newsdesk".to_string(),
            subject: "Daily financial news summary".to_string(),
        }
    }
}

pub struct BrevoEmailSender {
    client: Client,
    config: BrevoConfig,
}

impl BrevoEmailSender {
    pub fn new(client: Client, config: BrevoConfig) -> Self {
        Self { client, config }
    }

    pub fn request_body(&self, document: &DocumentRef, recipients: &[String], content: &[u8]) -> Value {
        let name = file_name(&document.path);
        let to: Vec<Value> = recipients.iter().map(|r| json!({ "email": r })).collect();
        json!({
            "sender": { "name": self.config.sender_name, "email": self.config.sender_email },
            "to": to,
            "subject": format!("{} ({})", self.config.subject, name),
            "htmlContent": format!(
                "<p>{} is attached.</p>",
                self.config.subject
            ),
            "attachment": [{ "name": name, "content": STANDARD.encode(content) }],
        })
    }
}

#[async_trait]
impl Sender for BrevoEmailSender {
    async fn send(
        &self,
        document: &DocumentRef,
        channel: &ChannelConfig,
    ) -> Result<DeliveryReceipt, ProviderError> {
        let key = require_key(&self.config.api_key, "BREVO_API_KEY")?;
        if channel.recipients.is_empty() {
            return Err(ProviderError::Config(format!(
                "channel '{}' has no recipients",
                channel.name
            )));
        }

        let content = tokio::fs::read(&document.path).await?;
        let body = self.request_body(document, &channel.recipients, &content);

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("api-key", key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let value: Value = check_status(response)
            .await?
            .json()
            .await
            .map_err(decode_error)?;

        let receipt = match value.get("messageId").and_then(Value::as_str) {
            Some(id) => DeliveryReceipt::with_reference(id),
            None => DeliveryReceipt::default(),
        };
        debug!(
            channel = %channel.name,
            recipients = channel.recipients.len(),
            message_id = ?receipt.reference,
            "E-mail accepted"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsdesk_core::ChannelKind;

    fn document(path: std::path::PathBuf) -> DocumentRef {
        DocumentRef {
            path,
            mime: "text/html".into(),
            bytes: 5,
        }
    }

    #[test]
    fn test_request_body() {
        let sender = BrevoEmailSender::new(Client::new(), BrevoConfig::default());
        let body = sender.request_body(
            &document("/out/run/report_hi.html".into()),
            &["a@example.com".into(), "b@example.com".into()],
            b"hello",
        );

        assert_eq!(body["to"][1]["email"], "b@example.com");
        assert_eq!(body["attachment"][0]["name"], "report_hi.html");
        assert_eq!(body["attachment"][0]["content"], "aGVsbG8=");
        assert_eq!(body["sender"]["name"], "Newsdesk");
    }

    #[tokio::test]
    async fn test_missing_key_is_config_error() {
        let sender = BrevoEmailSender::new(Client::new(), BrevoConfig::default());
        let channel = ChannelConfig {
            name: "email".into(),
            kind: ChannelKind::Email,
            recipients: vec!["a@example.com".into()],
        };
        let err = sender
            .send(&document("/nonexistent".into()), &channel)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Config(_)));
    }

    #[tokio::test]
    async fn test_no_recipients_is_config_error() {
        let config = BrevoConfig {
            api_key: Some("key".into()),
            ..BrevoConfig::default()
        };
        let sender = BrevoEmailSender::new(Client::new(), config);
        let channel = ChannelConfig {
            name: "email".into(),
            kind: ChannelKind::Email,
            recipients: vec![],
        };
        let err = sender
            .send(&document("/nonexistent".into()), &channel)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no recipients"));
    }
}
