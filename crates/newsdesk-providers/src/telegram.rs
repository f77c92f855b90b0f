//! Telegram bot sender: `sendDocument` multipart upload, once per chat id.
use async_trait::async_trait;
use newsdesk_core::{ChannelConfig, DeliveryReceipt, DocumentRef, ProviderError, Sender};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{decode_error, file_name, require_key, status_error, transport_error};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub api_base: String,
    pub bot_token: Option<String>,
    pub caption: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".to_string(),
            bot_token: None,
            caption: "Daily financial news summary".to_string(),
        }
    }
}

pub struct TelegramSender {
    client: Client,
    config: TelegramConfig,
}

impl TelegramSender {
    pub fn new(client: Client, config: TelegramConfig) -> Self {
        Self { client, config }
    }

    fn method_url(&self, token: &str) -> String {
        format!(
            "{}/bot{}/sendDocument",
            self.config.api_base.trim_end_matches('/'),
            token
        )
    }

    async fn send_to_chat(
        &self,
        url: &str,
        chat_id: &str,
        document: &DocumentRef,
        content: Vec<u8>,
    ) -> Result<i64, ProviderError> {
        let part = Part::bytes(content)
            .file_name(file_name(&document.path))
            .mime_str(&document.mime)
            .map_err(|e| ProviderError::Config(format!("mime '{}': {e}", document.mime)))?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", self.config.caption.clone())
            .part("document", part);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        let body: Value = response.json().await.map_err(decode_error)?;
        decode_send_result(status, &body)
    }
}

/// Bot API replies `{"ok": true, "result": {"message_id": ..}}` or `{"ok": false, "description": ..}`.
///
/// A refusal carried by a 2xx reply is not an HTTP failure and maps to `Other`.
pub fn decode_send_result(status: reqwest::StatusCode, body: &Value) -> Result<i64, ProviderError> {
    if body.get("ok").and_then(Value::as_bool) != Some(true) {
        let description = body
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        if status.is_success() {
            return Err(ProviderError::Other(description.to_string()));
        }
        return Err(status_error(status, description));
    }
    body.pointer("/result/message_id")
        .and_then(Value::as_i64)
        .ok_or_else(|| decode_error("reply has no message_id"))
}

#[async_trait]
impl Sender for TelegramSender {
    async fn send(
        &self,
        document: &DocumentRef,
        channel: &ChannelConfig,
    ) -> Result<DeliveryReceipt, ProviderError> {
        let token = require_key(&self.config.bot_token, "TELEGRAM_BOT_TOKEN")?;
        if channel.recipients.is_empty() {
            return Err(ProviderError::Config(format!(
                "channel '{}' has no chat ids",
                channel.name
            )));
        }

        let url = self.method_url(token);
        let content = tokio::fs::read(&document.path).await?;
        let mut delivered = Vec::with_capacity(channel.recipients.len());
        let mut failed = Vec::new();
        for chat_id in &channel.recipients {
            match self
                .send_to_chat(&url, chat_id, document, content.clone())
                .await
            {
                Ok(id) => {
                    debug!(channel = %channel.name, chat_id = %chat_id, message_id = id, "Document sent");
                    delivered.push((chat_id.as_str(), id));
                }
                Err(e) => {
                    warn!(channel = %channel.name, chat_id = %chat_id, error = %e, "Document not sent");
                    failed.push((chat_id.as_str(), e));
                }
            }
        }

        if failed.is_empty() {
            let ids: Vec<String> = delivered.iter().map(|(_, id)| id.to_string()).collect();
            return Ok(DeliveryReceipt::with_reference(ids.join(",")));
        }
        if delivered.is_empty() && failed.len() == 1 {
            if let Some((_, e)) = failed.pop() {
                return Err(e);
            }
        }
        Err(ProviderError::Other(partial_delivery(&delivered, &failed)))
    }
}

/// `delivered: A=7; failed: B=chat not found`, so the record names who got the report.
fn partial_delivery(delivered: &[(&str, i64)], failed: &[(&str, ProviderError)]) -> String {
    let mut delivered: Vec<String> = delivered
        .iter()
        .map(|(chat, id)| format!("{chat}={id}"))
        .collect();
    if delivered.is_empty() {
        delivered.push("none".to_string());
    }
    let failed: Vec<String> = failed
        .iter()
        .map(|(chat, e)| format!("{chat}={e}"))
        .collect();
    format!("delivered: {}; failed: {}", delivered.join(","), failed.join(","))
}
