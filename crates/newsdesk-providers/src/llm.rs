//! Hosted text-generation models.
//!
//! Request: `POST {endpoint}/{model}` with `{"inputs": prompt, "parameters": {...}}`.
//! Response: `[{"generated_text": ...}]`, a single object, or `[{"translation_text": ...}]`
//! for dedicated translation models.

use async_trait::async_trait;
use newsdesk_core::{Language, LanguageModel, NewsItem, ProviderError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::{check_status, decode_error, require_key, transport_error};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub summarize_model: String,
    pub translate_model: String,
    pub max_new_tokens: u32,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api-inference.huggingface.co/models".to_string(),
            api_key: None,
            summarize_model: "meta-llama/Llama-2-70b-chat-hf".to_string(),
            translate_model: "mistralai/Mixtral-8x7B-Instruct-v0.1".to_string(),
            max_new_tokens: 1024,
            temperature: 0.3,
        }
    }
}

pub struct HttpLanguageModel {
    client: Client,
    config: LlmConfig,
}

impl HttpLanguageModel {
    pub fn new(client: Client, config: LlmConfig) -> Self {
        Self { client, config }
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, ProviderError> {
        let key = require_key(&self.config.api_key, "HUGGINGFACE_API_KEY")?;
        let url = format!("{}/{}", self.config.endpoint.trim_end_matches('/'), model);
        let body = json!({
            "inputs": prompt,
            "parameters": {
                "max_new_tokens": self.config.max_new_tokens,
                "temperature": self.config.temperature,
                "return_full_text": false,
            },
            "options": { "wait_for_model": true },
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let value: Value = check_status(response)
            .await?
            .json()
            .await
            .map_err(decode_error)?;

        let text = decode_generation(&value, prompt)?;
        debug!(model, chars = text.len(), "Generation completed");
        Ok(text)
    }
}

#[async_trait]
impl LanguageModel for HttpLanguageModel {
    async fn summarize(
        &self,
        items: &[NewsItem],
        target_words: usize,
    ) -> Result<String, ProviderError> {
        let prompt = summarize_prompt(items, target_words);
        self.generate(&self.config.summarize_model, &prompt).await
    }

    async fn translate(&self, text: &str, language: &Language) -> Result<String, ProviderError> {
        let prompt = translate_prompt(text, language);
        self.generate(&self.config.translate_model, &prompt).await
    }
}

pub fn summarize_prompt(items: &[NewsItem], target_words: usize) -> String {
    let mut prompt = format!(
        "You are a financial analyst. Write a clear, factual summary of about {target_words} words \
         covering the following financial news headlines. Group related stories, mention the \
         sources, and do not invent facts.\n\n"
    );
    for item in items {
        prompt.push_str(&format!(
            "- [{}] {} ({}) {}\n",
            item.timestamp.format("%Y-%m-%d %H:%M UTC"),
            item.title,
            item.source,
            item.url
        ));
    }
    prompt.push_str("\nSummary:\n");
    prompt
}

pub fn translate_prompt(text: &str, language: &Language) -> String {
    format!(
        "Translate the following financial report into {} ({}). Keep numbers, company names \
         and tickers unchanged. Reply with the translation only.\n\n{}\n\nTranslation:\n",
        language.name, language.code, text
    )
}

/// Extract generated text; strips an echoed prompt if the endpoint returns full text.
pub fn decode_generation(value: &Value, prompt: &str) -> Result<String, ProviderError> {
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return Err(ProviderError::Http(format!("model error: {error}")));
    }

    let first = match value {
        Value::Array(items) => items.first(),
        Value::Object(_) => Some(value),
        _ => None,
    }
    .ok_or_else(|| decode_error("empty generation response"))?;

    let text = ["generated_text", "translation_text", "summary_text"]
        .iter()
        .find_map(|key| first.get(*key).and_then(Value::as_str))
        .ok_or_else(|| decode_error(format!("no generated text in {first}")))?;

    let text = text.strip_prefix(prompt).unwrap_or(text);
    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_summarize_prompt_lists_items() {
        let items = vec![NewsItem {
            title: "Oil climbs".into(),
            source: "Bloomberg".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            url: "https://example.com/oil".into(),
        }];
        let prompt = summarize_prompt(&items, 500);
        assert!(prompt.contains("about 500 words"));
        assert!(prompt.contains("- [2024-03-01 12:00 UTC] Oil climbs (Bloomberg) https://example.com/oil"));
    }

    #[test]
    fn test_translate_prompt_names_language() {
        let prompt = translate_prompt("Markets rose.", &Language::new("ta", "Tamil"));
        assert!(prompt.contains("into Tamil (ta)"));
        assert!(prompt.contains("Markets rose."));
    }

    #[test]
    fn test_decode_generation_shapes() {
        let arr = json!([{ "generated_text": "  Stocks rallied.  " }]);
        assert_eq!(decode_generation(&arr, "p").unwrap(), "Stocks rallied.");

        let obj = json!({ "translation_text": "שוק" });
        assert_eq!(decode_generation(&obj, "p").unwrap(), "שוק");

        let echoed = json!([{ "generated_text": "PROMPT: answer" }]);
        assert_eq!(decode_generation(&echoed, "PROMPT:").unwrap(), "answer");
    }

    #[test]
    fn test_decode_generation_errors() {
        let loading = json!({ "error": "Model is currently loading" });
        assert!(matches!(
            decode_generation(&loading, ""),
            Err(ProviderError::Http(_))
        ));
        assert!(matches!(
            decode_generation(&json!([]), ""),
            Err(ProviderError::Decode(_))
        ));
        assert!(matches!(
            decode_generation(&json!([{ "label": "x" }]), ""),
            Err(ProviderError::Decode(_))
        ));
    }
}
