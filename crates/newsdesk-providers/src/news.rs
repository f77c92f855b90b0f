//! News search over HTTP.
//!
//! The decoder accepts either a bare array of articles or an envelope with an
//! `articles` / `results` / `items` array. Per article:
//!
//! | field     | accepted keys                                   |
//! |-----------|-------------------------------------------------|
//! | title     | `title`                                         |
//! | source    | `source` (string or `{name}`)                   |
//! | timestamp | `publishedAt`, `published_at`, `timestamp`, `date` |
//! | url       | `url`, `link`                                   |
//!
//! Articles missing a title, url or parseable timestamp are dropped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use newsdesk_core::{LookbackWindow, NewsItem, NewsSource, ProviderError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{check_status, decode_error, transport_error};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsApiConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub query: String,
    pub language: String,
    pub page_size: u32,
}

impl Default for NewsApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://newsapi.org/v2/everything".to_string(),
            api_key: None,
            query: "stock market OR earnings OR central bank".to_string(),
            language: "en".to_string(),
            page_size: 50,
        }
    }
}

pub struct HttpNewsSource {
    client: Client,
    config: NewsApiConfig,
}

impl HttpNewsSource {
    pub fn new(client: Client, config: NewsApiConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl NewsSource for HttpNewsSource {
    async fn search(&self, window: LookbackWindow) -> Result<Vec<NewsItem>, ProviderError> {
        let mut request = self.client.get(&self.config.endpoint).query(&[
            ("q", self.config.query.clone()),
            ("language", self.config.language.clone()),
            ("from", window.from.to_rfc3339()),
            ("to", window.to.to_rfc3339()),
            ("sortBy", "publishedAt".to_string()),
            ("pageSize", self.config.page_size.to_string()),
        ]);
        if let Some(key) = self.config.api_key.as_deref() {
            request = request.header("X-Api-Key", key);
        }

        let response = request.send().await.map_err(transport_error)?;
        let body: Value = check_status(response)
            .await?
            .json()
            .await
            .map_err(decode_error)?;

        let items = decode_articles(&body)?;
        let in_window: Vec<NewsItem> = items
            .into_iter()
            .filter(|item| item.timestamp >= window.from && item.timestamp <= window.to)
            .collect();

        debug!(
            endpoint = %self.config.endpoint,
            items = in_window.len(),
            "News search completed"
        );
        Ok(in_window)
    }
}

pub fn decode_articles(body: &Value) -> Result<Vec<NewsItem>, ProviderError> {
    let articles = match body {
        Value::Array(items) => items,
        Value::Object(map) => ["articles", "results", "items"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .ok_or_else(|| decode_error("response has no article list"))?,
        other => return Err(decode_error(format!("unexpected response: {other}"))),
    };

    let mut items = Vec::with_capacity(articles.len());
    for article in articles {
        match decode_article(article) {
            Some(item) => items.push(item),
            None => warn!(article = %article, "Dropping malformed article"),
        }
    }
    Ok(items)
}

fn decode_article(article: &Value) -> Option<NewsItem> {
    let title = article.get("title")?.as_str()?.trim();
    if title.is_empty() {
        return None;
    }

    let url = ["url", "link"]
        .iter()
        .find_map(|key| article.get(*key).and_then(Value::as_str))?;

    let source = match article.get("source") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(map)) => map
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    };

    let timestamp = ["publishedAt", "published_at", "timestamp", "date"]
        .iter()
        .filter_map(|key| article.get(*key).and_then(Value::as_str))
        .find_map(|raw| DateTime::parse_from_rfc3339(raw).ok())?
        .with_timezone(&Utc);

    Some(NewsItem {
        title: title.to_string(),
        source,
        timestamp,
        url: url.to_string(),
    })
}
