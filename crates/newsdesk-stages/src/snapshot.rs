//! Per-run audit snapshot of the collected news items.
//!
//! The file is a JSON array of `{title, source, timestamp, url}` records with
//! ISO-8601 timestamps.
use newsdesk_core::NewsItem;
use std::path::Path;
use thiserror::Error;

pub const SNAPSHOT_FILE: &str = "news_items.json";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("SNAPSHOT/IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("SNAPSHOT/JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn to_json(items: &[NewsItem]) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string_pretty(items)?)
}

pub fn from_json(data: &str) -> Result<Vec<NewsItem>, SnapshotError> {
    Ok(serde_json::from_str(data)?)
}

pub async fn write_snapshot(path: &Path, items: &[NewsItem]) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, to_json(items)?).await?;
    Ok(())
}

pub async fn read_snapshot(path: &Path) -> Result<Vec<NewsItem>, SnapshotError> {
    let data = tokio::fs::read_to_string(path).await?;
    from_json(&data)
}
