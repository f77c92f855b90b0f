//! Shared state between the scheduled job and the status server.
use chrono::{DateTime, Utc};
use newsdesk_core::RunResult;
use std::sync::{Arc, RwLock};

use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AppState {
    latest: Arc<RwLock<Option<RunResult>>>,
    metrics: Arc<Metrics>,
    pub started_at: DateTime<Utc>,
    pub pipeline_id: String,
}

impl AppState {
    pub fn new(metrics: Metrics, pipeline_id: impl Into<String>) -> Self {
        Self {
            latest: Arc::new(RwLock::new(None)),
            metrics: Arc::new(metrics),
            started_at: Utc::now(),
            pipeline_id: pipeline_id.into(),
        }
    }

    pub fn record(&self, result: RunResult) {
        self.metrics.observe(&result);
        *self.latest.write().unwrap_or_else(|p| p.into_inner()) = Some(result);
    }

    pub fn latest(&self) -> Option<RunResult> {
        self.latest
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}
