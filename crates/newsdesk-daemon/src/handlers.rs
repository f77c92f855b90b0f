//! Status handlers
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use newsdesk_core::NEWSDESK_VERSION;
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let uptime_secs = (Utc::now() - state.started_at).num_seconds();
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "version": NEWSDESK_VERSION,
            "pipeline": state.pipeline_id,
            "uptime_secs": uptime_secs,
        })),
    )
}

pub async fn latest_run(State(state): State<AppState>) -> Response {
    match state.latest() {
        Some(result) => (StatusCode::OK, Json(result)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no run has completed yet" })),
        )
            .into_response(),
    }
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics().encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}
