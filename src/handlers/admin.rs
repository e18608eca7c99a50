use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::metrics::{SeriesSnapshot, CONTENT_TYPE};
use crate::AppState;

// ─── GET /__admin/prometheus-metrics ─────────────────────────────

/// Text exposition of the registry, verbatim. Nothing cached.
pub async fn prometheus_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, CONTENT_TYPE)],
        state.scrape.scrape(),
    )
}

// ─── GET /__admin/metrics ────────────────────────────────────────

/// JSON view of every series with its percentile breakdown, for ad-hoc
/// curl / debugging.
#[derive(Debug, Serialize)]
pub struct MetricsReport {
    pub generated_at: String,
    pub series: Vec<SeriesSnapshot>,
}

pub async fn metrics_snapshot(State(state): State<Arc<AppState>>) -> Json<MetricsReport> {
    Json(MetricsReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        series: state.scrape.registry().snapshot(),
    })
}
