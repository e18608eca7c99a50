use axum::{middleware as axum_mw, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::StartupError;
use crate::handlers;
use crate::metrics::{MetricRegistry, Registries, ScrapeEndpoint};
use crate::middleware::timing;
use crate::recorder::MetricRecorder;
use crate::settings::Settings;
use crate::stubs::StubStore;
use crate::AppState;

/// Prefix the admin routes are mounted under.
pub const ADMIN_PREFIX: &str = "/__admin";

/// Builds the full Axum `Router`: admin routes, stub fallback, middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    let admin = Router::new()
        .route("/prometheus-metrics", get(handlers::admin::prometheus_metrics))
        .route("/metrics", get(handlers::admin::metrics_snapshot));

    Router::new()
        // ── Admin endpoints ─────────────────────────────────────
        .nest(ADMIN_PREFIX, admin)
        // ── Everything else is a stub request ───────────────────
        .fallback(handlers::stubs::serve_stub)
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            timing::timing_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        // ── Provide shared state to all routes above ────────────
        .with_state(state)
}

/// Wires recorder, registry and stubs from `settings`.
///
/// A fresh registry is attached to `registries`; the scrape endpoint then
/// insists on finding exactly one there. On failure nothing stays attached.
pub fn build_state(settings: &Settings, registries: &Registries) -> Result<Arc<AppState>, StartupError> {
    let config = settings.metrics_configuration()?;
    let stubs = StubStore::new(settings.mappings.clone())?;

    let registry = Arc::new(MetricRegistry::new());
    registries.add(registry.clone());

    let scrape = match ScrapeEndpoint::discover(registries) {
        Ok(scrape) => scrape,
        Err(e) => {
            registries.remove(&registry);
            return Err(e);
        }
    };
    let recorder = Arc::new(MetricRecorder::with_configuration(config, registry));

    Ok(Arc::new(AppState {
        recorder,
        scrape,
        stubs,
    }))
}
