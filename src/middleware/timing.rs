use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::event::{RequestOutcome, Timing, UrlPattern};
use crate::handlers::stubs::request_url;
use crate::AppState;

/// Attached to a response by the stub handler; its absence means the
/// request was not a stub exchange (admin routes) and is not recorded.
#[derive(Debug, Clone)]
pub struct ServeDetails {
    /// Pattern of the mapping that served the request, `None` when unmatched
    pub mapping_url_pattern: Option<UrlPattern>,
    /// Time spent finding the mapping
    pub processing_time: Duration,
    /// Time spent building the response
    pub serve_time: Duration,
}

/// Tower-compatible middleware that turns every stub exchange into a
/// `RequestOutcome` and hands it to the recorder:
///
///   total            : wall time around the inner service
///   processing/serve : taken from `ServeDetails`
///   response send    : whatever remains of the total
pub async fn timing_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().as_str().to_owned();
    let url = request_url(req.uri());

    let start = Instant::now();
    let response = next.run(req).await;
    let total = start.elapsed();

    let Some(details) = response.extensions().get::<ServeDetails>() else {
        return response;
    };

    let timing = Timing {
        total_time_ms: millis(total),
        processing_time_ms: millis(details.processing_time),
        serve_time_ms: millis(details.serve_time),
        response_send_time_ms: millis(
            total
                .saturating_sub(details.processing_time)
                .saturating_sub(details.serve_time),
        ),
    };
    let status = response.status().as_u16();

    debug!(
        status,
        method = %method,
        url = %url,
        total_ms = timing.total_time_ms,
        "stub served"
    );

    let outcome = RequestOutcome {
        request_url: url,
        method,
        status,
        matched: details.mapping_url_pattern.is_some(),
        mapping_url_pattern: details.mapping_url_pattern.clone(),
        timing,
    };
    state.recorder.record_outcome(&outcome);

    response
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
