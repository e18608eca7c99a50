use axum::{
    extract::State,
    http::{HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

use crate::middleware::timing::ServeDetails;
use crate::stubs::StubResponse;
use crate::AppState;

use super::AppError;

// ─── Fallback: every non-admin request ───────────────────────────

/// Serves the first matching stub, or a 404 envelope.
///
/// Matching and response building are timed separately and handed to the
/// timing middleware through `ServeDetails`.
pub async fn serve_stub(State(state): State<Arc<AppState>>, method: Method, uri: Uri) -> Response {
    let url = request_url(&uri);

    // ── Processing: find the mapping ────────────────────────────
    let t_match = Instant::now();
    let found = state.stubs.find(method.as_str(), &url);
    let processing_time = t_match.elapsed();
    // ────────────────────────────────────────────────────────────

    // ── Serve: build the response ───────────────────────────────
    let t_serve = Instant::now();
    let (mut response, mapping_url_pattern) = match found {
        Some(mapping) => (build_response(&mapping.response), Some(mapping.url.clone())),
        None => {
            let err = AppError::NoStubMatched {
                method: method.to_string(),
                url,
            };
            (err.into_response(), None)
        }
    };
    let serve_time = t_serve.elapsed();
    // ────────────────────────────────────────────────────────────

    response.extensions_mut().insert(ServeDetails {
        mapping_url_pattern,
        processing_time,
        serve_time,
    });
    response
}

// ─── Helpers ─────────────────────────────────────────────────────

/// Path plus query string, as the client sent it.
pub fn request_url(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| uri.path().to_owned())
}

fn build_response(stub: &StubResponse) -> Response {
    let Ok(status) = StatusCode::from_u16(stub.status) else {
        return AppError::Internal(format!("stub status {} is not valid", stub.status))
            .into_response();
    };

    let mut response = (status, stub.body.clone()).into_response();
    for (name, value) in &stub.headers {
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().insert(name, value);
            }
            _ => warn!(header = %name, "skipping invalid stub header"),
        }
    }
    response
}
