//! Picks the `path` label a measurement is filed under.
//!
//! Resolution never fails: a candidate that does not parse as a URI with a
//! path component is used verbatim. Regex-shaped patterns hit that routinely.

use http::Uri;
use tracing::debug;

use crate::config::MetricsConfiguration;
use crate::event::RequestOutcome;

/// Label for `outcome`, or `None` when the outcome must not be recorded.
pub fn resolve_path(outcome: &RequestOutcome, config: &MetricsConfiguration) -> Option<String> {
    if !outcome.matched {
        if !config.should_register_not_matched_requests() {
            return None;
        }
        return Some(strip_query(&outcome.request_url, config));
    }

    if config.should_use_request_url() {
        return Some(strip_query(&outcome.request_url, config));
    }

    // Mapping-pattern labels
    let candidate = match &outcome.mapping_url_pattern {
        Some(p) if p.is_any_url() && config.should_register_any_url_mapping_as_request_url() => {
            outcome.request_url.as_str()
        }
        Some(p) => p.expected(),
        // Matched without a pattern: nothing better than the raw URL
        None => outcome.request_url.as_str(),
    };
    Some(strip_query(candidate, config))
}

/// Path component of `candidate` when query stripping is on.
fn strip_query(candidate: &str, config: &MetricsConfiguration) -> String {
    if !config.should_ignore_query_params() {
        return candidate.to_owned();
    }
    match candidate.parse::<Uri>() {
        // Authority-form parses ("(always)", ".*") carry no path
        Ok(uri) if uri.path().is_empty() => {
            debug!(label = candidate, "label has no path component; keeping it whole");
            candidate.to_owned()
        }
        Ok(uri) => uri.path().to_owned(),
        Err(e) => {
            debug!(label = candidate, error = %e, "label is not a URI; keeping query string");
            candidate.to_owned()
        }
    }
}
