use serde::{Deserialize, Serialize};

use crate::metrics::MetricKind;

/// How a stub mapping selects requests by URL.
///
/// Serialized the way stub files spell it: `{"urlPathEqualTo": "/users"}`,
/// `{"urlMatching": "/users/.+"}` or the bare string `"anyUrl"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UrlPattern {
    /// Whole URL, query string included, compared literally.
    UrlEqualTo(String),
    /// Path only, compared literally.
    UrlPathEqualTo(String),
    /// Whole URL against a regex.
    UrlMatching(String),
    /// Path only against a regex.
    UrlPathMatching(String),
    /// Catch-all. Distinct from any regex that happens to accept everything.
    AnyUrl,
}

/// What `UrlPattern::AnyUrl` reports as its expected value.
pub const ANY_URL_EXPECTED: &str = "(always)";

impl UrlPattern {
    /// Literal or regex source text the pattern was declared with.
    pub fn expected(&self) -> &str {
        match self {
            Self::UrlEqualTo(s)
            | Self::UrlPathEqualTo(s)
            | Self::UrlMatching(s)
            | Self::UrlPathMatching(s) => s,
            Self::AnyUrl => ANY_URL_EXPECTED,
        }
    }

    pub fn is_any_url(&self) -> bool {
        matches!(self, Self::AnyUrl)
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, Self::UrlMatching(_) | Self::UrlPathMatching(_))
    }
}

/// Millisecond breakdown of one exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Timing {
    /// Wall time from request arrival to response completion
    pub total_time_ms: f64,
    /// Time spent finding the stub mapping
    pub processing_time_ms: f64,
    /// Time spent building the stub response
    pub serve_time_ms: f64,
    /// Remainder: writing the response back through the stack
    pub response_send_time_ms: f64,
}

impl Timing {
    pub fn value(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::TotalTime => self.total_time_ms,
            MetricKind::ProcessingTime => self.processing_time_ms,
            MetricKind::ServeTime => self.serve_time_ms,
            MetricKind::ResponseSendTime => self.response_send_time_ms,
        }
    }
}

/// One completed request/response exchange, consumed once by the recorder.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOutcome {
    /// Path plus query string, as the client sent it.
    pub request_url: String,
    pub method: String,
    pub status: u16,
    pub matched: bool,
    /// Present only when `matched` is true.
    pub mapping_url_pattern: Option<UrlPattern>,
    pub timing: Timing,
}

impl RequestOutcome {
    pub fn matched(
        request_url: impl Into<String>,
        method: impl Into<String>,
        status: u16,
        pattern: UrlPattern,
        timing: Timing,
    ) -> Self {
        Self {
            request_url: request_url.into(),
            method: method.into(),
            status,
            matched: true,
            mapping_url_pattern: Some(pattern),
            timing,
        }
    }

    pub fn unmatched(
        request_url: impl Into<String>,
        method: impl Into<String>,
        status: u16,
        timing: Timing,
    ) -> Self {
        Self {
            request_url: request_url.into(),
            method: method.into(),
            status,
            matched: false,
            mapping_url_pattern: None,
            timing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_text() {
        assert_eq!(UrlPattern::UrlPathEqualTo("/a".into()).expected(), "/a");
        assert_eq!(UrlPattern::UrlMatching("/a.+".into()).expected(), "/a.+");
        assert_eq!(UrlPattern::AnyUrl.expected(), "(always)");
    }

    #[test]
    fn test_pattern_json_shape() {
        let p: UrlPattern = serde_json::from_str(r#"{"urlPathMatching":"/x/.+"}"#).unwrap();
        assert_eq!(p, UrlPattern::UrlPathMatching("/x/.+".into()));
        assert!(p.is_regex());

        let any: UrlPattern = serde_json::from_str(r#""anyUrl""#).unwrap();
        assert!(any.is_any_url());
        assert!(!any.is_regex());
    }

    #[test]
    fn test_timing_value_per_kind() {
        let timing = Timing {
            total_time_ms: 10.0,
            processing_time_ms: 1.0,
            serve_time_ms: 2.0,
            response_send_time_ms: 7.0,
        };
        assert_eq!(timing.value(MetricKind::TotalTime), 10.0);
        assert_eq!(timing.value(MetricKind::ProcessingTime), 1.0);
        assert_eq!(timing.value(MetricKind::ServeTime), 2.0);
        assert_eq!(timing.value(MetricKind::ResponseSendTime), 7.0);
    }
}
