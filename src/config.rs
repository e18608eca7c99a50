use serde::Deserialize;

use crate::error::ConfigError;
use crate::metrics::{DistributionConfig, MetricKind};

// ─── Defaults ────────────────────────────────────────────────────

const DEFAULT_PREFIX: &str = "wiremock";

/// Quantiles published when the bucket histogram is switched off.
const DEFAULT_PERCENTILES: [f64; 3] = [0.5, 0.95, 0.99];

fn default_true() -> bool {
    true
}
fn default_prefix() -> String {
    DEFAULT_PREFIX.into()
}
fn default_percentiles() -> Vec<f64> {
    DEFAULT_PERCENTILES.to_vec()
}

// ─── Public types ────────────────────────────────────────────────

/// Where the `path` label of a measurement comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSource {
    /// The URL the client actually requested.
    RequestUrl,
    /// The URL pattern of the stub mapping that served the request.
    MappingUrlPattern,
}

/// Unvalidated recording options.
///
/// Setters consume and return the builder so chains compose:
///
/// ```
/// use wiremock_metrics::metrics_options;
///
/// let config = metrics_options()
///     .use_mapping_url_pattern()
///     .ignore_query_params()
///     .validate()
///     .unwrap();
/// assert!(config.should_ignore_query_params());
/// ```
///
/// Also deserializable from the `metrics` section of the settings file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MetricsOptions {
    pub use_request_url: bool,
    pub use_mapping_url_pattern: bool,
    pub ignore_query_params: bool,
    pub register_not_matched_requests: bool,
    pub register_any_url_mapping_as_request_url: bool,

    #[serde(default = "default_true")]
    pub total_time: bool,
    #[serde(default = "default_true")]
    pub processing_time: bool,
    #[serde(default = "default_true")]
    pub serve_time: bool,
    #[serde(default = "default_true")]
    pub response_send_time: bool,

    pub max_expected_latency_ms: Option<f64>,

    #[serde(default = "default_true")]
    pub percentile_histogram: bool,
    #[serde(default = "default_percentiles")]
    pub percentiles: Vec<f64>,
    #[serde(default = "default_prefix")]
    pub metric_prefix: String,
}

impl Default for MetricsOptions {
    fn default() -> Self {
        Self {
            use_request_url: false,
            use_mapping_url_pattern: false,
            ignore_query_params: false,
            register_not_matched_requests: false,
            register_any_url_mapping_as_request_url: false,
            total_time: true,
            processing_time: true,
            serve_time: true,
            response_send_time: true,
            max_expected_latency_ms: None,
            percentile_histogram: true,
            percentiles: default_percentiles(),
            metric_prefix: default_prefix(),
        }
    }
}

/// Empty option set. Exactly one label source must be picked before
/// `validate()` will accept it.
pub fn metrics_options() -> MetricsOptions {
    MetricsOptions::default()
}

impl MetricsOptions {
    pub fn use_request_url(mut self) -> Self {
        self.use_request_url = true;
        self
    }

    pub fn use_mapping_url_pattern(mut self) -> Self {
        self.use_mapping_url_pattern = true;
        self
    }

    pub fn ignore_query_params(mut self) -> Self {
        self.ignore_query_params = true;
        self
    }

    pub fn register_not_matched_requests(mut self) -> Self {
        self.register_not_matched_requests = true;
        self
    }

    /// Label requests served by the catch-all mapping with their real URL
    /// instead of the catch-all marker.
    pub fn register_any_url_mapping_as_request_url(mut self) -> Self {
        self.register_any_url_mapping_as_request_url = true;
        self
    }

    pub fn total_time(mut self, enabled: bool) -> Self {
        self.total_time = enabled;
        self
    }

    pub fn processing_time(mut self, enabled: bool) -> Self {
        self.processing_time = enabled;
        self
    }

    pub fn serve_time(mut self, enabled: bool) -> Self {
        self.serve_time = enabled;
        self
    }

    pub fn response_send_time(mut self, enabled: bool) -> Self {
        self.response_send_time = enabled;
        self
    }

    pub fn max_expected_latency_ms(mut self, max_ms: f64) -> Self {
        self.max_expected_latency_ms = Some(max_ms);
        self
    }

    pub fn percentile_histogram(mut self, enabled: bool) -> Self {
        self.percentile_histogram = enabled;
        self
    }

    pub fn percentiles(mut self, quantiles: impl Into<Vec<f64>>) -> Self {
        self.percentiles = quantiles.into();
        self
    }

    pub fn metric_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.metric_prefix = prefix.into();
        self
    }

    /// Check the option set and freeze it.
    pub fn validate(self) -> Result<MetricsConfiguration, ConfigError> {
        let label_source = match (self.use_request_url, self.use_mapping_url_pattern) {
            (true, true) => return Err(ConfigError::ConflictingLabelSource),
            (false, false) => return Err(ConfigError::NoLabelSource),
            (true, false) => LabelSource::RequestUrl,
            (false, true) => LabelSource::MappingUrlPattern,
        };

        if let Some(max) = self.max_expected_latency_ms {
            if !max.is_finite() || max <= 0.0 {
                return Err(ConfigError::InvalidMaxExpectedLatency(max));
            }
        }

        if let Some(&bad) = self
            .percentiles
            .iter()
            .find(|q| !(0.0..=1.0).contains(*q))
        {
            return Err(ConfigError::InvalidPercentile(bad));
        }

        let prefix_ok = !self.metric_prefix.is_empty()
            && self
                .metric_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !prefix_ok {
            return Err(ConfigError::InvalidPrefix(self.metric_prefix));
        }

        Ok(MetricsConfiguration {
            label_source,
            ignore_query_params: self.ignore_query_params,
            register_not_matched_requests: self.register_not_matched_requests,
            register_any_url_mapping_as_request_url: self
                .register_any_url_mapping_as_request_url,
            total_time: self.total_time,
            processing_time: self.processing_time,
            serve_time: self.serve_time,
            response_send_time: self.response_send_time,
            max_expected_latency_ms: self.max_expected_latency_ms,
            percentile_histogram: self.percentile_histogram,
            percentiles: self.percentiles,
            metric_prefix: self.metric_prefix,
        })
    }
}

/// Validated recording policy. Read-only for the life of the recorder.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsConfiguration {
    label_source: LabelSource,
    ignore_query_params: bool,
    register_not_matched_requests: bool,
    register_any_url_mapping_as_request_url: bool,
    total_time: bool,
    processing_time: bool,
    serve_time: bool,
    response_send_time: bool,
    max_expected_latency_ms: Option<f64>,
    percentile_histogram: bool,
    percentiles: Vec<f64>,
    metric_prefix: String,
}

impl Default for MetricsConfiguration {
    /// Request-URL labels, all four timings, no query stripping, unmatched
    /// requests ignored.
    fn default() -> Self {
        Self {
            label_source: LabelSource::RequestUrl,
            ignore_query_params: false,
            register_not_matched_requests: false,
            register_any_url_mapping_as_request_url: false,
            total_time: true,
            processing_time: true,
            serve_time: true,
            response_send_time: true,
            max_expected_latency_ms: None,
            percentile_histogram: true,
            percentiles: default_percentiles(),
            metric_prefix: default_prefix(),
        }
    }
}

impl MetricsConfiguration {
    pub fn label_source(&self) -> LabelSource {
        self.label_source
    }

    pub fn should_use_request_url(&self) -> bool {
        self.label_source == LabelSource::RequestUrl
    }

    pub fn should_use_mapping_url_pattern(&self) -> bool {
        self.label_source == LabelSource::MappingUrlPattern
    }

    pub fn should_ignore_query_params(&self) -> bool {
        self.ignore_query_params
    }

    pub fn should_register_not_matched_requests(&self) -> bool {
        self.register_not_matched_requests
    }

    pub fn should_register_any_url_mapping_as_request_url(&self) -> bool {
        self.register_any_url_mapping_as_request_url
    }

    pub fn is_enabled(&self, kind: MetricKind) -> bool {
        match kind {
            MetricKind::TotalTime => self.total_time,
            MetricKind::ProcessingTime => self.processing_time,
            MetricKind::ServeTime => self.serve_time,
            MetricKind::ResponseSendTime => self.response_send_time,
        }
    }

    pub fn max_expected_latency_ms(&self) -> Option<f64> {
        self.max_expected_latency_ms
    }

    pub fn metric_prefix(&self) -> &str {
        &self.metric_prefix
    }

    /// Histogram layout handed to every series this configuration creates.
    pub fn distribution(&self) -> DistributionConfig {
        DistributionConfig::new(
            self.max_expected_latency_ms,
            self.percentile_histogram,
            self.percentiles.clone(),
        )
    }
}
