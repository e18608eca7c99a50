pub mod exposition;
pub mod percentiles;
pub mod registry;
pub mod series;

pub use exposition::{ScrapeEndpoint, CONTENT_TYPE};
pub use percentiles::PercentileSet;
pub use registry::{MetricDef, MetricRegistry, Registries, SeriesKey, SeriesSnapshot};
pub use series::{DistributionConfig, LatencySeries, SeriesData};

/// The four latency breakdowns recorded per exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    TotalTime,
    ProcessingTime,
    ServeTime,
    ResponseSendTime,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::TotalTime,
        MetricKind::ProcessingTime,
        MetricKind::ServeTime,
        MetricKind::ResponseSendTime,
    ];

    /// Last segment of the dotted metric name.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::TotalTime => "totalTime",
            Self::ProcessingTime => "processingTime",
            Self::ServeTime => "serveTime",
            Self::ResponseSendTime => "responseSendTime",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::TotalTime => "Request time latency",
            Self::ProcessingTime => "Processing time latency",
            Self::ServeTime => "Serve time latency",
            Self::ResponseSendTime => "Response send time latency",
        }
    }

    /// e.g. `wiremock.request.totalTime`
    pub fn metric_name(self, prefix: &str) -> String {
        format!("{prefix}.request.{}", self.suffix())
    }
}
