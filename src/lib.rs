//! Per-request latency metrics for a stub HTTP server, exposed in the
//! Prometheus text format.
//!
//! A completed exchange arrives as a [`RequestOutcome`]. The
//! [`MetricRecorder`] resolves its `path` label and files each enabled timing
//! into a shared [`MetricRegistry`], which the scrape endpoint renders on
//! demand.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod event;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod path_resolver;
pub mod recorder;
pub mod server;
pub mod settings;
pub mod stubs;

pub use config::{metrics_options, LabelSource, MetricsConfiguration, MetricsOptions};
pub use error::{ConfigError, RecordError, StartupError};
pub use event::{RequestOutcome, Timing, UrlPattern};
pub use metrics::{MetricKind, MetricRegistry, Registries, ScrapeEndpoint};
pub use path_resolver::resolve_path;
pub use recorder::MetricRecorder;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Turns completed stub exchanges into observations.
    pub recorder: Arc<MetricRecorder>,

    /// Read side of the registry for the admin routes.
    pub scrape: ScrapeEndpoint,

    /// Mappings the fallback handler serves from.
    pub stubs: stubs::StubStore,
}
