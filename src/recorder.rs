use std::sync::Arc;

use tracing::{trace, warn};

use crate::config::{MetricsConfiguration, MetricsOptions};
use crate::error::ConfigError;
use crate::event::RequestOutcome;
use crate::metrics::{MetricDef, MetricKind, MetricRegistry};
use crate::path_resolver::resolve_path;

const BASE_UNIT: &str = "ms";

/// Entry point called once per completed exchange.
///
/// Stateless apart from the frozen configuration and the shared registry,
/// so one instance can be shared across every worker.
pub struct MetricRecorder {
    config: MetricsConfiguration,
    registry: Arc<MetricRegistry>,
    /// Dotted metric name per kind, indexed like `MetricKind::ALL`
    names: [String; 4],
}

impl MetricRecorder {
    /// Recorder with the default configuration.
    pub fn new(registry: Arc<MetricRegistry>) -> Self {
        Self::with_configuration(MetricsConfiguration::default(), registry)
    }

    /// Validate `options` and build a recorder from them.
    pub fn with_options(
        options: MetricsOptions,
        registry: Arc<MetricRegistry>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::with_configuration(options.validate()?, registry))
    }

    pub fn with_configuration(config: MetricsConfiguration, registry: Arc<MetricRegistry>) -> Self {
        let names = MetricKind::ALL.map(|kind| kind.metric_name(config.metric_prefix()));
        let distribution = config.distribution();

        for (kind, name) in MetricKind::ALL.iter().zip(&names) {
            registry.register(MetricDef {
                name: name.clone(),
                help: kind.description().into(),
                base_unit: Some(BASE_UNIT.into()),
                distribution: distribution.clone(),
            });
        }

        Self {
            config,
            registry,
            names,
        }
    }

    pub fn configuration(&self) -> &MetricsConfiguration {
        &self.config
    }

    pub fn registry(&self) -> &Arc<MetricRegistry> {
        &self.registry
    }

    /// Record every enabled timing of `outcome`.
    ///
    /// Never fails: a kind that cannot be recorded is logged and skipped
    /// without affecting the others.
    pub fn record_outcome(&self, outcome: &RequestOutcome) {
        let Some(path) = resolve_path(outcome, &self.config) else {
            trace!(url = %outcome.request_url, "unmatched request not recorded");
            return;
        };

        for (kind, name) in MetricKind::ALL.iter().zip(&self.names) {
            if !self.config.is_enabled(*kind) {
                continue;
            }
            let value = outcome.timing.value(*kind);
            if let Err(e) = self
                .registry
                .record(name, &path, &outcome.method, outcome.status, value)
            {
                warn!(metric = %name, path = %path, error = %e, "failed to record latency");
            }
        }
    }
}
