//! MetricRegistry - the table of latency series and its owners.
//!
//! Series are created lazily on first observation and live until `clear()`.
//! `Registries` replaces a process-global registry list: hosts hand it
//! around explicitly and the scrape endpoint asks it for the single target.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::percentiles::PercentileSet;
use super::series::{DistributionConfig, LatencySeries, SeriesData};
use crate::error::{RecordError, StartupError};

/// Metric definition with metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDef {
    /// Dotted metric name (e.g. `wiremock.request.totalTime`)
    pub name: String,
    /// Help text describing the metric
    pub help: String,
    /// Unit appended to the exposed family name (e.g. `ms`)
    pub base_unit: Option<String>,
    /// Layout for every series created under this name
    pub distribution: DistributionConfig,
}

/// Identity of one series. Ordering drives render order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeriesKey {
    pub name: String,
    pub path: String,
    pub method: String,
    pub status: u16,
}

/// Serializable per-series summary for the JSON admin view.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesSnapshot {
    pub metric: String,
    pub path: String,
    pub method: String,
    pub status: u16,
    pub count: u64,
    pub sum_ms: f64,
    pub max_ms: f64,
    pub percentiles: PercentileSet,
}

/// Central registry for latency series.
///
/// The recorder defines its metrics once at construction, then records
/// from any number of threads. At most one `LatencySeries` ever backs a
/// given `SeriesKey`.
#[derive(Default)]
pub struct MetricRegistry {
    defs: RwLock<BTreeMap<String, Arc<MetricDef>>>,
    series: RwLock<BTreeMap<SeriesKey, Arc<LatencySeries>>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a metric. The first definition of a name wins; later ones are
    /// ignored so repeated registration is harmless.
    pub fn register(&self, def: MetricDef) {
        let mut defs = self.defs.write();
        if defs.contains_key(&def.name) {
            debug!(metric = %def.name, "metric already registered");
            return;
        }
        defs.insert(def.name.clone(), Arc::new(def));
    }

    pub fn definition(&self, name: &str) -> Option<Arc<MetricDef>> {
        self.defs.read().get(name).cloned()
    }

    /// Get-or-create the series for this identity and append `value_ms`.
    pub fn record(
        &self,
        name: &str,
        path: &str,
        method: &str,
        status: u16,
        value_ms: f64,
    ) -> Result<(), RecordError> {
        if path.is_empty() {
            return Err(RecordError::EmptyLabel("path"));
        }
        if method.is_empty() {
            return Err(RecordError::EmptyLabel("method"));
        }
        if !value_ms.is_finite() || value_ms < 0.0 {
            return Err(RecordError::InvalidValue(value_ms));
        }

        let key = SeriesKey {
            name: name.to_owned(),
            path: path.to_owned(),
            method: method.to_owned(),
            status,
        };
        self.get_or_create(key)?.record(value_ms)
    }

    fn get_or_create(&self, key: SeriesKey) -> Result<Arc<LatencySeries>, RecordError> {
        // Fast path: series already exists
        if let Some(series) = self.series.read().get(&key) {
            return Ok(series.clone());
        }

        let def = self
            .definition(&key.name)
            .ok_or_else(|| RecordError::UnknownMetric(key.name.clone()))?;
        let fresh = LatencySeries::new(&def.distribution)?;

        // Slow path: a racing caller may have inserted first; theirs wins
        let mut series = self.series.write();
        Ok(series.entry(key).or_insert_with(|| Arc::new(fresh)).clone())
    }

    pub fn series_count(&self) -> usize {
        self.series.read().len()
    }

    /// Observation count of one series, or `None` if it was never created.
    pub fn count(&self, name: &str, path: &str, method: &str, status: u16) -> Option<u64> {
        let key = SeriesKey {
            name: name.to_owned(),
            path: path.to_owned(),
            method: method.to_owned(),
            status,
        };
        self.series.read().get(&key).map(|s| s.count())
    }

    /// Every registered metric with a snapshot of its series, in name order.
    ///
    /// Each series is snapshotted under its own lock; series are not
    /// mutually consistent.
    pub fn collect(&self) -> Vec<(Arc<MetricDef>, Vec<(SeriesKey, SeriesData)>)> {
        let defs: Vec<Arc<MetricDef>> = self.defs.read().values().cloned().collect();
        let series: Vec<(SeriesKey, Arc<LatencySeries>)> = self
            .series
            .read()
            .iter()
            .map(|(k, s)| (k.clone(), s.clone()))
            .collect();

        defs.into_iter()
            .map(|def| {
                let data = series
                    .iter()
                    .filter(|(k, _)| k.name == def.name)
                    .map(|(k, s)| (k.clone(), s.snapshot()))
                    .collect();
                (def, data)
            })
            .collect()
    }

    /// Prometheus text exposition of the whole registry.
    pub fn render(&self) -> String {
        super::exposition::render(self)
    }

    pub fn snapshot(&self) -> Vec<SeriesSnapshot> {
        self.collect()
            .into_iter()
            .flat_map(|(_, series)| series)
            .map(|(key, data)| SeriesSnapshot {
                metric: key.name,
                path: key.path,
                method: key.method,
                status: key.status,
                count: data.count,
                sum_ms: data.sum_ms,
                max_ms: data.max_ms,
                percentiles: data.percentiles,
            })
            .collect()
    }

    /// Drop every series. Definitions stay so recording can resume.
    pub fn clear(&self) {
        self.series.write().clear();
    }
}

/// Registries known to the host process.
///
/// Startup expects exactly one scrape target here; anything else means a
/// second instance is competing for the same slot.
#[derive(Default)]
pub struct Registries {
    entries: RwLock<Vec<Arc<MetricRegistry>>>,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, registry: Arc<MetricRegistry>) {
        self.entries.write().push(registry);
    }

    /// Detach one registry. Returns false if it was not attached.
    pub fn remove(&self, registry: &Arc<MetricRegistry>) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|r| !Arc::ptr_eq(r, registry));
        entries.len() != before
    }

    /// Detach everything, clearing each registry on the way out.
    ///
    /// Call once traffic has drained. A `record` racing this call may land
    /// in a series that has already left the map and is never rendered.
    pub fn clear(&self) {
        for registry in self.entries.write().drain(..) {
            registry.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The single attached registry.
    pub fn scrape_target(&self) -> Result<Arc<MetricRegistry>, StartupError> {
        let entries = self.entries.read();
        match entries.as_slice() {
            [only] => Ok(only.clone()),
            other => Err(StartupError::ScrapeTargetCount { found: other.len() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAME: &str = "wiremock.request.totalTime";

    fn registry() -> MetricRegistry {
        let registry = MetricRegistry::new();
        registry.register(MetricDef {
            name: NAME.into(),
            help: "Request time latency".into(),
            base_unit: Some("ms".into()),
            distribution: DistributionConfig::default(),
        });
        registry
    }

    #[test]
    fn test_same_identity_shares_series() {
        let registry = registry();
        registry.record(NAME, "/a", "GET", 200, 1.0).unwrap();
        registry.record(NAME, "/a", "GET", 200, 2.0).unwrap();
        registry.record(NAME, "/a", "GET", 500, 2.0).unwrap();

        assert_eq!(registry.series_count(), 2);
        assert_eq!(registry.count(NAME, "/a", "GET", 200), Some(2));
        assert_eq!(registry.count(NAME, "/a", "GET", 500), Some(1));
        assert_eq!(registry.count(NAME, "/b", "GET", 200), None);
    }

    #[test]
    fn test_concurrent_first_observations_converge() {
        let registry = registry();
        let threads = 16;
        let per_thread = 250;

        std::thread::scope(|s| {
            for _ in 0..threads {
                s.spawn(|| {
                    for i in 0..per_thread {
                        registry.record(NAME, "/race", "GET", 200, i as f64).unwrap();
                    }
                });
            }
        });

        assert_eq!(registry.series_count(), 1);
        assert_eq!(
            registry.count(NAME, "/race", "GET", 200),
            Some((threads * per_thread) as u64)
        );
    }

    #[test]
    fn test_first_definition_wins() {
        let registry = registry();
        registry.register(MetricDef {
            name: NAME.into(),
            help: "other".into(),
            base_unit: None,
            distribution: DistributionConfig::new(Some(5.0), false, vec![]),
        });
        let def = registry.definition(NAME).unwrap();
        assert_eq!(def.help, "Request time latency");
        assert_eq!(def.distribution, DistributionConfig::default());
    }

    #[test]
    fn test_record_errors() {
        let registry = registry();
        assert_eq!(
            registry.record("nope", "/a", "GET", 200, 1.0),
            Err(RecordError::UnknownMetric("nope".into()))
        );
        assert_eq!(
            registry.record(NAME, "", "GET", 200, 1.0),
            Err(RecordError::EmptyLabel("path"))
        );
        assert_eq!(
            registry.record(NAME, "/a", "", 200, 1.0),
            Err(RecordError::EmptyLabel("method"))
        );
        assert!(registry.record(NAME, "/a", "GET", 200, f64::NAN).is_err());
        assert_eq!(registry.series_count(), 0);
    }

    #[test]
    fn test_clear_keeps_definitions() {
        let registry = registry();
        registry.record(NAME, "/a", "GET", 200, 1.0).unwrap();
        registry.clear();
        assert_eq!(registry.series_count(), 0);
        registry.record(NAME, "/a", "GET", 200, 1.0).unwrap();
        assert_eq!(registry.count(NAME, "/a", "GET", 200), Some(1));
    }

    #[test]
    fn test_snapshot_lists_series() {
        let registry = registry();
        registry.record(NAME, "/a", "GET", 200, 4.0).unwrap();
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].path, "/a");
        assert_eq!(snapshot[0].count, 1);
        assert_eq!(snapshot[0].max_ms, 4.0);
    }

    #[test]
    fn test_scrape_target_requires_exactly_one() {
        let registries = Registries::new();
        assert!(matches!(
            registries.scrape_target(),
            Err(StartupError::ScrapeTargetCount { found: 0 })
        ));

        let first = Arc::new(registry());
        registries.add(first.clone());
        assert!(Arc::ptr_eq(&registries.scrape_target().unwrap(), &first));

        let second = Arc::new(MetricRegistry::new());
        registries.add(second.clone());
        assert!(matches!(
            registries.scrape_target(),
            Err(StartupError::ScrapeTargetCount { found: 2 })
        ));

        assert!(registries.remove(&second));
        assert!(!registries.remove(&second));
        assert_eq!(registries.len(), 1);
    }

    #[test]
    fn test_recording_after_detach_starts_fresh() {
        let registries = Registries::new();
        let registry = Arc::new(registry());
        registries.add(registry.clone());
        registry.record(NAME, "/a", "GET", 200, 1.0).unwrap();

        registries.clear();
        registry.record(NAME, "/a", "GET", 200, 2.0).unwrap();

        assert_eq!(registry.count(NAME, "/a", "GET", 200), Some(1));
        assert!(registries.scrape_target().is_err());
    }

    #[test]
    fn test_clear_detaches_and_empties() {
        let registries = Registries::new();
        let registry = Arc::new(registry());
        registry.record(NAME, "/a", "GET", 200, 1.0).unwrap();
        registries.add(registry.clone());

        registries.clear();
        assert!(registries.is_empty());
        assert_eq!(registry.series_count(), 0);
    }
}
