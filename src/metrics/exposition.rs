//! Prometheus text format export
//!
//! Every registered metric becomes one family (histogram or summary) plus a
//! `_max` gauge family. Labels are always written `path`, `method`, `status`.
//!
//! ```text
//! # HELP wiremock_request_totalTime_ms Request time latency
//! # TYPE wiremock_request_totalTime_ms histogram
//! wiremock_request_totalTime_ms_bucket{path="/api",method="GET",status="200",le="0.5"} 0
//! wiremock_request_totalTime_ms_bucket{path="/api",method="GET",status="200",le="+Inf"} 2
//! wiremock_request_totalTime_ms_count{path="/api",method="GET",status="200"} 2
//! wiremock_request_totalTime_ms_sum{path="/api",method="GET",status="200"} 3.5
//! ```

use std::fmt::Write;
use std::sync::Arc;

use super::registry::{MetricDef, MetricRegistry, Registries, SeriesKey};
use super::series::SeriesData;
use crate::error::StartupError;

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Read-only handle the admin route scrapes.
#[derive(Clone)]
pub struct ScrapeEndpoint {
    registry: Arc<MetricRegistry>,
}

impl ScrapeEndpoint {
    pub fn new(registry: Arc<MetricRegistry>) -> Self {
        Self { registry }
    }

    /// Bind to the one registry in `registries`; zero or several is fatal.
    pub fn discover(registries: &Registries) -> Result<Self, StartupError> {
        registries.scrape_target().map(Self::new)
    }

    pub fn registry(&self) -> &Arc<MetricRegistry> {
        &self.registry
    }

    pub fn scrape(&self) -> String {
        self.registry.render()
    }
}

/// Export the registry in Prometheus text format.
pub fn render(registry: &MetricRegistry) -> String {
    let mut output = String::with_capacity(4096);

    for (def, series) in registry.collect() {
        if series.is_empty() {
            continue;
        }
        let name = family_name(&def);
        if def.distribution.percentile_histogram() {
            write_histogram(&mut output, &name, &def.help, &series);
        } else {
            write_summary(&mut output, &name, &def.help, &series);
        }
        write_max(&mut output, &name, &def.help, &series);
    }

    output
}

fn write_histogram(output: &mut String, name: &str, help: &str, series: &[(SeriesKey, SeriesData)]) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} histogram");

    for (key, data) in series {
        let labels = format_labels(key);
        for &(bound, count) in &data.buckets {
            let le = format_value(bound);
            let _ = writeln!(output, "{name}_bucket{{{labels},le=\"{le}\"}} {count}");
        }
        let _ = writeln!(output, "{name}_bucket{{{labels},le=\"+Inf\"}} {}", data.count);
        write_count_sum(output, name, &labels, data);
    }
}

fn write_summary(output: &mut String, name: &str, help: &str, series: &[(SeriesKey, SeriesData)]) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} summary");

    for (key, data) in series {
        let labels = format_labels(key);
        for &(quantile, value) in &data.quantiles {
            let _ = writeln!(
                output,
                "{name}{{{labels},quantile=\"{}\"}} {}",
                format_value(quantile),
                format_value(value)
            );
        }
        write_count_sum(output, name, &labels, data);
    }
}

fn write_count_sum(output: &mut String, name: &str, labels: &str, data: &SeriesData) {
    let _ = writeln!(output, "{name}_count{{{labels}}} {}", data.count);
    let _ = writeln!(output, "{name}_sum{{{labels}}} {}", format_value(data.sum_ms));
}

fn write_max(output: &mut String, name: &str, help: &str, series: &[(SeriesKey, SeriesData)]) {
    let _ = writeln!(output, "# HELP {name}_max {help}");
    let _ = writeln!(output, "# TYPE {name}_max gauge");
    for (key, data) in series {
        let labels = format_labels(key);
        let _ = writeln!(output, "{name}_max{{{labels}}} {}", format_value(data.max_ms));
    }
}

/// `wiremock.request.totalTime` + `ms` → `wiremock_request_totalTime_ms`
fn family_name(def: &MetricDef) -> String {
    let mut name: String = def
        .name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == ':' { c } else { '_' })
        .collect();
    if let Some(unit) = &def.base_unit {
        name.push('_');
        name.push_str(unit);
    }
    name
}

fn format_labels(key: &SeriesKey) -> String {
    format!(
        "path=\"{}\",method=\"{}\",status=\"{}\"",
        escape_label(&key.path),
        escape_label(&key.method),
        key.status
    )
}

fn escape_label(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Integer-like values without a fraction, everything else as-is.
fn format_value(value: f64) -> String {
    if value == value.floor() && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::DistributionConfig;

    const NAME: &str = "wiremock.request.totalTime";

    fn registry(distribution: DistributionConfig) -> MetricRegistry {
        let registry = MetricRegistry::new();
        registry.register(MetricDef {
            name: NAME.into(),
            help: "Request time latency".into(),
            base_unit: Some("ms".into()),
            distribution,
        });
        registry
    }

    #[test]
    fn test_empty_registry_renders_nothing() {
        assert_eq!(render(&registry(DistributionConfig::default())), "");
    }

    #[test]
    fn test_histogram_family() {
        let registry = registry(DistributionConfig::new(Some(10.0), true, vec![]));
        registry.record(NAME, "/simple-test", "GET", 200, 0.3).unwrap();
        registry.record(NAME, "/simple-test", "GET", 200, 3.2).unwrap();

        let output = render(&registry);
        let labels = r#"path="/simple-test",method="GET",status="200""#;

        assert!(output.contains("# HELP wiremock_request_totalTime_ms Request time latency"));
        assert!(output.contains("# TYPE wiremock_request_totalTime_ms histogram"));
        assert!(output.contains(&format!("wiremock_request_totalTime_ms_bucket{{{labels},le=\"0.5\"}} 1")));
        assert!(output.contains(&format!("wiremock_request_totalTime_ms_bucket{{{labels},le=\"2\"}} 1")));
        assert!(output.contains(&format!("wiremock_request_totalTime_ms_bucket{{{labels},le=\"10\"}} 2")));
        assert!(output.contains(&format!("wiremock_request_totalTime_ms_bucket{{{labels},le=\"+Inf\"}} 2")));
        assert!(output.contains(&format!("wiremock_request_totalTime_ms_count{{{labels}}} 2")));
        assert!(output.contains(&format!("wiremock_request_totalTime_ms_sum{{{labels}}} 3.5")));
        assert!(output.contains("# TYPE wiremock_request_totalTime_ms_max gauge"));
        assert!(output.contains(&format!("wiremock_request_totalTime_ms_max{{{labels}}} 3.2")));
    }

    #[test]
    fn test_summary_family() {
        let registry = registry(DistributionConfig::new(None, false, vec![0.5]));
        registry.record(NAME, "/s", "POST", 201, 1.0).unwrap();

        let output = render(&registry);
        assert!(output.contains("# TYPE wiremock_request_totalTime_ms summary"));
        assert!(output.contains(
            r#"wiremock_request_totalTime_ms{path="/s",method="POST",status="201",quantile="0.5"} 1"#
        ));
        assert!(!output.contains("_bucket"));
        assert!(output.contains(r#"wiremock_request_totalTime_ms_count{path="/s",method="POST",status="201"} 1"#));
    }

    #[test]
    fn test_label_values_escaped() {
        let registry = registry(DistributionConfig::default());
        registry.record(NAME, "/q\"uote\\d", "GET", 200, 1.0).unwrap();

        let output = render(&registry);
        assert!(output.contains(r#"path="/q\"uote\\d""#), "{output}");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(2.0), "2");
        assert_eq!(format_value(0.5), "0.5");
        assert_eq!(format_value(60_000.0), "60000");
    }

    #[test]
    fn test_scrape_endpoint_discovery() {
        let registries = Registries::new();
        assert!(ScrapeEndpoint::discover(&registries).is_err());

        let registry = Arc::new(registry(DistributionConfig::default()));
        registries.add(registry.clone());
        registry.record(NAME, "/a", "GET", 200, 1.0).unwrap();

        let endpoint = ScrapeEndpoint::discover(&registries).unwrap();
        assert_eq!(endpoint.scrape(), registry.render());
    }
}
