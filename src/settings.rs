//! Settings file for the stub server binary.
//!
//! ```json
//! {
//!   "bind": "0.0.0.0:8080",
//!   "metrics": { "use_mapping_url_pattern": true, "ignore_query_params": true },
//!   "mappings": [
//!     { "method": "GET", "url": { "urlPathEqualTo": "/simple-test" },
//!       "response": { "status": 200, "body": "test" } }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::config::{MetricsConfiguration, MetricsOptions};
use crate::error::ConfigError;
use crate::stubs::StubMapping;

fn default_bind() -> String {
    "0.0.0.0:8080".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Listen address
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Recording options; absent means the default configuration
    #[serde(default)]
    pub metrics: Option<MetricsOptions>,

    /// Stub mappings, matched in order
    #[serde(default)]
    pub mappings: Vec<StubMapping>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            metrics: None,
            mappings: Vec::new(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse settings file {}", path.display()))
    }

    /// Validated recording policy for this settings file.
    pub fn metrics_configuration(&self) -> Result<MetricsConfiguration, ConfigError> {
        match &self.metrics {
            Some(options) => options.clone().validate(),
            None => Ok(MetricsConfiguration::default()),
        }
    }
}
