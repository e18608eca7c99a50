use hdrhistogram::Histogram;
use parking_lot::Mutex;

use super::percentiles::{PercentileSet, MICROS_PER_MS};
use crate::error::RecordError;

// ─── Configuration ───────────────────────────────────────────────

/// Default bucket ladder (ms): sub-millisecond up to a minute.
pub const DEFAULT_LATENCY_BUCKETS_MS: &[f64] = &[
    0.5, 1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1_000.0, 2_500.0, 5_000.0,
    10_000.0, 30_000.0, 60_000.0,
];

/// HdrHistogram range: 1 μs → 60 s, 3 significant figures
const HIST_LOW: u64 = 1;
const HIST_HIGH: u64 = 60_000_000;
const HIST_SIGFIG: u8 = 3;

/// Bucket and quantile layout shared by every series of one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionConfig {
    bounds_ms: Vec<f64>,
    percentile_histogram: bool,
    quantiles: Vec<f64>,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self::new(None, true, vec![0.5, 0.95, 0.99])
    }
}

impl DistributionConfig {
    /// With a `max_expected_ms` hint the ladder is cut below the hint and
    /// the hint itself becomes the last finite bound.
    pub fn new(max_expected_ms: Option<f64>, percentile_histogram: bool, quantiles: Vec<f64>) -> Self {
        let bounds_ms = match max_expected_ms {
            Some(max) => {
                let mut bounds: Vec<f64> = DEFAULT_LATENCY_BUCKETS_MS
                    .iter()
                    .copied()
                    .filter(|b| *b < max)
                    .collect();
                bounds.push(max);
                bounds
            }
            None => DEFAULT_LATENCY_BUCKETS_MS.to_vec(),
        };
        Self {
            bounds_ms,
            percentile_histogram,
            quantiles,
        }
    }

    /// Finite upper bounds, ascending. `+Inf` is implied.
    pub fn bounds_ms(&self) -> &[f64] {
        &self.bounds_ms
    }

    /// true = cumulative `_bucket` lines, false = `quantile` lines.
    pub fn percentile_histogram(&self) -> bool {
        self.percentile_histogram
    }

    pub fn quantiles(&self) -> &[f64] {
        &self.quantiles
    }
}

// ─── Public types ────────────────────────────────────────────────

/// Accumulator behind one `(metric, path, method, status)` identity.
///
/// Everything sits behind one lock so a snapshot never observes a
/// half-applied observation.
pub struct LatencySeries {
    inner: Mutex<Inner>,
}

/// Point-in-time copy of a series, ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesData {
    pub count: u64,
    pub sum_ms: f64,
    pub max_ms: f64,
    /// `(upper bound ms, cumulative count)` per finite bucket
    pub buckets: Vec<(f64, u64)>,
    /// `(quantile, value ms)` per configured quantile
    pub quantiles: Vec<(f64, f64)>,
    pub percentiles: PercentileSet,
}

// ─── Internal state ──────────────────────────────────────────────

struct Inner {
    // Raw distribution in microseconds, for quantiles
    hist: Histogram<u64>,

    // Exact accumulators
    count: u64,
    sum_ms: f64,
    max_ms: f64,

    // Upper bounds and non-cumulative hits; the last slot is overflow
    bounds_ms: Vec<f64>,
    bucket_hits: Vec<u64>,

    quantiles: Vec<f64>,
}

// ─── LatencySeries impl ──────────────────────────────────────────

impl LatencySeries {
    pub fn new(distribution: &DistributionConfig) -> Result<Self, RecordError> {
        let hist = Histogram::<u64>::new_with_bounds(HIST_LOW, HIST_HIGH, HIST_SIGFIG)
            .map_err(|e| RecordError::Histogram(format!("{e:?}")))?;
        let bounds_ms = distribution.bounds_ms.clone();
        let bucket_hits = vec![0; bounds_ms.len() + 1];

        Ok(Self {
            inner: Mutex::new(Inner {
                hist,
                count: 0,
                sum_ms: 0.0,
                max_ms: 0.0,
                bounds_ms,
                bucket_hits,
                quantiles: distribution.quantiles.clone(),
            }),
        })
    }

    /// Append one observation. Rejects negative and non-finite values.
    pub fn record(&self, value_ms: f64) -> Result<(), RecordError> {
        if !value_ms.is_finite() || value_ms < 0.0 {
            return Err(RecordError::InvalidValue(value_ms));
        }
        self.inner.lock().record(value_ms);
        Ok(())
    }

    pub fn count(&self) -> u64 {
        self.inner.lock().count
    }

    pub fn snapshot(&self) -> SeriesData {
        self.inner.lock().snapshot()
    }
}

// ─── Inner impl ──────────────────────────────────────────────────

impl Inner {
    fn record(&mut self, value_ms: f64) {
        self.count += 1;
        self.sum_ms += value_ms;
        if value_ms > self.max_ms {
            self.max_ms = value_ms;
        }

        // Values past HIST_HIGH are clamped; exact sum/max are kept above
        let us = (value_ms * MICROS_PER_MS).round() as u64;
        self.hist.saturating_record(us);

        // partition_point gives the first bound >= value
        let idx = self.bounds_ms.partition_point(|b| *b < value_ms);
        self.bucket_hits[idx] += 1;
    }

    fn snapshot(&self) -> SeriesData {
        let mut cumulative = 0;
        let buckets = self
            .bounds_ms
            .iter()
            .zip(&self.bucket_hits)
            .map(|(&bound, &hits)| {
                cumulative += hits;
                (bound, cumulative)
            })
            .collect();

        let quantiles = self
            .quantiles
            .iter()
            .map(|&q| {
                let value = if self.count == 0 {
                    0.0
                } else {
                    self.hist.value_at_quantile(q) as f64 / MICROS_PER_MS
                };
                (q, value)
            })
            .collect();

        SeriesData {
            count: self.count,
            sum_ms: self.sum_ms,
            max_ms: self.max_ms,
            buckets,
            quantiles,
            percentiles: PercentileSet::from_histogram(&self.hist),
        }
    }
}
