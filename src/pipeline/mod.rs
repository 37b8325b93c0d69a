//! The transient, process-local statistics model the anomaly engine reads.
//!
//! Deliberately separate from [`crate::baseline::BaselineStore`]: this model
//! is volatile (reset on restart), always available regardless of baseline
//! readiness, and updated under a **snapshot-then-update** protocol — every
//! call to [`PipelineModel::snapshot_and_update`] returns stats built from
//! samples *before* the current one, then folds the current sample in. This
//! ordering is the single most load-bearing invariant of the anomaly engine:
//! a sample's own value must never be able to inflate the stats used to
//! judge it.

use crate::stats::RunningStat;
use crate::telemetry::sample::{Metric, Sample};

/// Minimum accepted samples per metric before a metric view reports ready.
pub const READY_MIN_SAMPLES: u64 = 300;

/// A read-only view of one metric's stats at snapshot time.
#[derive(Debug, Clone, Copy)]
pub struct MetricView {
    pub count: u64,
    pub mean: f64,
    pub stddev: f64,
    pub ready: bool,
}

/// Snapshot of all eight tracked metrics, indexed by [`Metric`].
#[derive(Debug, Clone, Copy)]
pub struct ModelSnapshot {
    views: [MetricView; 8],
}

impl ModelSnapshot {
    /// The view for `metric`.
    #[must_use]
    pub fn get(&self, metric: Metric) -> MetricView {
        self.views[index_of(metric)]
    }
}

/// Process-local running stats for all eight tracked metrics.
#[derive(Debug, Default)]
pub struct PipelineModel {
    stats: [RunningStat; 8],
}

impl PipelineModel {
    /// A fresh model with no observations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot current stats, then fold `sample` into the running stats.
    /// The returned snapshot reflects state *before* `sample` was applied.
    pub fn snapshot_and_update(&mut self, sample: &Sample) -> ModelSnapshot {
        let snapshot = self.snapshot();
        for metric in Metric::ALL {
            if sample.is_valid_for_update(metric) {
                self.stats[index_of(metric)].update(sample.value(metric));
            }
        }
        snapshot
    }

    fn snapshot(&self) -> ModelSnapshot {
        let mut views = [MetricView {
            count: 0,
            mean: 0.0,
            stddev: 0.0,
            ready: false,
        }; 8];
        for metric in Metric::ALL {
            let stat = self.stats[index_of(metric)];
            views[index_of(metric)] = MetricView {
                count: stat.count(),
                mean: stat.mean(),
                stddev: stat.stddev(),
                ready: stat.is_ready(READY_MIN_SAMPLES),
            };
        }
        ModelSnapshot { views }
    }
}

fn index_of(metric: Metric) -> usize {
    Metric::ALL.iter().position(|m| *m == metric).unwrap()
}
