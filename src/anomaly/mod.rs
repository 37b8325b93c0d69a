//! z-score aggregation, scalar anomaly score, and behavioral flag derivation.

use crate::pipeline::{ModelSnapshot, PipelineModel};
use crate::telemetry::sample::{Metric, Sample};

const Z_THRESHOLD_FLAG: f64 = 3.0;
const Z_STDDEV_EPSILON: f64 = 1e-9;
const ANOMALY_SCORE_THRESHOLD: f64 = 0.7;
const ANOMALY_SCORE_K: f64 = 1.0;
const HARD_FILES_MODIFIED_PER_SEC: f64 = 500.0;
const HARD_FILES_RENAMED_PER_SEC: f64 = 200.0;
const HARD_DISK_WRITE_BYTES_PER_SEC: f64 = 50.0 * 1024.0 * 1024.0;

/// A bit in [`AnomalyResult::flags`] naming a specific behavioral pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum AnomalyFlag {
    CryptoSpike = 1,
    WriteStorm = 2,
    RenameStorm = 4,
    DeleteStorm = 8,
}

/// Output of one anomaly evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyResult {
    pub is_anomalous: bool,
    pub z_score: f64,
    pub anomaly_score: f64,
    pub flags: u32,
}

impl AnomalyResult {
    /// Whether `flag` is set in [`Self::flags`].
    #[must_use]
    pub const fn has_flag(&self, flag: AnomalyFlag) -> bool {
        self.flags & (flag as u32) != 0
    }
}

/// Derives per-metric z-scores from the pipeline model and composes them
/// into a scalar anomaly score plus a set of behavioral flags.
#[derive(Debug, Default)]
pub struct AnomalyEngine {
    model: PipelineModel,
}

impl AnomalyEngine {
    /// A fresh engine with an empty pipeline model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate `sample` against the current pipeline model, then update the
    /// model with `sample` (snapshot-then-update; see [`crate::pipeline`]).
    pub fn evaluate(&mut self, sample: &Sample) -> AnomalyResult {
        let snapshot = self.model.snapshot_and_update(sample);

        let z = |metric: Metric| abs_z(&snapshot, sample, metric);
        let z_aes = z(Metric::Aes);
        let z_cycles = z(Metric::Cycles);
        let z_instructions = z(Metric::Instructions);
        let z_files_modified = z(Metric::FilesModified);
        let z_files_renamed = z(Metric::FilesRenamed);
        let z_files_deleted = z(Metric::FilesDeleted);
        let z_disk_write = z(Metric::DiskWrite);

        let max_abs_z = [
            z_aes,
            z_cycles,
            z_instructions,
            z(Metric::CacheMissRate),
            z_files_modified,
            z_files_renamed,
            z_files_deleted,
            z_disk_write,
        ]
        .into_iter()
        .fold(0.0_f64, f64::max);

        let anomaly_score = if max_abs_z > 0.0 {
            1.0 - (-ANOMALY_SCORE_K * max_abs_z).exp()
        } else {
            0.0
        };

        let mut flags = 0u32;

        let crypto_spike = if sample.aes_supported() {
            z_aes >= Z_THRESHOLD_FLAG
        } else {
            z_cycles.max(z_instructions) >= Z_THRESHOLD_FLAG && z_disk_write >= Z_THRESHOLD_FLAG
        };
        if crypto_spike {
            flags |= AnomalyFlag::CryptoSpike as u32;
        }

        if z_files_modified >= Z_THRESHOLD_FLAG || z_disk_write >= Z_THRESHOLD_FLAG {
            flags |= AnomalyFlag::WriteStorm as u32;
        }
        if z_files_renamed >= Z_THRESHOLD_FLAG {
            flags |= AnomalyFlag::RenameStorm as u32;
        }
        if z_files_deleted >= Z_THRESHOLD_FLAG {
            flags |= AnomalyFlag::DeleteStorm as u32;
        }

        flags |= hard_threshold_flags(sample);

        let is_anomalous = anomaly_score >= ANOMALY_SCORE_THRESHOLD || flags != 0;

        AnomalyResult {
            is_anomalous,
            z_score: max_abs_z,
            anomaly_score,
            flags,
        }
    }
}

fn abs_z(snapshot: &ModelSnapshot, sample: &Sample, metric: Metric) -> f64 {
    if metric == Metric::Aes && !sample.aes_supported() {
        return 0.0;
    }

    let view = snapshot.get(metric);
    let value = sample.value(metric);

    if !view.ready || !value.is_finite() || !view.mean.is_finite() || !view.stddev.is_finite() {
        return 0.0;
    }
    if view.stddev <= Z_STDDEV_EPSILON {
        return 0.0;
    }

    let z = (value - view.mean).abs() / view.stddev;
    if z.is_finite() { z } else { 0.0 }
}

/// Absolute-threshold fallbacks so egregious activity trips flags even while
/// every z-score is still 0 during baseline warm-up. There is deliberately
/// no absolute fallback for `DELETE_STORM`.
fn hard_threshold_flags(sample: &Sample) -> u32 {
    let mut flags = 0u32;

    let files_modified_valid = sample.files_modified_per_sec.is_finite();
    let disk_write_valid = sample.disk_write_bytes_per_sec.is_finite();
    if (files_modified_valid && sample.files_modified_per_sec > HARD_FILES_MODIFIED_PER_SEC)
        || (disk_write_valid && sample.disk_write_bytes_per_sec > HARD_DISK_WRITE_BYTES_PER_SEC)
    {
        flags |= AnomalyFlag::WriteStorm as u32;
    }

    if sample.files_renamed_per_sec.is_finite()
        && sample.files_renamed_per_sec > HARD_FILES_RENAMED_PER_SEC
    {
        flags |= AnomalyFlag::RenameStorm as u32;
    }

    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline_sample() -> Sample {
        Sample {
            timestamp_ns: 0,
            aes_instructions_per_sec: 1e6,
            cycles_per_sec: 1e9,
            instructions_per_sec: 1e9,
            cache_miss_rate: 0.01,
            files_modified_per_sec: 10.0,
            files_renamed_per_sec: 1.0,
            files_deleted_per_sec: 0.0,
            disk_write_bytes_per_sec: 1e6,
            top_pid: 0,
            top_comm: String::new(),
            disk_read_bytes_per_sec: 0.0,
        }
    }

    fn warm_engine() -> AnomalyEngine {
        let mut engine = AnomalyEngine::new();
        for _ in 0..300 {
            engine.evaluate(&baseline_sample());
        }
        engine
    }

    #[test]
    fn score_is_always_in_unit_interval() {
        let mut engine = warm_engine();
        let mut spike = baseline_sample();
        spike.aes_instructions_per_sec = 1e12;
        let result = engine.evaluate(&spike);
        assert!(result.anomaly_score >= 0.0 && result.anomaly_score <= 1.0);
    }

    #[test]
    fn is_anomalous_matches_its_definition() {
        let mut engine = warm_engine();
        let result = engine.evaluate(&baseline_sample());
        assert_eq!(
            result.is_anomalous,
            result.anomaly_score >= ANOMALY_SCORE_THRESHOLD || result.flags != 0
        );
    }

    #[test]
    fn not_ready_means_zero_contribution_to_max_z() {
        let mut engine = AnomalyEngine::new();
        for i in 0..299 {
            let mut s = baseline_sample();
            s.aes_instructions_per_sec = 1e12 + i as f64;
            let result = engine.evaluate(&s);
            assert_eq!(result.z_score, 0.0);
            assert_eq!(result.flags, 0);
        }
    }

    #[test]
    fn crypto_spike_with_aes_support() {
        let mut engine = warm_engine();
        let mut spike = baseline_sample();
        spike.aes_instructions_per_sec = 1e8;
        let result = engine.evaluate(&spike);
        assert!(result.has_flag(AnomalyFlag::CryptoSpike));
    }

    #[test]
    fn write_rename_delete_storm_without_aes() {
        let mut engine = AnomalyEngine::new();
        let mut baseline = baseline_sample();
        baseline.aes_instructions_per_sec = -1.0;
        for _ in 0..300 {
            engine.evaluate(&baseline);
        }

        let mut spike = baseline;
        spike.files_modified_per_sec = 2000.0;
        spike.files_renamed_per_sec = 800.0;
        spike.files_deleted_per_sec = 400.0;
        spike.disk_write_bytes_per_sec = 200.0 * 1024.0 * 1024.0;

        let result = engine.evaluate(&spike);
        assert!(result.has_flag(AnomalyFlag::WriteStorm));
        assert!(result.has_flag(AnomalyFlag::RenameStorm));
        assert!(result.has_flag(AnomalyFlag::DeleteStorm));
        assert!(!result.has_flag(AnomalyFlag::CryptoSpike));
    }

    #[test]
    fn absolute_fallback_trips_during_warmup() {
        let mut engine = AnomalyEngine::new();
        let mut spike = baseline_sample();
        spike.files_modified_per_sec = 1000.0;
        spike.disk_write_bytes_per_sec = 100.0 * 1024.0 * 1024.0;
        let result = engine.evaluate(&spike);
        assert!(result.has_flag(AnomalyFlag::WriteStorm));
    }

    #[test]
    fn non_finite_metric_never_contributes_to_z() {
        let mut engine = warm_engine();
        let mut sample = baseline_sample();
        sample.cycles_per_sec = f64::NAN;
        let result = engine.evaluate(&sample);
        assert_eq!(result.z_score, 0.0);
    }

    #[test]
    fn no_absolute_fallback_for_delete_storm() {
        let mut engine = AnomalyEngine::new();
        let mut spike = baseline_sample();
        spike.files_deleted_per_sec = 1_000_000.0;
        let result = engine.evaluate(&spike);
        assert!(!result.has_flag(AnomalyFlag::DeleteStorm));
    }
}
