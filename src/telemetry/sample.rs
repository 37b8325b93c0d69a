//! The fixed sample shape produced once per tick.

/// Sentinel AES value meaning "not supported on this host".
pub const AES_UNSUPPORTED: f64 = -1.0;

/// Every metric the detection pipeline tracks, in the order the anomaly
/// engine evaluates them. `Aes` is the only metric that can report the
/// [`AES_UNSUPPORTED`] sentinel instead of a measured rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Aes,
    Cycles,
    Instructions,
    CacheMissRate,
    FilesModified,
    FilesRenamed,
    FilesDeleted,
    DiskWrite,
}

impl Metric {
    /// All eight tracked metrics, in evaluation order.
    pub const ALL: [Self; 8] = [
        Self::Aes,
        Self::Cycles,
        Self::Instructions,
        Self::CacheMissRate,
        Self::FilesModified,
        Self::FilesRenamed,
        Self::FilesDeleted,
        Self::DiskWrite,
    ];

    /// The seven metrics persisted in the baseline file, in their fixed
    /// on-disk order. `Instructions` is deliberately absent (see §9 of the
    /// design notes: it feeds the anomaly engine but is never persisted).
    pub const PERSISTED: [Self; 7] = [
        Self::Aes,
        Self::Cycles,
        Self::CacheMissRate,
        Self::FilesModified,
        Self::FilesRenamed,
        Self::FilesDeleted,
        Self::DiskWrite,
    ];
}

/// A single immutable telemetry observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Monotonic nanoseconds since agent start.
    pub timestamp_ns: u64,
    pub cycles_per_sec: f64,
    pub instructions_per_sec: f64,
    pub cache_miss_rate: f64,
    /// [`AES_UNSUPPORTED`] when the host has no usable AES throughput signal.
    pub aes_instructions_per_sec: f64,
    pub files_modified_per_sec: f64,
    pub files_renamed_per_sec: f64,
    pub files_deleted_per_sec: f64,
    /// The process currently suspected of crypto activity. Zero if none.
    pub top_pid: i32,
    /// Truncated to 63 bytes + NUL, matching the external contract.
    pub top_comm: String,
    /// Carried through but unused by the detection pipeline.
    pub disk_read_bytes_per_sec: f64,
    pub disk_write_bytes_per_sec: f64,
}

impl Sample {
    /// Whether the sample's AES field reports a real measurement rather than
    /// the unsupported sentinel.
    #[must_use]
    pub fn aes_supported(&self) -> bool {
        self.aes_instructions_per_sec != AES_UNSUPPORTED
    }

    /// The raw value for `metric`, exactly as carried on this sample.
    #[must_use]
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Aes => self.aes_instructions_per_sec,
            Metric::Cycles => self.cycles_per_sec,
            Metric::Instructions => self.instructions_per_sec,
            Metric::CacheMissRate => self.cache_miss_rate,
            Metric::FilesModified => self.files_modified_per_sec,
            Metric::FilesRenamed => self.files_renamed_per_sec,
            Metric::FilesDeleted => self.files_deleted_per_sec,
            Metric::DiskWrite => self.disk_write_bytes_per_sec,
        }
    }

    /// Whether `metric`'s value on this sample should be folded into a
    /// running statistic: finite, and (for AES) not the unsupported
    /// sentinel.
    #[must_use]
    pub fn is_valid_for_update(&self, metric: Metric) -> bool {
        let v = self.value(metric);
        if !v.is_finite() {
            return false;
        }
        if metric == Metric::Aes {
            return self.aes_supported();
        }
        true
    }
}
