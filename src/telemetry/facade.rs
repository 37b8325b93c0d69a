//! Adapter that converts the platform collectors' outputs into a single
//! [`Sample`] per tick, computing file-event rates from counted deltas.

use std::time::Instant;

use crate::core::errors::Result;
use crate::telemetry::cpu::CpuCounterCollector;
use crate::telemetry::fs_delta::FsDeltaCollector;
use crate::telemetry::io::IoRateCollector;
use crate::telemetry::process::ProcessAttributor;
use crate::telemetry::sample::{AES_UNSUPPORTED, Sample};

/// Minimum elapsed interval used when converting event counts to rates, to
/// avoid a division blowup on clock-granularity artifacts.
const RATE_EPSILON_SECONDS: f64 = 1e-6;

/// Assembles one [`Sample`] per tick from the CPU, filesystem, process, and
/// I/O collectors.
pub struct TelemetryFacade {
    cpu: CpuCounterCollector,
    fs: FsDeltaCollector,
    process: ProcessAttributor,
    io: IoRateCollector,
    last_tick_at: Option<Instant>,
    start: Instant,
}

impl TelemetryFacade {
    /// Bind the façade to `telemetry_root_path` for filesystem monitoring.
    pub fn init(telemetry_root_path: impl Into<std::path::PathBuf>) -> Result<Self> {
        Ok(Self {
            cpu: CpuCounterCollector::new(),
            fs: FsDeltaCollector::new(telemetry_root_path),
            process: ProcessAttributor::new(),
            io: IoRateCollector::new(),
            last_tick_at: None,
            start: Instant::now(),
        })
    }

    /// Collect one [`Sample`]. Never fails under normal operation; collector
    /// degradation (missing counters, unreadable `/proc`) is absorbed as
    /// zeroed/unsupported fields rather than propagated as an error, per the
    /// external collector contract.
    pub fn collect(&mut self) -> Result<Sample> {
        let now = Instant::now();
        let timestamp_ns = now.duration_since(self.start).as_nanos() as u64;

        let cpu = self.cpu.collect();
        let io = self.io.collect();
        let top = self.process.collect();
        let fs_counts = self.fs.collect();

        let rate_seconds = self.last_tick_at.map(|prev| {
            (now.duration_since(prev).as_secs_f64()).max(RATE_EPSILON_SECONDS)
        });

        let (files_modified_per_sec, files_renamed_per_sec, files_deleted_per_sec) =
            match rate_seconds {
                Some(dt) => (
                    fs_counts.files_modified as f64 / dt,
                    fs_counts.files_renamed as f64 / dt,
                    fs_counts.files_deleted as f64 / dt,
                ),
                // First tick: no prior timestamp, so no elapsed interval to
                // divide by yet.
                None => (0.0, 0.0, 0.0),
            };

        self.last_tick_at = Some(now);

        Ok(Sample {
            timestamp_ns,
            cycles_per_sec: cpu.cycles_per_sec,
            instructions_per_sec: cpu.instructions_per_sec,
            cache_miss_rate: cpu.cache_miss_rate,
            aes_instructions_per_sec: cpu.aes_instructions_per_sec,
            files_modified_per_sec,
            files_renamed_per_sec,
            files_deleted_per_sec,
            top_pid: top.pid,
            top_comm: top.comm,
            disk_read_bytes_per_sec: io.disk_read_bytes_per_sec,
            disk_write_bytes_per_sec: io.disk_write_bytes_per_sec,
        })
    }
}
