//! Block I/O rate collector: disk read/write byte rates derived from
//! successive cumulative-counter deltas.

use std::time::Instant;

/// One tick's worth of derived I/O rates.
#[derive(Debug, Clone, Copy, Default)]
pub struct IoMetrics {
    pub disk_read_bytes_per_sec: f64,
    pub disk_write_bytes_per_sec: f64,
}

struct LastReading {
    at: Instant,
    read_bytes: u64,
    write_bytes: u64,
}

/// Samples cumulative disk read/write byte counters and derives per-second
/// rates. Degrades to zero rates when the counters are unreadable.
pub struct IoRateCollector {
    last: Option<LastReading>,
}

impl IoRateCollector {
    #[must_use]
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Sample the counters and derive rates since the previous call.
    pub fn collect(&mut self) -> IoMetrics {
        let Some((read_bytes, write_bytes)) = platform::read_cumulative_bytes() else {
            return IoMetrics::default();
        };

        let now = Instant::now();
        let Some(prev) = &self.last else {
            self.last = Some(LastReading {
                at: now,
                read_bytes,
                write_bytes,
            });
            return IoMetrics::default();
        };

        let elapsed = now.duration_since(prev.at).as_secs_f64();
        if elapsed <= 0.0 {
            return IoMetrics::default();
        }

        let metrics = IoMetrics {
            disk_read_bytes_per_sec: read_bytes.saturating_sub(prev.read_bytes) as f64 / elapsed,
            disk_write_bytes_per_sec: write_bytes.saturating_sub(prev.write_bytes) as f64
                / elapsed,
        };

        self.last = Some(LastReading {
            at: now,
            read_bytes,
            write_bytes,
        });

        metrics
    }
}

impl Default for IoRateCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "linux")]
mod platform {
    /// Sum sectors read/written across all block devices in
    /// `/proc/diskstats`, converted to bytes (512 bytes/sector).
    pub fn read_cumulative_bytes() -> Option<(u64, u64)> {
        const SECTOR_BYTES: u64 = 512;
        let text = std::fs::read_to_string("/proc/diskstats").ok()?;

        let mut read_sectors = 0u64;
        let mut write_sectors = 0u64;
        for line in text.lines() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            // name is field index 2; sectors read is field 5, sectors
            // written is field 9 (0-indexed per the kernel documentation).
            if fields.len() < 10 {
                continue;
            }
            if let Ok(v) = fields[5].parse::<u64>() {
                read_sectors = read_sectors.saturating_add(v);
            }
            if let Ok(v) = fields[9].parse::<u64>() {
                write_sectors = write_sectors.saturating_add(v);
            }
        }

        Some((
            read_sectors.saturating_mul(SECTOR_BYTES),
            write_sectors.saturating_mul(SECTOR_BYTES),
        ))
    }
}

#[cfg(not(target_os = "linux"))]
mod platform {
    pub fn read_cumulative_bytes() -> Option<(u64, u64)> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_reports_zero_rate() {
        let mut collector = IoRateCollector::new();
        let metrics = collector.collect();
        assert_eq!(metrics.disk_read_bytes_per_sec, 0.0);
        assert_eq!(metrics.disk_write_bytes_per_sec, 0.0);
    }
}
