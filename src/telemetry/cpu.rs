//! Hardware performance counter sampling: cycles, instructions, cache misses.
//!
//! AES throughput has no portable hardware counter, so it is always reported
//! via the unsupported sentinel on this collector; a future host-specific
//! backend could populate it, which is why the sample format still carries a
//! dedicated AES field rather than dropping it.

use std::time::Instant;

use crate::telemetry::sample::AES_UNSUPPORTED;

/// One tick's worth of derived CPU counter rates.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuMetrics {
    pub cycles_per_sec: f64,
    pub instructions_per_sec: f64,
    pub cache_miss_rate: f64,
    pub aes_instructions_per_sec: f64,
}

/// Samples hardware performance counters and derives per-second rates from
/// successive deltas. Degrades to all-zero rates (never an error) when
/// counters are unavailable, matching the collector contract: counter
/// unavailability is a degraded-but-running state, not a fatal one.
pub struct CpuCounterCollector {
    backend: backend::Backend,
    last: Option<LastReading>,
}

struct LastReading {
    at: Instant,
    cycles: u64,
    instructions: u64,
    cache_misses: u64,
}

impl CpuCounterCollector {
    /// Attempt to open the hardware counters. Never fails: if counters
    /// cannot be opened, the collector falls back to reporting zero rates
    /// for the lifetime of the process.
    #[must_use]
    pub fn new() -> Self {
        Self {
            backend: backend::Backend::open(),
            last: None,
        }
    }

    /// Sample the counters and derive rates since the previous call.
    pub fn collect(&mut self) -> CpuMetrics {
        let mut metrics = CpuMetrics {
            aes_instructions_per_sec: AES_UNSUPPORTED,
            ..CpuMetrics::default()
        };

        let Some(reading) = self.backend.read() else {
            return metrics;
        };

        let now = Instant::now();
        let Some(prev) = &self.last else {
            self.last = Some(LastReading {
                at: now,
                cycles: reading.cycles,
                instructions: reading.instructions,
                cache_misses: reading.cache_misses,
            });
            return metrics;
        };

        let elapsed = now.duration_since(prev.at).as_secs_f64();
        if elapsed <= 0.0 {
            return metrics;
        }

        let cycles_delta = reading.cycles.saturating_sub(prev.cycles);
        let instructions_delta = reading.instructions.saturating_sub(prev.instructions);
        let cache_miss_delta = reading.cache_misses.saturating_sub(prev.cache_misses);

        metrics.cycles_per_sec = cycles_delta as f64 / elapsed;
        metrics.instructions_per_sec = instructions_delta as f64 / elapsed;
        // Defined as 0 when the instructions delta is 0, rather than NaN
        // from a 0/0 division.
        metrics.cache_miss_rate = if instructions_delta > 0 {
            cache_miss_delta as f64 / instructions_delta as f64
        } else {
            0.0
        };

        self.last = Some(LastReading {
            at: now,
            cycles: reading.cycles,
            instructions: reading.instructions,
            cache_misses: reading.cache_misses,
        });

        metrics
    }
}

impl Default for CpuCounterCollector {
    fn default() -> Self {
        Self::new()
    }
}

struct RawCounters {
    cycles: u64,
    instructions: u64,
    cache_misses: u64,
}

#[cfg(target_os = "linux")]
#[allow(unsafe_code)]
mod backend {
    //! `perf_event_open` is not wrapped by the `libc` crate, so this backend
    //! talks to the kernel through raw syscalls directly.
    use super::RawCounters;
    use std::os::fd::{FromRawFd, OwnedFd};

    pub struct Backend {
        cycles_fd: Option<OwnedFd>,
        instructions_fd: Option<OwnedFd>,
        cache_misses_fd: Option<OwnedFd>,
    }

    impl Backend {
        pub fn open() -> Self {
            Self {
                cycles_fd: open_counter(libc::PERF_COUNT_HW_CPU_CYCLES),
                instructions_fd: open_counter(libc::PERF_COUNT_HW_INSTRUCTIONS),
                cache_misses_fd: open_counter(libc::PERF_COUNT_HW_CACHE_MISSES),
            }
        }

        pub fn read(&self) -> Option<RawCounters> {
            if self.cycles_fd.is_none()
                && self.instructions_fd.is_none()
                && self.cache_misses_fd.is_none()
            {
                return None;
            }
            Some(RawCounters {
                cycles: read_counter(&self.cycles_fd).unwrap_or(0),
                instructions: read_counter(&self.instructions_fd).unwrap_or(0),
                cache_misses: read_counter(&self.cache_misses_fd).unwrap_or(0),
            })
        }
    }

    fn open_counter(config: u32) -> Option<OwnedFd> {
        // perf_event_open is not wrapped by the libc crate; invoke it via
        // the raw syscall number, matching the reference collector.
        let mut attr: libc::perf_event_attr = unsafe { std::mem::zeroed() };
        attr.type_ = libc::PERF_TYPE_HARDWARE as u32;
        attr.size = std::mem::size_of::<libc::perf_event_attr>() as u32;
        attr.config = u64::from(config);
        attr.set_disabled(1);
        attr.set_exclude_kernel(1);
        attr.set_exclude_hv(1);

        let fd = unsafe {
            libc::syscall(
                libc::SYS_perf_event_open,
                std::ptr::addr_of!(attr),
                -1i32,
                0i32,
                -1i32,
                0u64,
            )
        };
        if fd < 0 {
            return None;
        }
        let fd = fd as i32;
        unsafe {
            libc::ioctl(fd, libc::PERF_EVENT_IOC_RESET as libc::c_ulong, 0);
            libc::ioctl(fd, libc::PERF_EVENT_IOC_ENABLE as libc::c_ulong, 0);
        }
        Some(unsafe { OwnedFd::from_raw_fd(fd) })
    }

    fn read_counter(fd: &Option<OwnedFd>) -> Option<u64> {
        use std::os::fd::AsRawFd;
        let fd = fd.as_ref()?;
        let mut buf = [0u8; 8];
        let n = unsafe {
            libc::read(
                fd.as_raw_fd(),
                buf.as_mut_ptr().cast(),
                std::mem::size_of_val(&buf),
            )
        };
        if n != buf.len() as isize {
            return None;
        }
        Some(u64::from_ne_bytes(buf))
    }
}

#[cfg(not(target_os = "linux"))]
mod backend {
    use super::RawCounters;

    /// No portable performance-counter API exists on this platform; the
    /// collector degrades to permanently-unavailable rather than failing.
    pub struct Backend;

    impl Backend {
        pub fn open() -> Self {
            Self
        }

        pub fn read(&self) -> Option<RawCounters> {
            None
        }
    }
}
