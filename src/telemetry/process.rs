//! Identifies the process currently most associated with CPU-intensive
//! (crypto-like) behavior on the host.

/// The process a tick attributes as the top crypto-activity suspect.
#[derive(Debug, Clone, Default)]
pub struct TopProcess {
    pub pid: i32,
    /// Truncated to 63 bytes, matching the external contract.
    pub comm: String,
}

/// Samples per-process CPU time and reports whichever process consumed the
/// most CPU time since the previous call. Reports a zero pid and empty
/// command when no candidate can be determined (e.g. `/proc` unreadable) —
/// this is a degraded-but-running state, not a collector error.
pub struct ProcessAttributor {
    previous: std::collections::HashMap<i32, u64>,
}

impl ProcessAttributor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            previous: std::collections::HashMap::new(),
        }
    }

    /// Determine the top CPU-time consumer since the last call.
    pub fn collect(&mut self) -> TopProcess {
        let current = platform::sample_cpu_ticks();

        let mut best: Option<(i32, u64)> = None;
        for (&pid, &ticks) in &current {
            let delta = ticks.saturating_sub(*self.previous.get(&pid).unwrap_or(&0));
            if best.is_none_or(|(_, best_delta)| delta > best_delta) {
                best = Some((pid, delta));
            }
        }

        self.previous = current;

        match best {
            Some((pid, delta)) if delta > 0 => TopProcess {
                pid,
                comm: truncate_comm(&platform::comm_for(pid).unwrap_or_default()),
            },
            _ => TopProcess::default(),
        }
    }
}

impl Default for ProcessAttributor {
    fn default() -> Self {
        Self::new()
    }
}

fn truncate_comm(name: &str) -> String {
    name.chars().take(63).collect()
}

#[cfg(target_os = "linux")]
mod platform {
    use std::collections::HashMap;
    use std::fs;

    pub fn sample_cpu_ticks() -> HashMap<i32, u64> {
        let mut out = HashMap::new();
        let Ok(entries) = fs::read_dir("/proc") else {
            return out;
        };
        for entry in entries.flatten() {
            let Ok(pid) = entry.file_name().to_string_lossy().parse::<i32>() else {
                continue;
            };
            if let Some(ticks) = read_proc_stat_ticks(pid) {
                out.insert(pid, ticks);
            }
        }
        out
    }

    fn read_proc_stat_ticks(pid: i32) -> Option<u64> {
        let text = fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
        // Fields after the ")" that closes the comm field are space
        // separated; utime (14) and stime (15) are 1-indexed field 14/15
        // counting from field 1 = pid.
        let after_comm = text.rsplit(')').next()?;
        let fields: Vec<&str> = after_comm.split_whitespace().collect();
        // field index within `after_comm`: state=0, ppid=1, ... utime=11, stime=12
        let utime: u64 = fields.get(11)?.parse().ok()?;
        let stime: u64 = fields.get(12)?.parse().ok()?;
        Some(utime + stime)
    }

    pub fn comm_for(pid: i32) -> Option<String> {
        let text = fs::read_to_string(format!("/proc/{pid}/comm")).ok()?;
        Some(text.trim_end().to_string())
    }
}

#[cfg(not(target_os = "linux"))]
mod platform {
    use std::collections::HashMap;

    pub fn sample_cpu_ticks() -> HashMap<i32, u64> {
        HashMap::new()
    }

    pub fn comm_for(_pid: i32) -> Option<String> {
        None
    }
}
