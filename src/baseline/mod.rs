//! Persistent per-metric baseline: durable running statistics with an
//! atomic save/load protocol and a monotone readiness predicate.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::core::errors::{AgentError, Result};
use crate::stats::RunningStat;
use crate::telemetry::sample::{Metric, Sample};

/// Minimum accepted samples per metric before the store is considered ready.
pub const READY_MIN_SAMPLES: u64 = 300;

const MAGIC: &[u8; 8] = b"AEGBL001";
const FORMAT_VERSION: u32 = 1;
const ENDIAN_MARKER: u32 = 0x0102_0304;

#[derive(Debug, Default, Clone, Copy)]
struct MetricStat {
    count: u64,
    mean: f64,
    m2: f64,
}

impl MetricStat {
    fn as_running_stat(self) -> RunningStat {
        RunningStat::from_parts(self.count, self.mean, self.m2)
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.count.to_le_bytes());
        out.extend_from_slice(&self.mean.to_le_bytes());
        out.extend_from_slice(&self.m2.to_le_bytes());
        let stat = self.as_running_stat();
        out.extend_from_slice(&stat.variance().to_le_bytes());
        out.extend_from_slice(&stat.stddev().to_le_bytes());
    }

    fn read(buf: &[u8]) -> Option<(Self, &[u8])> {
        if buf.len() < 40 {
            return None;
        }
        let count = u64::from_le_bytes(buf[0..8].try_into().ok()?);
        let mean = f64::from_le_bytes(buf[8..16].try_into().ok()?);
        let m2 = f64::from_le_bytes(buf[16..24].try_into().ok()?);
        // variance/stddev (buf[24..40]) are persisted for forward
        // compatibility with external readers but recomputed from
        // (count, mean, m2) on load rather than trusted verbatim.
        Some((Self { count, mean, m2 }, &buf[40..]))
    }
}

/// Per-metric running statistics with durable cross-run persistence.
pub struct BaselineStore {
    db_path: PathBuf,
    stats: Mutex<[RunningStat; 8]>,
}

impl BaselineStore {
    /// Create an uninitialized store bound to `db_path` and load any
    /// existing file. A missing file is not an error — the store simply
    /// starts empty. A present-but-corrupt file is an error and leaves the
    /// store unusable.
    pub fn init(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        let store = Self {
            db_path: db_path.clone(),
            stats: Mutex::new([RunningStat::new(); 8]),
        };
        match std::fs::read(&db_path) {
            Ok(bytes) => {
                let loaded = decode(&bytes)?;
                *store.stats.lock() = loaded;
                Ok(store)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(store),
            Err(e) => Err(AgentError::io(&db_path, e)),
        }
    }

    /// Apply a Welford update for every metric whose value on `sample` is
    /// valid (finite, and for AES not the unsupported sentinel).
    pub fn update(&self, sample: &Sample) {
        let mut stats = self.stats.lock();
        for metric in Metric::ALL {
            if sample.is_valid_for_update(metric) {
                stats[metric_index(metric)].update(sample.value(metric));
            }
        }
    }

    /// True iff every tracked metric has reached [`READY_MIN_SAMPLES`].
    #[must_use]
    pub fn ready(&self) -> bool {
        self.stats
            .lock()
            .iter()
            .all(|s| s.is_ready(READY_MIN_SAMPLES))
    }

    /// Snapshot of the current per-metric stats (used by tests and callers
    /// who want a read without holding the lock).
    #[must_use]
    pub fn snapshot(&self) -> [RunningStat; 8] {
        *self.stats.lock()
    }

    /// Atomically persist the current state to `db_path`.
    ///
    /// Writes `<db_path>.tmp`, flushes, fsyncs, then renames over the real
    /// path. On any failure the temporary file is removed and the prior
    /// on-disk file, if any, is left untouched.
    pub fn save(&self) -> Result<()> {
        let bytes = encode(&self.stats.lock());
        let tmp_path = tmp_path_for(&self.db_path);

        let result = (|| -> Result<()> {
            let mut file =
                std::fs::File::create(&tmp_path).map_err(|e| AgentError::io(&tmp_path, e))?;
            file.write_all(&bytes)
                .map_err(|e| AgentError::io(&tmp_path, e))?;
            file.flush().map_err(|e| AgentError::io(&tmp_path, e))?;
            file.sync_all().map_err(|e| AgentError::io(&tmp_path, e))?;
            drop(file);
            std::fs::rename(&tmp_path, &self.db_path)
                .map_err(|e| AgentError::io(&self.db_path, e))?;
            Ok(())
        })();

        if result.is_err() {
            let _ = std::fs::remove_file(&tmp_path);
        }
        result
    }

    /// Attempt to save, logging (not propagating) any failure, then leave
    /// the store as-is. Intended for the agent loop's drain step.
    pub fn shutdown(&self) -> Option<AgentError> {
        self.save().err()
    }
}

fn metric_index(metric: Metric) -> usize {
    Metric::ALL.iter().position(|m| *m == metric).unwrap()
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".tmp");
    PathBuf::from(s)
}

fn encode(stats: &[RunningStat; 8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + 4 + 4 + 7 * 40);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&ENDIAN_MARKER.to_le_bytes());
    for metric in Metric::PERSISTED {
        let s = stats[metric_index(metric)];
        MetricStat {
            count: s.count(),
            mean: s.mean(),
            m2: s.m2(),
        }
        .write(&mut out);
    }
    out
}

fn decode(bytes: &[u8]) -> Result<[RunningStat; 8]> {
    if bytes.len() < 16 {
        return Err(AgentError::BaselineCorrupt {
            details: "file shorter than header".to_string(),
        });
    }
    if &bytes[0..8] != MAGIC {
        return Err(AgentError::BaselineCorrupt {
            details: "magic mismatch".to_string(),
        });
    }
    let version = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
    if version != FORMAT_VERSION {
        return Err(AgentError::BaselineCorrupt {
            details: format!("unsupported version {version}"),
        });
    }
    let endian = u32::from_le_bytes(bytes[12..16].try_into().unwrap());
    if endian != ENDIAN_MARKER {
        return Err(AgentError::BaselineCorrupt {
            details: "endian marker mismatch".to_string(),
        });
    }

    let mut rest = &bytes[16..];
    let mut stats = [RunningStat::new(); 8];
    for metric in Metric::PERSISTED {
        let (parsed, remainder) = MetricStat::read(rest).ok_or_else(|| AgentError::BaselineCorrupt {
            details: "truncated metric block".to_string(),
        })?;
        stats[metric_index(metric)] = parsed.as_running_stat();
        rest = remainder;
    }
    Ok(stats)
}

/// Read-only byte-level view, exposed for tooling and tests that want to
/// inspect a serialized baseline file without going through [`BaselineStore`].
pub fn read_raw(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut file = std::fs::File::open(path)?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    Ok(buf)
}
