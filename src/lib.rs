#![deny(unsafe_code)]

//! aegis-agent — host-resident telemetry agent that baselines machine
//! behavior and detects ransomware-like encryption/write/rename/delete
//! bursts in real time.
//!
//! Pipeline, leaf to root:
//! 1. **Running-stats kernel** ([`stats`]) — numerically stable Welford mean/variance.
//! 2. **Baseline store** ([`baseline`]) — durable per-metric stats with atomic save/load.
//! 3. **Pipeline model** ([`pipeline`]) — transient stats the anomaly engine scores against.
//! 4. **Anomaly engine** ([`anomaly`]) — per-metric z-scores, scalar score, behavioral flags.
//! 5. **Classifier** ([`classifier`]) — flag/score-weighted ransomware verdict.
//! 6. **Agent loop** ([`agent`]) — sequences collection, learning, detection, and emission.

pub mod agent;
pub mod anomaly;
pub mod baseline;
pub mod classifier;
pub mod core;
pub mod daemon;
pub mod logger;
pub mod pipeline;
pub mod prelude;
pub mod stats;
pub mod telemetry;
