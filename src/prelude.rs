//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use aegis_agent::prelude::*;
//! ```

// Core
pub use crate::core::config::{AgentMode, Config};
pub use crate::core::errors::{AgentError, Result};

// Detection pipeline
pub use crate::anomaly::{AnomalyEngine, AnomalyFlag, AnomalyResult};
pub use crate::baseline::BaselineStore;
pub use crate::classifier::{Classifier, ClassifierResult, Verdict};
pub use crate::pipeline::{ModelSnapshot, PipelineModel};
pub use crate::stats::RunningStat;

// Telemetry
pub use crate::telemetry::output::{OutputWriter, Sink, StdoutSink};
pub use crate::telemetry::sample::{Metric, Sample};
pub use crate::telemetry::TelemetryFacade;

// Agent
pub use crate::agent::Agent;
pub use crate::daemon::signals::SignalHandler;
