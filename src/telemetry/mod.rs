//! Collector façade: assembles a [`Sample`] from the underlying platform
//! collectors and emits the newline-delimited JSON wire records.

pub mod cpu;
pub mod facade;
pub mod fs_delta;
pub mod io;
pub mod output;
pub mod process;
pub mod sample;

pub use facade::TelemetryFacade;
pub use sample::{Metric, Sample};
