//! Agent configuration: a flat `key=value` file, not TOML.
//!
//! The format intentionally diverges from this codebase's usual TOML config
//! layer: it mirrors a small, fixed set of required keys read by a line-
//! oriented parser, matching the external contract the agent is bound to.

use std::path::{Path, PathBuf};

use crate::core::errors::{AgentError, Result};

/// Maximum accepted length for a path-shaped config value.
const PATH_MAX: usize = 4096;
/// Maximum accepted length for `cloud_endpoint_url`.
const URL_MAX: usize = 1024;
/// Inclusive bounds for `sampling_interval_ms`.
const SAMPLING_INTERVAL_MIN_MS: u64 = 1;
const SAMPLING_INTERVAL_MAX_MS: u64 = 3_600_000;
/// Default config path used when none is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "aegis-agent.conf";

/// Agent operating mode, selected by the `mode` config key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentMode {
    /// Learn a baseline; never evaluates anomaly/classifier.
    Baseline,
    /// Evaluate anomaly/classifier once the baseline is ready.
    Detect,
}

impl AgentMode {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "baseline" => Some(Self::Baseline),
            "detect" => Some(Self::Detect),
            _ => None,
        }
    }
}

/// Fully validated agent configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Interval between ticks, in milliseconds.
    pub sampling_interval_ms: u64,
    /// Root directory the filesystem collector watches for activity.
    pub telemetry_root_path: PathBuf,
    /// Endpoint the transport would dispatch to (currently unused; output is
    /// always written to stdout).
    pub cloud_endpoint_url: String,
    /// Path to the persisted baseline file.
    pub baseline_db_path: PathBuf,
    /// `baseline` or `detect`.
    pub mode: AgentMode,
}

#[derive(Default)]
struct RawFields {
    sampling_interval_ms: Option<u64>,
    telemetry_root_path: Option<String>,
    cloud_endpoint_url: Option<String>,
    baseline_db_path: Option<String>,
    mode: Option<AgentMode>,
}

impl Config {
    /// Load and validate configuration from `path`, falling back to
    /// [`DEFAULT_CONFIG_PATH`] when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let resolved = path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), Path::to_path_buf);

        if !resolved.exists() {
            return Err(AgentError::MissingConfig { path: resolved });
        }

        let text = std::fs::read_to_string(&resolved).map_err(|e| AgentError::io(&resolved, e))?;
        Self::parse(&text)
    }

    /// Parse configuration text directly (used by tests and by [`Self::load`]).
    pub fn parse(text: &str) -> Result<Self> {
        let mut raw = RawFields::default();

        for (line_no, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "sampling_interval_ms" => {
                    let parsed: u64 = value.parse().map_err(|_| AgentError::ConfigParse {
                        line: line_no + 1,
                        details: format!("sampling_interval_ms: not an integer: {value:?}"),
                    })?;
                    if !(SAMPLING_INTERVAL_MIN_MS..=SAMPLING_INTERVAL_MAX_MS).contains(&parsed) {
                        return Err(AgentError::ConfigParse {
                            line: line_no + 1,
                            details: format!(
                                "sampling_interval_ms out of range (1..={SAMPLING_INTERVAL_MAX_MS}): {parsed}"
                            ),
                        });
                    }
                    raw.sampling_interval_ms = Some(parsed);
                }
                "telemetry_root_path" => {
                    validate_path_value(value, "telemetry_root_path", line_no + 1)?;
                    raw.telemetry_root_path = Some(value.to_string());
                }
                "cloud_endpoint_url" => {
                    if value.is_empty() || value.len() > URL_MAX {
                        return Err(AgentError::ConfigParse {
                            line: line_no + 1,
                            details: format!(
                                "cloud_endpoint_url must be non-empty and <= {URL_MAX} bytes"
                            ),
                        });
                    }
                    raw.cloud_endpoint_url = Some(value.to_string());
                }
                "baseline_db_path" => {
                    validate_path_value(value, "baseline_db_path", line_no + 1)?;
                    raw.baseline_db_path = Some(value.to_string());
                }
                "mode" => {
                    let mode = AgentMode::parse(value).ok_or_else(|| AgentError::ConfigParse {
                        line: line_no + 1,
                        details: format!("mode must be 'baseline' or 'detect', got {value:?}"),
                    })?;
                    raw.mode = Some(mode);
                }
                _ => {
                    // Unknown keys are silently ignored.
                }
            }
        }

        Self::finish(raw)
    }

    fn finish(raw: RawFields) -> Result<Self> {
        let mut missing = Vec::new();
        if raw.sampling_interval_ms.is_none() {
            missing.push("sampling_interval_ms");
        }
        if raw.telemetry_root_path.is_none() {
            missing.push("telemetry_root_path");
        }
        if raw.cloud_endpoint_url.is_none() {
            missing.push("cloud_endpoint_url");
        }
        if raw.baseline_db_path.is_none() {
            missing.push("baseline_db_path");
        }
        if raw.mode.is_none() {
            missing.push("mode");
        }

        if !missing.is_empty() {
            return Err(AgentError::InvalidConfig {
                details: format!("missing required key(s): {}", missing.join(", ")),
            });
        }

        Ok(Self {
            sampling_interval_ms: raw.sampling_interval_ms.unwrap(),
            telemetry_root_path: PathBuf::from(raw.telemetry_root_path.unwrap()),
            cloud_endpoint_url: raw.cloud_endpoint_url.unwrap(),
            baseline_db_path: PathBuf::from(raw.baseline_db_path.unwrap()),
            mode: raw.mode.unwrap(),
        })
    }
}

fn validate_path_value(value: &str, key: &'static str, line: usize) -> Result<()> {
    if value.is_empty() || value.len() > PATH_MAX {
        return Err(AgentError::ConfigParse {
            line,
            details: format!("{key} must be non-empty and <= {PATH_MAX} bytes"),
        });
    }
    Ok(())
}
