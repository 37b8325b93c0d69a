//! AEG-prefixed error types with structured error codes.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Top-level error type for the agent.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("[AEG-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[AEG-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[AEG-1003] configuration parse failure at line {line}: {details}")]
    ConfigParse { line: usize, details: String },

    #[error("[AEG-2001] collector unavailable: {details}")]
    CollectorUnavailable { details: String },

    #[error("[AEG-2002] baseline store verification failed: {details}")]
    BaselineCorrupt { details: String },

    #[error("[AEG-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[AEG-3001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[AEG-3002] pipeline failure in {stage}: {details}")]
    Pipeline {
        stage: &'static str,
        details: String,
    },

    #[error("[AEG-3003] transport emit failure: {details}")]
    Transport { details: String },

    #[error("[AEG-3900] invalid argument: {details}")]
    InvalidArgument { details: String },
}

impl AgentError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "AEG-1001",
            Self::MissingConfig { .. } => "AEG-1002",
            Self::ConfigParse { .. } => "AEG-1003",
            Self::CollectorUnavailable { .. } => "AEG-2001",
            Self::BaselineCorrupt { .. } => "AEG-2002",
            Self::Serialization { .. } => "AEG-2101",
            Self::Io { .. } => "AEG-3001",
            Self::Pipeline { .. } => "AEG-3002",
            Self::Transport { .. } => "AEG-3003",
            Self::InvalidArgument { .. } => "AEG-3900",
        }
    }

    /// Whether this error is fatal to the agent loop (drain-and-exit) as
    /// opposed to transient-and-logged.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Transport { .. })
    }

    /// Whether retrying the same operation might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Transport { .. })
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<AgentError> {
        vec![
            AgentError::InvalidConfig {
                details: String::new(),
            },
            AgentError::MissingConfig {
                path: PathBuf::new(),
            },
            AgentError::ConfigParse {
                line: 0,
                details: String::new(),
            },
            AgentError::CollectorUnavailable {
                details: String::new(),
            },
            AgentError::BaselineCorrupt {
                details: String::new(),
            },
            AgentError::Serialization {
                context: "",
                details: String::new(),
            },
            AgentError::Io {
                path: PathBuf::new(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "test"),
            },
            AgentError::Pipeline {
                stage: "",
                details: String::new(),
            },
            AgentError::Transport {
                details: String::new(),
            },
            AgentError::InvalidArgument {
                details: String::new(),
            },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let codes: Vec<&str> = all_variants().iter().map(AgentError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn error_codes_have_aeg_prefix() {
        for err in all_variants() {
            assert!(
                err.code().starts_with("AEG-"),
                "code {} must start with AEG-",
                err.code()
            );
        }
    }

    #[test]
    fn error_display_includes_code() {
        let err = AgentError::InvalidConfig {
            details: "bad value".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("AEG-1001"));
        assert!(msg.contains("bad value"));
    }

    #[test]
    fn only_transport_errors_are_non_fatal() {
        for err in all_variants() {
            assert_eq!(
                err.is_fatal(),
                !matches!(err, AgentError::Transport { .. }),
            );
        }
    }

    #[test]
    fn retryable_errors_are_correct() {
        assert!(
            AgentError::Io {
                path: PathBuf::new(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "test"),
            }
            .is_retryable()
        );
        assert!(
            AgentError::Transport {
                details: String::new()
            }
            .is_retryable()
        );
        assert!(
            !AgentError::InvalidConfig {
                details: String::new()
            }
            .is_retryable()
        );
        assert!(
            !AgentError::BaselineCorrupt {
                details: String::new()
            }
            .is_retryable()
        );
    }

    #[test]
    fn io_convenience_constructor() {
        let err = AgentError::io(
            "/tmp/test.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.code(), "AEG-3001");
        assert!(err.to_string().contains("/tmp/test.txt"));
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: AgentError = json_err.into();
        assert_eq!(err.code(), "AEG-2101");
    }
}
