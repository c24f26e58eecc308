use std::fmt::Display;
use thiserror::Error;

use crate::timing::Timestamp;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// The unified error type for peer-latency
#[derive(Error, Debug)]
pub enum LatencyError {
    #[error("[E{code:04}] Malformed timestamp in line {line:?}: {reason}", code = ErrorCode::TIMESTAMP_MALFORMED)]
    MalformedTimestamp { line: String, reason: String },

    #[error(
        "[E{code:04}] Invalid interval: stop {stop} precedes start {start} ({elapsed_ms} ms)",
        code = ErrorCode::TIMESTAMP_INVALID_INTERVAL
    )]
    InvalidInterval {
        start: Timestamp,
        stop: Timestamp,
        elapsed_ms: i64,
    },

    #[error(
        "[E{code:04}] Inconsistent log state for {peer}: found consensus marker but no {missing:?} line",
        code = ErrorCode::LOG_INCONSISTENT_STATE
    )]
    InconsistentLogState { peer: String, missing: String },

    #[error("[E{code:04}] Log source unavailable for {peer}: {message}", code = ErrorCode::LOG_SOURCE_UNAVAILABLE)]
    LogSourceUnavailable {
        peer: String,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Cluster error: {message}")]
    Cluster {
        code: u16,
        message: String,
        command: Option<String>,
        exit_code: Option<i32>,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Submission error: {message}")]
    Submission {
        code: u16,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Run interrupted", code = ErrorCode::EXEC_INTERRUPTED)]
    Interrupted,

    #[error("[E{code:04}] Internal error: {message}", code = ErrorCode::OTHER_INTERNAL)]
    Internal { message: String },
}

impl LatencyError {
    pub fn malformed(line: &str, reason: impl Into<String>) -> Self {
        Self::MalformedTimestamp {
            line: line.to_string(),
            reason: reason.into(),
        }
    }

    pub fn log_source_unavailable(peer: impl Display, message: impl Into<String>) -> Self {
        Self::LogSourceUnavailable {
            peer: peer.to_string(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with default code
    pub fn config(message: impl Into<String>) -> Self {
        Self::config_with_code(ErrorCode::CONFIG_GENERIC, message)
    }

    /// Create a configuration error with specific code
    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a cluster lifecycle error with specific code
    pub fn cluster_with_code(
        code: u16,
        message: impl Into<String>,
        command: Option<String>,
    ) -> Self {
        Self::Cluster {
            code,
            message: message.into(),
            command,
            exit_code: None,
            source: None,
        }
    }

    /// Create a submission error with specific code
    pub fn submission_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Submission {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Add a source error to this error. Variants without a source slot are
    /// returned unchanged.
    pub fn with_source(mut self, source: impl Into<BoxedSource>) -> Self {
        match &mut self {
            Self::LogSourceUnavailable { source: src, .. }
            | Self::Config { source: src, .. }
            | Self::Cluster { source: src, .. }
            | Self::Submission { source: src, .. } => {
                *src = Some(source.into());
            }
            _ => {}
        }
        self
    }

    /// Add context to the error message
    pub fn with_context(mut self, context: impl Display) -> Self {
        match &mut self {
            Self::LogSourceUnavailable { message, .. }
            | Self::Config { message, .. }
            | Self::Cluster { message, .. }
            | Self::Submission { message, .. }
            | Self::Internal { message } => {
                *message = format!("{}: {}", context, message);
            }
            _ => {}
        }
        self
    }

    /// Set the exit code for a cluster error
    pub fn with_exit_code(mut self, exit_code: i32) -> Self {
        if let Self::Cluster {
            exit_code: ref mut ec,
            ..
        } = self
        {
            *ec = Some(exit_code);
        }
        self
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::MalformedTimestamp { .. } => ErrorCode::TIMESTAMP_MALFORMED,
            Self::InvalidInterval { .. } => ErrorCode::TIMESTAMP_INVALID_INTERVAL,
            Self::InconsistentLogState { .. } => ErrorCode::LOG_INCONSISTENT_STATE,
            Self::LogSourceUnavailable { .. } => ErrorCode::LOG_SOURCE_UNAVAILABLE,
            Self::Config { code, .. }
            | Self::Cluster { code, .. }
            | Self::Submission { code, .. } => *code,
            Self::Interrupted => ErrorCode::EXEC_INTERRUPTED,
            Self::Internal { .. } => ErrorCode::OTHER_INTERNAL,
        }
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,
            Self::MalformedTimestamp { .. } | Self::InvalidInterval { .. } => 3,
            Self::Cluster { .. } => 5,
            Self::Submission { .. } => 6,
            Self::Interrupted => 130,
            // Peer-scoped errors are recorded in the peer's sample, never
            // returned from a run.
            Self::InconsistentLogState { .. }
            | Self::LogSourceUnavailable { .. }
            | Self::Internal { .. } => 1,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::MalformedTimestamp { line, reason } => {
                format!(
                    "Log line {:?} does not carry a usable timestamp ({}). Expected an HH:MM:SS.mmm prefix.",
                    line, reason
                )
            }
            Self::InvalidInterval { start, stop, .. } => {
                format!(
                    "Consensus was logged at {} but the transaction was received at {}. Did the run cross midnight?",
                    stop, start
                )
            }
            Self::InconsistentLogState { peer, missing } => {
                format!("Peer {} reported consensus without logging {:?}", peer, missing)
            }
            Self::LogSourceUnavailable { peer, message, .. } => {
                format!("Could not read logs of peer {}: {}", peer, message)
            }
            Self::Config { message, .. } => format!("Configuration problem: {}", message),
            Self::Cluster {
                message, command, ..
            } => {
                if let Some(cmd) = command {
                    format!("Cluster command '{}' failed: {}", cmd, message)
                } else {
                    format!("Cluster error: {}", message)
                }
            }
            Self::Submission { message, .. } => {
                format!("Could not submit the transaction: {}", message)
            }
            Self::Interrupted => "Run interrupted; the cluster was stopped".to_string(),
            Self::Internal { message } => format!("Internal error: {}", message),
        }
    }

    /// Get a developer-friendly error message with full chain
    pub fn developer_message(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            message.push_str(&format!("\n  caused by: {}", cause));
            source = cause.source();
        }
        message
    }
}

pub type Result<T> = std::result::Result<T, LatencyError>;
