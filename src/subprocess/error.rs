use crate::error::{ErrorCode, LatencyError};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Process timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mock expectation not met: {0}")]
    MockExpectationNotMet(String),
}

impl ProcessError {
    pub fn error_code(&self) -> u16 {
        match self {
            ProcessError::CommandNotFound(_) => ErrorCode::EXEC_COMMAND_NOT_FOUND,
            ProcessError::Timeout(_) => ErrorCode::EXEC_TIMEOUT,
            ProcessError::Io(_) => ErrorCode::EXEC_SPAWN_FAILED,
            ProcessError::MockExpectationNotMet(_) => ErrorCode::EXEC_GENERIC,
        }
    }
}

/// Convert ProcessError to a cluster LatencyError
impl From<ProcessError> for LatencyError {
    fn from(err: ProcessError) -> Self {
        let command = match &err {
            ProcessError::CommandNotFound(cmd) => Some(cmd.clone()),
            _ => None,
        };
        LatencyError::cluster_with_code(err.error_code(), err.to_string(), command).with_source(err)
    }
}
