//! Error handling utilities
//!
//! Turns a failed run into a message on stderr and a process exit code.

use tracing::error;

use crate::error::LatencyError;

/// Exit code for a failed run.
///
/// [`LatencyError`]s carry their own code. Anything else is a general
/// failure.
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<LatencyError>()
        .map(LatencyError::exit_code)
        .unwrap_or(1)
}

/// Handle fatal errors and exit with appropriate status code
///
/// # Verbose Mode Behavior
/// - `verbose = 0`: User-friendly messages only
/// - `verbose >= 1`: Includes the full error chain
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    error!("Fatal error: {}", error);

    if let Some(latency_err) = error.downcast_ref::<LatencyError>() {
        eprintln!("{}", latency_err.user_message());

        if verbose >= 1 {
            eprintln!("\nContext Chain:\n{}", latency_err.developer_message());
        }
    } else {
        eprintln!("Error: {error}");

        if verbose >= 1 {
            eprintln!("\nError chain:");
            for (i, cause) in error.chain().enumerate() {
                eprintln!("  {}: {}", i, cause);
            }
        }
    }

    std::process::exit(exit_code_for(&error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_latency_errors_keep_their_exit_code() {
        let err = anyhow::Error::new(LatencyError::config_with_code(
            ErrorCode::CONFIG_INVALID_VALUE,
            "no peers",
        ));
        assert_eq!(exit_code_for(&err), 2);

        let err = anyhow::Error::new(LatencyError::Interrupted);
        assert_eq!(exit_code_for(&err), 130);
    }

    #[test]
    fn test_context_does_not_hide_latency_error() {
        let err = anyhow::Error::new(LatencyError::malformed("x", "too short"))
            .context("while sampling peer_1");
        assert_eq!(exit_code_for(&err), 3);
    }

    #[test]
    fn test_other_errors_are_general_failures() {
        assert_eq!(exit_code_for(&anyhow::anyhow!("boom")), 1);
    }
}
