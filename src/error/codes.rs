/// Error code registry for peer-latency
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 2000-2999: Timestamp and interval errors
/// - 3000-3999: Log source errors
/// - 4000-4999: Execution errors (cluster lifecycle, subprocesses)
/// - 5000-5999: Submission errors
/// - 9000-9999: Other errors
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_PARSE_ERROR: u16 = 1002;
    pub const CONFIG_INVALID_VALUE: u16 = 1003;

    // Timestamp errors (2000-2999)
    pub const TIMESTAMP_MALFORMED: u16 = 2001;
    pub const TIMESTAMP_INVALID_INTERVAL: u16 = 2002;

    // Log source errors (3000-3999)
    pub const LOG_SOURCE_UNAVAILABLE: u16 = 3001;
    pub const LOG_INCONSISTENT_STATE: u16 = 3002;

    // Execution errors (4000-4999)
    pub const EXEC_GENERIC: u16 = 4000;
    pub const EXEC_COMMAND_NOT_FOUND: u16 = 4001;
    pub const EXEC_TIMEOUT: u16 = 4002;
    pub const EXEC_SUBPROCESS_FAILED: u16 = 4003;
    pub const EXEC_SIGNAL_RECEIVED: u16 = 4005;
    pub const EXEC_INTERRUPTED: u16 = 4006;
    pub const EXEC_SPAWN_FAILED: u16 = 4007;

    // Submission errors (5000-5999)
    pub const SUBMIT_REJECTED: u16 = 5001;
    pub const SUBMIT_TRANSPORT: u16 = 5002;

    // Other errors (9000-9999)
    pub const OTHER_INTERNAL: u16 = 9001;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        ErrorCode::CONFIG_GENERIC => "General configuration error",
        ErrorCode::CONFIG_NOT_FOUND => "Configuration file not found",
        ErrorCode::CONFIG_PARSE_ERROR => "Configuration file could not be parsed",
        ErrorCode::CONFIG_INVALID_VALUE => "Invalid configuration value",

        ErrorCode::TIMESTAMP_MALFORMED => "Log line does not start with an HH:MM:SS.mmm timestamp",
        ErrorCode::TIMESTAMP_INVALID_INTERVAL => "Consensus timestamp precedes receive timestamp",

        ErrorCode::LOG_SOURCE_UNAVAILABLE => "Peer logs could not be read",
        ErrorCode::LOG_INCONSISTENT_STATE => "Consensus marker present without receive marker",

        ErrorCode::EXEC_GENERIC => "General execution error",
        ErrorCode::EXEC_COMMAND_NOT_FOUND => "Command not found",
        ErrorCode::EXEC_TIMEOUT => "Command timed out",
        ErrorCode::EXEC_SUBPROCESS_FAILED => "Subprocess exited with an error",
        ErrorCode::EXEC_SIGNAL_RECEIVED => "Subprocess terminated by signal",
        ErrorCode::EXEC_INTERRUPTED => "Run interrupted",
        ErrorCode::EXEC_SPAWN_FAILED => "Failed to spawn subprocess",

        ErrorCode::SUBMIT_REJECTED => "Transaction rejected by endpoint",
        ErrorCode::SUBMIT_TRANSPORT => "Transaction endpoint unreachable",

        ErrorCode::OTHER_INTERNAL => "Internal error",
        _ => "Unknown error",
    }
}
