//! Process exit codes for the vinfra client
//!
//! Scripts wrapping the client key off these values, so they are part of the
//! public contract and must stay stable.

/// Exit codes surfaced by the client
///
/// - 0: Success
/// - 1: Generic HTTP/client failure
/// - 2: Command, validation or resolution failure
/// - 100+: Transport-level conditions
/// - 128+N: Process terminated by signal N
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VinfraExitCode {
    /// Success (0) - Command completed successfully
    Success = 0,

    /// HTTP error (1) - The portal answered with an error status, or a
    /// local client failure occurred
    HttpError = 1,

    /// Command error (2) - Bad input, unresolvable or ambiguous resource,
    /// failed task
    CommandError = 2,

    /// Connection error (101) - The portal could not be reached
    ConnectionError = 101,

    /// Timeout error (102) - An operation or a task wait ran out of time
    TimeoutError = 102,

    /// Interrupted (130) - SIGINT received
    Interrupted = 130,

    /// Broken pipe (141) - The reader of standard output went away
    BrokenPipe = 141,
}

impl VinfraExitCode {
    /// Convert to numeric exit code
    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// Get descriptive message for the exit code
    pub fn message(&self) -> &'static str {
        match self {
            VinfraExitCode::Success => "Success",
            VinfraExitCode::HttpError => "HTTP error",
            VinfraExitCode::CommandError => "Command error",
            VinfraExitCode::ConnectionError => "Connection error",
            VinfraExitCode::TimeoutError => "Timeout error",
            VinfraExitCode::Interrupted => "Interrupted",
            VinfraExitCode::BrokenPipe => "Broken pipe",
        }
    }
}

impl From<VinfraExitCode> for i32 {
    fn from(code: VinfraExitCode) -> Self {
        code.code()
    }
}
