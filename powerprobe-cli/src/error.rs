//! CLI-specific error types and exit code mapping

use powerprobe_cinder::CinderError;
use powerprobe_core::error::PowerprobeError;
use powerprobe_scenarios::ScenarioError;
use powerprobe_waiter::WaitError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes so that
/// scripts can tell a timed-out wait apart from a broken configuration.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The volume reported a failure status.
    #[error("{0}")]
    ResourceFailed(String),

    /// The wait deadline passed.
    #[error("{0}")]
    Timeout(String),

    /// Interrupted by the user (Ctrl-C).
    #[error("{0}")]
    Cancelled(String),

    /// At least one scenario failed or left resources behind.
    #[error("{0}")]
    ScenarioFailed(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from powerprobe-core.
    #[error("{0}")]
    Core(#[from] PowerprobeError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                           |
    /// |------|-----------------------------------|
    /// | 0    | Success                           |
    /// | 1    | General / command error           |
    /// | 2    | Configuration error               |
    /// | 3    | Volume entered a failure status   |
    /// | 4    | Wait timed out                    |
    /// | 5    | One or more scenarios failed      |
    /// | 10   | IO error                          |
    /// | 130  | Cancelled                         |
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Core(PowerprobeError::Config(_)) => 2,
            Self::ResourceFailed(_) => 3,
            Self::Timeout(_) => 4,
            Self::ScenarioFailed(_) => 5,
            Self::Io(_) => 10,
            Self::Cancelled(_) => 130,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}

impl From<WaitError> for CliError {
    fn from(e: WaitError) -> Self {
        match e {
            WaitError::Config { .. } => Self::Config(e.to_string()),
            WaitError::ResourceFailed { .. } => Self::ResourceFailed(e.to_string()),
            WaitError::Timeout { .. } => Self::Timeout(e.to_string()),
            WaitError::Cancelled { .. } => Self::Cancelled(e.to_string()),
        }
    }
}

impl From<CinderError> for CliError {
    fn from(e: CinderError) -> Self {
        match e {
            CinderError::Wait(wait) => wait.into(),
            CinderError::Config(config) => Self::Config(config.to_string()),
            other => Self::Core(other.into()),
        }
    }
}

impl From<ScenarioError> for CliError {
    fn from(e: ScenarioError) -> Self {
        match e {
            ScenarioError::Cinder(cinder) => cinder.into(),
            ScenarioError::UnknownScenario(_) => Self::Command(e.to_string()),
            other => Self::Core(other.into()),
        }
    }
}
