//! Command result types.

use std::time::Duration;

/// Exit code carried by a result that was never produced.
pub const UNSET_EXIT_CODE: i32 = -1;

/// Result of one accepted command invocation.
///
/// Immutable once built; the default value is the "not yet produced"
/// sentinel with exit code [`UNSET_EXIT_CODE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    exit_code: i32,
    output: String,
    stderr: String,
    duration: Duration,
    initialized: bool,
}

impl CommandResult {
    /// Create a result from a completed process.
    pub fn new(exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: output.into(),
            stderr: String::new(),
            duration: Duration::ZERO,
            initialized: true,
        }
    }

    /// Attach captured standard error.
    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }

    /// Attach the wall-clock duration of the invocation.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Process exit code.
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Full standard output text.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Consume the result, keeping only the output text.
    pub fn into_output(self) -> String {
        self.output
    }

    /// Standard error captured during the run.
    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Time from spawn to exit.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// False for the sentinel value.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Check if the process exited with code 0.
    pub fn success(&self) -> bool {
        self.initialized && self.exit_code == 0
    }

    /// Get output as string, trimmed.
    pub fn output_trimmed(&self) -> &str {
        self.output.trim()
    }

    /// Get output lines.
    pub fn output_lines(&self) -> impl Iterator<Item = &str> {
        self.output.lines()
    }
}

impl Default for CommandResult {
    fn default() -> Self {
        Self {
            exit_code: UNSET_EXIT_CODE,
            output: String::new(),
            stderr: String::new(),
            duration: Duration::ZERO,
            initialized: false,
        }
    }
}
