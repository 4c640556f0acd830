//! Error types for accurev-exec.

use thiserror::Error;

/// Main error type for command execution.
#[derive(Error, Debug)]
pub enum ExecError {
    /// The operating system could not start the external process.
    #[error("failed to start `{program}` for command `{command}`: {source}")]
    Spawn {
        program: String,
        command: String,
        /// Standard error captured before the failure (usually empty).
        stderr: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran to completion but the active policy judged its exit
    /// code a failure for this command text.
    #[error("command `{command}` failed with exit code {exit_code}")]
    Rejected {
        command: String,
        exit_code: i32,
        /// Captured standard output of the rejected run.
        output: String,
    },

    /// Any other failure during process setup, wait, or output collection.
    #[error("unexpected failure running `{command}`: {reason}")]
    Unexpected { command: String, reason: String },

    /// The admission gate is closed and no longer admits work.
    #[error("command scheduler is closed")]
    SchedulerClosed,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecError {
    pub(crate) fn unexpected(command: impl Into<String>, reason: impl ToString) -> Self {
        Self::Unexpected {
            command: command.into(),
            reason: reason.to_string(),
        }
    }

    /// True when the process could not be started at all.
    pub fn is_spawn_failure(&self) -> bool {
        matches!(self, Self::Spawn { .. })
    }

    /// True when the process ran but was classified as a failure.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// Exit code of a rejected command.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Rejected { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}

/// Convenience Result type for accurev-exec operations.
pub type Result<T> = std::result::Result<T, ExecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_display() {
        let err = ExecError::Rejected {
            command: "show users".into(),
            exit_code: 1,
            output: String::new(),
        };
        assert!(err.to_string().contains("show users"));
        assert!(err.to_string().contains("exit code 1"));
        assert!(err.is_rejection());
        assert!(!err.is_spawn_failure());
        assert_eq!(err.exit_code(), Some(1));
    }

    #[test]
    fn test_spawn_display() {
        let err = ExecError::Spawn {
            program: "accurev".into(),
            command: "info".into(),
            stderr: String::new(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.is_spawn_failure());
        assert!(err.to_string().contains("accurev"));
        assert!(err.to_string().contains("info"));
        assert_eq!(err.exit_code(), None);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: ExecError = io_err.into();
        assert!(matches!(err, ExecError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_unexpected_display() {
        let err = ExecError::unexpected("stat -fx", "stdout pipe missing");
        assert!(err.to_string().contains("stat -fx"));
        assert!(err.to_string().contains("stdout pipe missing"));
        assert!(!err.is_rejection());
    }

    #[test]
    fn test_scheduler_closed_display() {
        assert!(ExecError::SchedulerClosed.to_string().contains("closed"));
    }
}
