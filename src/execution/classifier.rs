//! Success/failure classification of completed commands.

use std::fmt;
use std::sync::Arc;

/// Verdict on a completed process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Treat the run as a success.
    Accept,
    /// Surface the run as a failure.
    Reject,
}

impl Classification {
    /// Check if this verdict accepts the run.
    pub fn is_accept(self) -> bool {
        self == Self::Accept
    }
}

impl From<bool> for Classification {
    fn from(accept: bool) -> Self {
        if accept {
            Self::Accept
        } else {
            Self::Reject
        }
    }
}

/// Commands that exit with 1 to report differences or conflicts.
const EXIT_ONE_OK_VERBS: &[&str] = &["diff", "merge"];

/// The default policy.
///
/// Exit code 0 always accepts. Exit code 1 accepts only for `diff` and
/// `merge` (case-insensitive), which use it to mean "differences found".
/// Everything else rejects.
pub fn default_classify(command_text: &str, exit_code: i32) -> Classification {
    match exit_code {
        0 => Classification::Accept,
        1 => {
            let verb = command_text.split_whitespace().next().unwrap_or("");
            EXIT_ONE_OK_VERBS
                .iter()
                .any(|v| v.eq_ignore_ascii_case(verb))
                .into()
        }
        _ => Classification::Reject,
    }
}

type ClassifyFn = dyn Fn(&str, i32) -> Classification + Send + Sync;

/// A replaceable classification policy.
///
/// Wraps a pure function of `(command_text, exit_code)`. Cheap to clone and
/// safe to share across concurrent invocations.
#[derive(Clone)]
pub struct Policy {
    classify: Arc<ClassifyFn>,
}

impl Policy {
    /// Create a policy from a classification function.
    pub fn new<F>(classify: F) -> Self
    where
        F: Fn(&str, i32) -> Classification + Send + Sync + 'static,
    {
        Self {
            classify: Arc::new(classify),
        }
    }

    /// A policy that accepts only the listed exit codes.
    pub fn accept_codes(codes: impl Into<Vec<i32>>) -> Self {
        let codes = codes.into();
        Self::new(move |_, exit_code| codes.contains(&exit_code).into())
    }

    /// Classify a completed command.
    pub fn classify(&self, command_text: &str, exit_code: i32) -> Classification {
        (self.classify)(command_text, exit_code)
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::new(default_classify)
    }
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Policy").finish_non_exhaustive()
    }
}
