//! Command requests and command-line tokenization.

/// One command to hand to the wrapped program.
///
/// The command text is the full argument string, e.g.
/// `hist -fx -p ProjectX -t 453`. No shell is involved: the text is split
/// on whitespace, and double quotes group a value containing spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    /// The full argument string passed to the external program.
    pub command_text: String,
}

impl CommandRequest {
    /// Create a request for the given command text.
    pub fn new(command_text: impl Into<String>) -> Self {
        Self {
            command_text: command_text.into(),
        }
    }

    /// Arguments to pass to the external program.
    pub fn args(&self) -> Vec<String> {
        split_command_line(&self.command_text)
    }

    /// The leading verb of the command (`hist`, `diff`, ...), if any.
    pub fn verb(&self) -> Option<&str> {
        self.command_text.split_whitespace().next()
    }

    /// Whether the command text contains anything to run.
    pub fn is_empty(&self) -> bool {
        self.command_text.trim().is_empty()
    }
}

impl From<&str> for CommandRequest {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for CommandRequest {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

/// Split a command line into arguments.
///
/// Whitespace separates arguments; a double-quoted run is kept together
/// and the quotes are dropped. Backslashes are literal so Windows paths
/// survive. An unterminated quote extends to the end of the text.
pub fn split_command_line(text: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for ch in text.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if has_token {
        args.push(current);
    }

    args
}
