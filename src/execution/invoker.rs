//! Process invoker: one external process per command.
//!
//! The wrapped program is started directly (no shell), with stdin, stdout
//! and stderr all piped. Stdin stays connected until the process exits even
//! though nothing is written to it; the AccuRev client misbehaves when it is
//! closed or missing. Stderr is drained line by line on its own task for the
//! whole lifetime of the process while stdout is read to completion.

use std::collections::HashMap;
use std::io::{BufRead, Read};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt};
use tracing::{debug, error, trace, warn};

use super::request::CommandRequest;
use crate::error::ExecError;
use crate::Result;

/// Default name of the wrapped program.
pub const DEFAULT_PROGRAM: &str = "accurev";

/// Stderr chatter emitted outside a workspace. Not an error.
pub const BENIGN_DIAGNOSTIC: &str = "You are not in a directory associated with a workspace";

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Raw outcome of a process that ran to completion.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

/// Launches the wrapped program for individual commands.
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    program: PathBuf,
    base_args: Vec<String>,
    working_dir: Option<PathBuf>,
    env: HashMap<String, String>,
}

impl ProcessInvoker {
    /// Create an invoker for the given program.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
            working_dir: None,
            env: HashMap::new(),
        }
    }

    /// Arguments placed before every command's own arguments.
    pub fn base_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the working directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// The program this invoker launches.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run a command on the calling thread and wait for it to exit.
    pub fn invoke_blocking(&self, request: &CommandRequest) -> Result<ProcessOutput> {
        let args = self.prepare(request)?;
        let start = Instant::now();

        let mut child = self
            .command(&args)
            .spawn()
            .map_err(|e| self.spawn_error(request, e))?;

        let stdin = child.stdin.take();
        let (Some(mut stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(self.unexpected(request, "process pipes were not captured"));
        };

        let stderr_reader = std::thread::spawn(move || collect_stderr_blocking(stderr));

        let mut raw = Vec::new();
        if let Err(e) = stdout.read_to_end(&mut raw) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(self.unexpected(request, format!("reading stdout: {e}")));
        }

        let status = child
            .wait()
            .map_err(|e| self.unexpected(request, format!("waiting for process: {e}")))?;
        drop(stdin);

        let stderr = stderr_reader
            .join()
            .map_err(|_| self.unexpected(request, "stderr reader panicked"))?;

        self.finish(request, status, raw, stderr, start.elapsed())
    }

    /// Run a command without blocking the runtime.
    ///
    /// Dropping the returned future kills the child process.
    pub async fn invoke(&self, request: &CommandRequest) -> Result<ProcessOutput> {
        let args = self.prepare(request)?;
        let start = Instant::now();

        let mut cmd = tokio::process::Command::from(self.command(&args));
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| self.spawn_error(request, e))?;

        let stdin = child.stdin.take();
        let (Some(mut stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            let _ = child.kill().await;
            return Err(self.unexpected(request, "process pipes were not captured"));
        };

        let stderr_reader = tokio::spawn(collect_stderr(stderr));

        let mut raw = Vec::new();
        if let Err(e) = stdout.read_to_end(&mut raw).await {
            let _ = child.kill().await;
            return Err(self.unexpected(request, format!("reading stdout: {e}")));
        }

        let status = child
            .wait()
            .await
            .map_err(|e| self.unexpected(request, format!("waiting for process: {e}")))?;
        drop(stdin);

        let stderr = stderr_reader
            .await
            .map_err(|e| self.unexpected(request, format!("stderr reader failed: {e}")))?;

        self.finish(request, status, raw, stderr, start.elapsed())
    }

    fn prepare(&self, request: &CommandRequest) -> Result<Vec<String>> {
        if request.is_empty() {
            return Err(self.unexpected(request, "empty command text"));
        }
        Ok(request.args())
    }

    fn command(&self, args: &[String]) -> std::process::Command {
        let mut cmd = std::process::Command::new(&self.program);
        cmd.args(&self.base_args)
            .args(args)
            .envs(&self.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        cmd
    }

    fn finish(
        &self,
        request: &CommandRequest,
        status: ExitStatus,
        raw_stdout: Vec<u8>,
        stderr: String,
        duration: Duration,
    ) -> Result<ProcessOutput> {
        let Some(exit_code) = status.code() else {
            return Err(self.unexpected(
                request,
                format!("process terminated without exit code ({status}): {}", stderr.trim()),
            ));
        };

        report_stderr(&request.command_text, exit_code, &stderr);
        debug!(
            command = %request.command_text,
            exit_code,
            elapsed_ms = duration.as_millis() as u64,
            "process exited"
        );

        Ok(ProcessOutput {
            exit_code,
            stdout: decode_utf8(raw_stdout),
            stderr,
            duration,
        })
    }

    fn spawn_error(&self, request: &CommandRequest, source: std::io::Error) -> ExecError {
        error!(
            program = %self.program.display(),
            command = %request.command_text,
            error = %source,
            kind = ?source.kind(),
            os_error = ?source.raw_os_error(),
            "failed to start process"
        );
        ExecError::Spawn {
            program: self.program.display().to_string(),
            command: request.command_text.clone(),
            stderr: String::new(),
            source,
        }
    }

    fn unexpected(&self, request: &CommandRequest, reason: impl ToString) -> ExecError {
        let reason = reason.to_string();
        error!(
            program = %self.program.display(),
            command = %request.command_text,
            %reason,
            "command execution failed unexpectedly"
        );
        ExecError::unexpected(request.command_text.clone(), reason)
    }
}

impl Default for ProcessInvoker {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

/// Check whether a stderr line is the known benign diagnostic.
pub fn is_benign_diagnostic(line: &str) -> bool {
    line.contains(BENIGN_DIAGNOSTIC)
}

/// Stderr text worth a warning, with benign diagnostics removed.
pub fn reportable_stderr(stderr: &str) -> Option<String> {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty() && !is_benign_diagnostic(line))
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn report_stderr(command: &str, exit_code: i32, stderr: &str) {
    if let Some(text) = reportable_stderr(stderr) {
        warn!(command, exit_code, stderr = %text, "command wrote to stderr");
    }
}

fn decode_utf8(raw: Vec<u8>) -> String {
    String::from_utf8(raw).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

fn push_line(text: &mut String, segment: &[u8]) {
    let line = String::from_utf8_lossy(segment);
    let line = line.trim_end_matches('\r');
    trace!(line, "stderr");
    text.push_str(line);
    text.push('\n');
}

async fn collect_stderr<R: AsyncRead + Unpin>(stderr: R) -> String {
    let mut segments = tokio::io::BufReader::new(stderr).split(b'\n');
    let mut text = String::new();

    loop {
        match segments.next_segment().await {
            Ok(Some(segment)) => push_line(&mut text, &segment),
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "stderr read failed");
                break;
            }
        }
    }

    text
}

fn collect_stderr_blocking<R: Read>(stderr: R) -> String {
    let mut text = String::new();

    for segment in std::io::BufReader::new(stderr).split(b'\n') {
        match segment {
            Ok(segment) => push_line(&mut text, &segment),
            Err(e) => {
                debug!(error = %e, "stderr read failed");
                break;
            }
        }
    }

    text
}
