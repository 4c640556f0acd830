//! Execution facade.
//!
//! Two ways to run a command, with the same result shape:
//! - [`Executor::run`] blocks the calling thread and bypasses the admission
//!   gate. Meant for one-off interactive queries.
//! - [`Executor::run_async`] waits for a gate slot, then runs the process
//!   without blocking the runtime.
//!
//! Both classify the exit code with the caller's [`Policy`] when one is
//! given, or the executor's own policy otherwise.

use std::sync::Arc;

use futures_util::stream::{FuturesUnordered, Stream};
use tracing::debug;

use super::classifier::{Classification, Policy};
use super::invoker::{ProcessInvoker, ProcessOutput};
use super::request::CommandRequest;
use super::result::CommandResult;
use super::scheduler::Scheduler;
use crate::error::ExecError;
use crate::Result;

/// Runs commands through the wrapped program.
///
/// Cheap to clone; clones share the same scheduler.
#[derive(Debug, Clone)]
pub struct Executor {
    invoker: ProcessInvoker,
    scheduler: Arc<Scheduler>,
    policy: Policy,
}

impl Executor {
    /// Create an executor using the default classification policy.
    pub fn new(invoker: ProcessInvoker, scheduler: Arc<Scheduler>) -> Self {
        Self {
            invoker,
            scheduler,
            policy: Policy::default(),
        }
    }

    /// Replace the fallback policy used when a call supplies none.
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// The process invoker.
    pub fn invoker(&self) -> &ProcessInvoker {
        &self.invoker
    }

    /// The shared admission gate.
    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Run a command on the calling thread.
    ///
    /// Not counted against the scheduler's limit.
    pub fn run(&self, command_text: &str, policy: Option<&Policy>) -> Result<CommandResult> {
        let request = CommandRequest::new(command_text);
        let output = self.invoker.invoke_blocking(&request)?;
        self.classify(&request, output, policy)
    }

    /// Run a command once the scheduler admits it.
    pub async fn run_async(
        &self,
        command_text: &str,
        policy: Option<&Policy>,
    ) -> Result<CommandResult> {
        let request = CommandRequest::new(command_text);
        self.scheduler
            .run(async {
                let output = self.invoker.invoke(&request).await?;
                self.classify(&request, output, policy)
            })
            .await?
    }

    /// Run many commands concurrently through the scheduler.
    ///
    /// Yields each command with its result in completion order, so the
    /// caller can report progress per finished unit.
    pub fn run_many<'a>(
        &'a self,
        commands: Vec<String>,
        policy: Option<&'a Policy>,
    ) -> impl Stream<Item = (String, Result<CommandResult>)> + 'a {
        commands
            .into_iter()
            .map(move |command| async move {
                let result = self.run_async(&command, policy).await;
                (command, result)
            })
            .collect::<FuturesUnordered<_>>()
    }

    fn classify(
        &self,
        request: &CommandRequest,
        output: ProcessOutput,
        policy: Option<&Policy>,
    ) -> Result<CommandResult> {
        let policy = policy.unwrap_or(&self.policy);

        match policy.classify(&request.command_text, output.exit_code) {
            Classification::Accept => Ok(CommandResult::new(output.exit_code, output.stdout)
                .with_stderr(output.stderr)
                .with_duration(output.duration)),
            Classification::Reject => {
                debug!(
                    command = %request.command_text,
                    exit_code = output.exit_code,
                    "command rejected"
                );
                Err(ExecError::Rejected {
                    command: request.command_text.clone(),
                    exit_code: output.exit_code,
                    output: output.stdout,
                })
            }
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(ProcessInvoker::default(), Arc::new(Scheduler::default()))
    }
}
