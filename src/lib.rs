//! # accurev-exec
//!
//! Bounded-concurrency execution of AccuRev CLI commands.
//!
//! This crate launches the external version-control client for one command
//! at a time, caps how many of those processes run concurrently, and turns
//! each run into a typed [`CommandResult`] or a tagged [`ExecError`].
//!
//! ## Features
//!
//! - **Admission gate**: at most N asynchronous commands run at once
//!   (N from `ACCUREV_MAX_CONCURRENCY`, default 8)
//! - **Pluggable classification**: exit codes judged per command text, with
//!   `diff`/`merge` treating exit code 1 as success by default
//! - **Blocking and async paths**: same result shape for both
//! - **Distinct failures**: spawn failures, rejections and unexpected errors
//!   are separate variants
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use accurev_exec::{Executor, ProcessInvoker, Scheduler};
//!
//! #[tokio::main]
//! async fn main() -> accurev_exec::Result<()> {
//!     accurev_exec::logging::try_init().ok();
//!
//!     let scheduler = Arc::new(Scheduler::from_env());
//!     let executor = Executor::new(ProcessInvoker::default(), scheduler);
//!
//!     match executor.run_async("show users", None).await {
//!         Ok(result) => println!("{}", result.output()),
//!         Err(e) if e.is_rejection() => eprintln!("rejected: {e}"),
//!         Err(e) => return Err(e),
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod execution;
pub mod logging;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use error::{ExecError, Result};
pub use execution::{
    Classification, CommandRequest, CommandResult, Executor, Policy, ProcessInvoker, Scheduler,
    SchedulerConfig,
};
