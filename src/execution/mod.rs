//! Command execution engine.
//!
//! This module provides:
//! - A process invoker for the wrapped version-control client
//! - A pluggable success/failure classifier
//! - An admission-controlled scheduler capping concurrent processes
//! - A facade with blocking and async entry points
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use accurev_exec::execution::{Executor, ProcessInvoker, Scheduler};
//!
//! # async fn demo() -> accurev_exec::Result<()> {
//! let scheduler = Arc::new(Scheduler::from_env());
//! let executor = Executor::new(ProcessInvoker::new("accurev"), scheduler);
//!
//! let result = executor.run_async("hist -fx -p ProjectX -t 453", None).await?;
//! println!("{}", result.output());
//! # Ok(())
//! # }
//! ```

mod classifier;
mod executor;
mod invoker;
mod request;
mod result;
mod scheduler;

pub use classifier::{default_classify, Classification, Policy};
pub use executor::Executor;
pub use invoker::{
    is_benign_diagnostic, reportable_stderr, ProcessInvoker, ProcessOutput, BENIGN_DIAGNOSTIC,
    DEFAULT_PROGRAM,
};
pub use request::{split_command_line, CommandRequest};
pub use result::{CommandResult, UNSET_EXIT_CODE};
pub use scheduler::{
    parse_max_concurrency, Scheduler, SchedulerConfig, SchedulerStats, DEFAULT_MAX_CONCURRENCY,
    MAX_CONCURRENCY_ENV,
};
