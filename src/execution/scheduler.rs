//! Admission-controlled scheduling of asynchronous commands.
//!
//! The wrapped program's server can stop responding when a client floods
//! it with concurrent invocations, so every asynchronous command passes
//! through a counting gate that caps how many processes run at once.
//! Excess work waits for a free slot.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Semaphore;
use tracing::{trace, warn};

use crate::error::ExecError;
use crate::Result;

/// Environment variable holding the concurrency limit.
pub const MAX_CONCURRENCY_ENV: &str = "ACCUREV_MAX_CONCURRENCY";

/// Concurrency limit used when nothing valid is configured.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Scheduler configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Maximum number of commands running at once. Always positive.
    pub max_concurrency: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl SchedulerConfig {
    /// Create a config with the given limit, falling back to the default
    /// for zero.
    pub fn new(max_concurrency: usize) -> Self {
        if max_concurrency == 0 {
            warn!(
                default = DEFAULT_MAX_CONCURRENCY,
                "max concurrency must be positive, using default"
            );
            return Self::default();
        }
        Self { max_concurrency }
    }

    /// Read the limit from [`MAX_CONCURRENCY_ENV`].
    pub fn from_env() -> Self {
        Self::from_value(std::env::var(MAX_CONCURRENCY_ENV).ok().as_deref())
    }

    /// Resolve a raw setting. Absent or unparsable values use the default.
    pub fn from_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Self::default(),
            Some(raw) => match parse_max_concurrency(raw) {
                Some(n) => Self { max_concurrency: n },
                None => {
                    warn!(
                        var = MAX_CONCURRENCY_ENV,
                        value = raw,
                        default = DEFAULT_MAX_CONCURRENCY,
                        "invalid concurrency limit, using default"
                    );
                    Self::default()
                }
            },
        }
    }
}

/// Parse a positive concurrency limit.
pub fn parse_max_concurrency(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok().filter(|n| *n > 0)
}

/// Snapshot of scheduler counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
    pub capacity: usize,
    pub active: usize,
    pub waiting: usize,
    /// Highest number of simultaneously active units seen so far.
    pub peak_active: usize,
}

/// Counting admission gate for asynchronous commands.
///
/// Construct one per process and share it (behind an `Arc`) with every
/// executor that should count against the same limit.
#[derive(Debug)]
pub struct Scheduler {
    gate: Semaphore,
    capacity: usize,
    active: AtomicUsize,
    waiting: AtomicUsize,
    peak_active: AtomicUsize,
}

impl Scheduler {
    /// Create a scheduler with the given configuration.
    pub fn new(config: SchedulerConfig) -> Self {
        let mut capacity = config.max_concurrency;
        if capacity == 0 {
            warn!(default = DEFAULT_MAX_CONCURRENCY, "zero capacity requested, using default");
            capacity = DEFAULT_MAX_CONCURRENCY;
        }
        if capacity > Semaphore::MAX_PERMITS {
            warn!(
                requested = capacity,
                max = Semaphore::MAX_PERMITS,
                "capacity exceeds gate limit, clamping"
            );
            capacity = Semaphore::MAX_PERMITS;
        }

        Self {
            gate: Semaphore::new(capacity),
            capacity,
            active: AtomicUsize::new(0),
            waiting: AtomicUsize::new(0),
            peak_active: AtomicUsize::new(0),
        }
    }

    /// Create a scheduler sized from the environment.
    pub fn from_env() -> Self {
        Self::new(SchedulerConfig::from_env())
    }

    /// Maximum number of concurrently admitted units.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Run `work` once a slot is free.
    ///
    /// Only the execution of `work` holds the slot. Returns
    /// [`ExecError::SchedulerClosed`] if the gate is closed before
    /// admission. Dropping the returned future frees the slot or the
    /// queue position.
    pub async fn run<F>(&self, work: F) -> Result<F::Output>
    where
        F: Future,
    {
        let permit = {
            let _waiting = CounterGuard::enter(&self.waiting);
            self.gate
                .acquire()
                .await
                .map_err(|_| {
                    warn!(capacity = self.capacity, "scheduler closed, refusing command");
                    ExecError::SchedulerClosed
                })?
        };

        let active = CounterGuard::enter(&self.active);
        self.peak_active.fetch_max(active.value, Ordering::SeqCst);
        trace!(active = active.value, capacity = self.capacity, "admitted");

        let output = work.await;

        drop(active);
        drop(permit);
        Ok(output)
    }

    /// Stop admitting work. Pending and future admissions fail.
    pub fn close(&self) {
        self.gate.close();
    }

    /// Whether the gate has been closed.
    pub fn is_closed(&self) -> bool {
        self.gate.is_closed()
    }

    /// Current counters.
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            capacity: self.capacity,
            active: self.active.load(Ordering::SeqCst),
            waiting: self.waiting.load(Ordering::SeqCst),
            peak_active: self.peak_active.load(Ordering::SeqCst),
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

/// Increments a counter for the guard's lifetime.
struct CounterGuard<'a> {
    counter: &'a AtomicUsize,
    value: usize,
}

impl<'a> CounterGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        let value = counter.fetch_add(1, Ordering::SeqCst) + 1;
        Self { counter, value }
    }
}

impl Drop for CounterGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}
