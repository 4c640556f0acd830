//! Configuration management for accurev-exec.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cli::Args;
use crate::execution::{
    parse_max_concurrency, Executor, ProcessInvoker, Scheduler, SchedulerConfig, DEFAULT_PROGRAM,
    MAX_CONCURRENCY_ENV,
};

/// Environment variable overriding the wrapped program.
pub const PROGRAM_ENV: &str = "ACCUREV_EXEC_PROGRAM";

/// Environment variable overriding the log level.
pub const LOG_LEVEL_ENV: &str = "ACCUREV_EXEC_LOG_LEVEL";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Process launch settings.
    pub executor: ExecutorSection,
    /// Admission gate settings.
    pub scheduler: SchedulerSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Process launch section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSection {
    /// Program to launch.
    pub program: String,
    /// Arguments placed before every command's arguments.
    pub base_args: Vec<String>,
    /// Working directory for launched processes.
    pub working_dir: Option<PathBuf>,
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            base_args: Vec::new(),
            working_dir: None,
        }
    }
}

/// Admission gate section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    /// Maximum concurrent commands. `None` uses the built-in default.
    pub max_concurrency: Option<usize>,
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    ///
    /// Returns the settings that were present but unusable; the caller logs
    /// them once a subscriber is installed.
    pub fn apply_env(&mut self) -> Vec<RejectedSetting> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Vec<RejectedSetting>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut rejected = Vec::new();

        if let Some(program) = lookup(PROGRAM_ENV) {
            if !program.trim().is_empty() {
                self.executor.program = program;
            }
        }

        // Blank counts as unset.
        if let Some(raw) = lookup(MAX_CONCURRENCY_ENV).filter(|v| !v.trim().is_empty()) {
            match parse_max_concurrency(&raw) {
                Some(n) => self.scheduler.max_concurrency = Some(n),
                None => rejected.push(RejectedSetting {
                    var: MAX_CONCURRENCY_ENV,
                    value: raw,
                }),
            }
        }

        if let Some(level) = lookup(LOG_LEVEL_ENV) {
            self.logging.level = level;
        } else if let Some(level) = lookup("RUST_LOG") {
            self.logging.level = level;
        }

        rejected
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ref program) = args.program {
            self.executor.program = program.clone();
        }

        if let Some(n) = args.max_concurrency {
            self.scheduler.max_concurrency = Some(n);
        }

        if let Some(ref dir) = args.working_dir {
            self.executor.working_dir = Some(dir.clone());
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    ///
    /// Rejected environment settings are logged through the current
    /// subscriber. Use [`Config::load_with_rejections`] when logging is set
    /// up from the loaded configuration.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let (config, rejected) = Self::load_with_rejections(args)?;
        for setting in &rejected {
            setting.log();
        }
        Ok(config)
    }

    /// Load configuration, handing back rejected environment settings
    /// instead of logging them.
    pub fn load_with_rejections(
        args: &Args,
    ) -> Result<(Self, Vec<RejectedSetting>), ConfigError> {
        let mut config = Config::default();

        if let Some(ref path) = args.config {
            config = Config::from_file(path)?;
        }

        let rejected = config.apply_env();
        config.apply_args(args);

        Ok((config, rejected))
    }

    /// Resolved scheduler configuration.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        self.scheduler
            .max_concurrency
            .map(SchedulerConfig::new)
            .unwrap_or_default()
    }

    /// Build the process invoker described by this configuration.
    pub fn to_invoker(&self) -> ProcessInvoker {
        let mut invoker = ProcessInvoker::new(&self.executor.program)
            .base_args(self.executor.base_args.iter().cloned());
        if let Some(ref dir) = self.executor.working_dir {
            invoker = invoker.working_dir(dir);
        }
        invoker
    }

    /// Build an executor with its own scheduler.
    pub fn to_executor(&self) -> Executor {
        let scheduler = Arc::new(Scheduler::new(self.scheduler_config()));
        Executor::new(self.to_invoker(), scheduler)
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// An environment setting that was present but could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedSetting {
    /// Variable name.
    pub var: &'static str,
    /// Raw value as found.
    pub value: String,
}

impl RejectedSetting {
    /// Emit the warning for this setting.
    pub fn log(&self) {
        warn!(var = self.var, value = %self.value, "ignoring invalid concurrency limit");
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
