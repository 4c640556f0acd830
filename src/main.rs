//! accurev-exec binary entry point.

use std::process::ExitCode;

use accurev_exec::cli::{self, Args};
use accurev_exec::config::Config;
use accurev_exec::{logging, CommandResult, ExecError, Executor};
use futures_util::StreamExt;
use tracing::{debug, error};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("Try 'accurev-exec --help' for more information.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let (config, rejected) = match Config::load_with_rejections(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    if let Err(e) = logging::init_with_filter(config.log_filter()) {
        eprintln!("warning: logging unavailable: {e}");
    }
    for setting in &rejected {
        setting.log();
    }

    if args.commands.is_empty() {
        eprintln!("error: no command text given");
        eprintln!("Try 'accurev-exec --help' for more information.");
        return ExitCode::from(2);
    }

    let executor = config.to_executor();
    debug!(
        program = %executor.invoker().program().display(),
        capacity = executor.scheduler().capacity(),
        "executor ready"
    );

    let outcome = if args.sync {
        run_sync(&executor, args).await
    } else {
        run_concurrent(&executor, args.commands).await
    };

    outcome.exit_code()
}

/// Worst outcome seen across all commands.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Outcome {
    #[default]
    Accepted,
    Rejected,
    Failed,
}

impl Outcome {
    fn of(result: &Result<CommandResult, ExecError>) -> Self {
        match result {
            Ok(_) => Self::Accepted,
            Err(e) if e.is_rejection() => Self::Rejected,
            Err(_) => Self::Failed,
        }
    }

    fn exit_code(self) -> ExitCode {
        match self {
            Self::Accepted => ExitCode::SUCCESS,
            Self::Rejected => ExitCode::from(1),
            Self::Failed => ExitCode::from(2),
        }
    }
}

fn report(command: &str, result: &Result<CommandResult, ExecError>) {
    match result {
        Ok(result) => {
            print!("{}", result.output());
            if !result.output().is_empty() && !result.output().ends_with('\n') {
                println!();
            }
        }
        Err(e) => error!(command, error = %e, "command failed"),
    }
}

async fn run_sync(executor: &Executor, args: Args) -> Outcome {
    let executor = executor.clone();
    let joined = tokio::task::spawn_blocking(move || {
        let mut worst = Outcome::default();
        for command in &args.commands {
            let result = executor.run(command, None);
            report(command, &result);
            worst = worst.max(Outcome::of(&result));
        }
        worst
    })
    .await;

    joined.unwrap_or_else(|e| {
        error!(error = %e, "blocking runner panicked");
        Outcome::Failed
    })
}

async fn run_concurrent(executor: &Executor, commands: Vec<String>) -> Outcome {
    let total = commands.len();
    let mut done = 0;
    let mut worst = Outcome::default();

    let mut results = executor.run_many(commands, None);
    while let Some((command, result)) = results.next().await {
        done += 1;
        let status = match Outcome::of(&result) {
            Outcome::Accepted => "ok",
            Outcome::Rejected => "rejected",
            Outcome::Failed => "failed",
        };
        debug!(done, total, status, command = %command, "progress");
        eprintln!("[{done}/{total}] {status}: {command}");
        report(&command, &result);
        worst = worst.max(Outcome::of(&result));
    }

    worst
}
