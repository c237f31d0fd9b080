//! rgfar - search and replace across a file tree with ripgrep
//!
//! Command-line usage:
//!   rgfar search  PATTERN [--replace R] [--filter GLOBS] [--flags F] [--paths P]
//!   rgfar replace PATTERN [--replace R] [--filter GLOBS] [--flags F] [--paths P] [--yes]
//!   rgfar version

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use rgfar::backend::{Confirm, Confirmation, FixedConfirm, RipgrepEngine};
use rgfar::config::EngineConfig;
use rgfar::core::TaskEvent;
use rgfar::{EngineError, MatchLocation, ProgressReport, SearchInputs, TaskEngine, TaskHandle, TaskOutcome};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "rgfar", version, about = "Search and replace across files with ripgrep")]
struct Cli {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// ripgrep binary, overrides the configuration
    #[arg(long)]
    rg: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show matches (with the replacement applied when given)
    Search(InputArgs),
    /// Rewrite matching files
    Replace {
        #[command(flatten)]
        inputs: InputArgs,
        /// Do not ask before replacing matches with an empty string
        #[arg(long)]
        yes: bool,
    },
    /// Print the ripgrep version in use
    Version,
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Search pattern
    search: String,
    #[arg(short, long, default_value = "")]
    replace: String,
    /// Newline separated glob patterns
    #[arg(long, default_value = "")]
    filter: String,
    /// Extra ripgrep flags
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    flags: String,
    /// Whitespace separated paths, `\ ` for a literal space
    #[arg(long, default_value = "")]
    paths: String,
}

impl From<InputArgs> for SearchInputs {
    fn from(args: InputArgs) -> Self {
        SearchInputs {
            search: args.search,
            replacement: args.replace,
            files_filter: args.filter,
            flags: args.flags,
            paths: args.paths,
        }
    }
}

/// Asks on the terminal.
struct TerminalConfirm;

#[async_trait]
impl Confirm for TerminalConfirm {
    async fn confirm(&self, prompt: &str) -> Confirmation {
        let prompt = prompt.to_string();
        let answer = tokio::task::spawn_blocking(move || {
            eprint!("{} [y/N] ", prompt);
            let _ = std::io::stderr().flush();
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| line)
        })
        .await;

        match answer {
            Ok(Ok(line)) if matches!(line.trim(), "y" | "Y" | "yes") => Confirmation::Yes,
            Ok(Ok(_)) => Confirmation::No,
            _ => Confirmation::Cancel,
        }
    }
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(rg) = &cli.rg {
        config.ripgrep.path = rg.clone();
    }
    which::which(&config.ripgrep.path)
        .with_context(|| format!("ripgrep not found: {}", config.ripgrep.path.display()))?;
    Ok(config)
}

fn print_location(location: &MatchLocation) {
    match (location.line, &location.text) {
        (Some(line), Some(text)) => match location.col {
            Some(col) => println!("{}:{}:{}:{}", location.filename, line, col + 1, text),
            None => println!("{}:{}:{}", location.filename, line, text),
        },
        _ => println!("{}", location.filename),
    }
}

/// Print events until the task ends; Ctrl-C aborts it.
async fn drive(mut handle: TaskHandle) -> TaskOutcome {
    let mut last_line: Option<(String, Option<u64>)> = None;
    loop {
        let event = tokio::select! {
            event = handle.next_event() => Some(event),
            _ = tokio::signal::ctrl_c() => None,
        };
        match event {
            None => {
                log::info!("Interrupted, aborting {}", handle.kind());
                handle.abort();
            }
            Some(event) => match event {
                Some(TaskEvent::Matches(batch)) => {
                    for location in &batch {
                        // One row per line, even with several spans on it
                        let key = (location.filename.clone(), location.line);
                        if last_line.as_ref() != Some(&key) {
                            print_location(location);
                            last_line = Some(key);
                        }
                    }
                }
                Some(TaskEvent::Progress(ProgressReport::UpdateTotal(total))) => {
                    log::info!("{} files to update", total);
                }
                Some(TaskEvent::Progress(ProgressReport::UpdateCount(count))) => {
                    eprintln!("updated {} files", count);
                }
                Some(TaskEvent::Finished(outcome)) => return outcome,
                None => {
                    return TaskOutcome::Error(EngineError::Process(
                        "task stopped without reporting an outcome".to_string(),
                    ))
                }
            },
        }
    }
}

fn exit_code(outcome: &TaskOutcome) -> i32 {
    match outcome {
        TaskOutcome::Success => 0,
        TaskOutcome::Error(EngineError::NoMatches) => 1,
        TaskOutcome::Error(_) => 2,
        TaskOutcome::Aborted => 130,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let engine = RipgrepEngine::new(config.ripgrep);

    let outcome = match cli.command {
        Commands::Version => {
            println!("{}", engine.version().await);
            return Ok(());
        }
        Commands::Search(inputs) => {
            let tasks = TaskEngine::new(engine, Arc::new(TerminalConfirm));
            drive(tasks.search(&inputs.into())).await
        }
        Commands::Replace { inputs, yes } => {
            let confirm: Arc<dyn Confirm> = if yes {
                Arc::new(FixedConfirm(Confirmation::Yes))
            } else {
                Arc::new(TerminalConfirm)
            };
            let tasks = TaskEngine::new(engine, confirm);
            drive(tasks.replace(&inputs.into())).await
        }
    };

    if let Some(message) = outcome.message() {
        match &outcome {
            TaskOutcome::Success => log::info!("{}", message),
            _ => eprintln!("{}", message),
        }
    }
    std::process::exit(exit_code(&outcome));
}
