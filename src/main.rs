//! ferry - run ordered filesystem transfer plans with progress.
//!
//! Usage:
//!   ferry copy SOURCES... --to DIR        Copy files and directories
//!   ferry move SOURCES... --to DIR        Move files and directories
//!   ferry archive SOURCES... --to ZIP     Pack sources into a zip archive
//!   ferry unarchive ZIPS... --to DIR      Extract zip archives
//!   ferry bundle SOURCES... --to ZIP      Stage, archive, then clean up
//!   ferry mkdir PATHS...                  Create directories
//!   ferry remove PATHS...                 Delete files and directories
//!
//! Ctrl-C cancels the running plan; cleanup steps still run.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result, eyre};
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

use ferry_core::{SizeFormat, format_size};
use ferry_engine::{
    Action, Messages, PlanBuilder, TaskSpec, TransferConfig, TransferEngine, TransferHandle,
    TransferOutcome, TransferPlan, TransferProgress,
};

const BAR_WIDTH: usize = 30;
const EXIT_CANCELLED: u8 = 130;

#[derive(Parser)]
#[command(
    name = "ferry",
    version,
    about = "Run filesystem transfer plans with progress",
    long_about = "ferry runs a sequence of filesystem operations as one unit of work,\n\
                  shows byte-weighted progress, and always runs its cleanup steps,\n\
                  even when the main steps fail or are cancelled with Ctrl-C."
)]
struct Cli {
    /// JSON file of message templates overriding the built-in English ones
    #[arg(long, global = true)]
    messages: Option<PathBuf>,

    /// Pause before the first step, in milliseconds
    #[arg(long, global = true, default_value = "0")]
    delay_ms: u64,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Copy files and directories into a directory
    Copy {
        #[arg(required = true)]
        sources: Vec<PathBuf>,
        /// Destination directory (created if missing)
        #[arg(long)]
        to: PathBuf,
    },

    /// Move files and directories into a directory
    Move {
        #[arg(required = true)]
        sources: Vec<PathBuf>,
        /// Destination directory (created if missing)
        #[arg(long)]
        to: PathBuf,
    },

    /// Pack files and directories into a zip archive
    Archive {
        #[arg(required = true)]
        sources: Vec<PathBuf>,
        /// Archive file to write
        #[arg(long)]
        to: PathBuf,
    },

    /// Extract zip archives into a directory
    Unarchive {
        #[arg(required = true)]
        archives: Vec<PathBuf>,
        /// Destination directory (created if missing)
        #[arg(long)]
        to: PathBuf,
    },

    /// Copy sources into a staging directory, archive it, then remove it
    Bundle {
        #[arg(required = true)]
        sources: Vec<PathBuf>,
        /// Archive file to write
        #[arg(long)]
        to: PathBuf,
    },

    /// Create directories, including missing parents
    Mkdir {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Delete files and directories; missing paths are ignored
    Remove {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let messages = load_messages(cli.messages.as_deref())?;
    let config = TransferConfig::builder()
        .start_delay(Duration::from_millis(cli.delay_ms))
        .build()?;
    let plan = build_plan(cli.command)?;

    let engine = TransferEngine::new(messages).with_config(config);
    let (tx, rx) = oneshot::channel();
    let handle = engine.start(plan, tx);

    match follow(&handle, rx).await? {
        TransferOutcome::Success(summary) => {
            eprintln!(
                "Done: {} steps, {} in {:.1}s",
                summary.steps_completed,
                format_size(summary.bytes_processed, SizeFormat::Binary),
                summary.elapsed.as_secs_f64()
            );
            Ok(ExitCode::SUCCESS)
        }
        TransferOutcome::Cancelled => {
            eprintln!("Cancelled");
            Ok(ExitCode::from(EXIT_CANCELLED))
        }
        TransferOutcome::Failure(error) => Err(eyre!(error).wrap_err("Transfer failed")),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_messages(path: Option<&Path>) -> Result<Messages> {
    let Some(path) = path else {
        return Ok(Messages::english());
    };

    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read messages from {}", path.display()))?;
    let custom = Messages::from_json_str(&json)?;
    Ok(Messages::english().merged(custom))
}

fn build_plan(command: Command) -> Result<TransferPlan> {
    let builder = match command {
        Command::Copy { sources, to } => PlanBuilder::new().main(Action::Copy, sources, to),
        Command::Move { sources, to } => PlanBuilder::new().main(Action::Move, sources, to),
        Command::Archive { sources, to } => PlanBuilder::new().main(Action::Archive, sources, to),
        Command::Unarchive { archives, to } => {
            PlanBuilder::new().main(Action::Unarchive, archives, to)
        }
        Command::Bundle { sources, to } => bundle_plan(sources, to),
        Command::Mkdir { paths } => {
            PlanBuilder::new().add_main(TaskSpec::untargeted(Action::MakeDirectory, paths))
        }
        Command::Remove { paths } => {
            PlanBuilder::new().add_main(TaskSpec::untargeted(Action::Remove, paths))
        }
    };

    Ok(builder.build()?)
}

/// Stage the sources in a scratch directory, archive its contents, and
/// remove the scratch directory whatever happens.
fn bundle_plan(sources: Vec<PathBuf>, archive: PathBuf) -> PlanBuilder {
    let staging = std::env::temp_dir().join(format!("ferry-bundle-{}", std::process::id()));
    let listed = staging.clone();

    PlanBuilder::new()
        .add_main(TaskSpec::untargeted(Action::MakeDirectory, [staging.clone()]))
        .main(Action::Copy, sources, staging.clone())
        .add_main(TaskSpec::lazy_sources(
            Action::Archive,
            move || {
                let mut staged: Vec<PathBuf> = fs::read_dir(&listed)
                    .map(|entries| entries.flatten().map(|e| e.path()).collect())
                    .unwrap_or_default();
                staged.sort();
                staged
            },
            archive,
        ))
        .add_cleanup(TaskSpec::untargeted(Action::Remove, [staging]))
}

/// Render progress until the outcome arrives; Ctrl-C requests cancellation.
async fn follow(
    handle: &TransferHandle,
    mut done: oneshot::Receiver<TransferOutcome>,
) -> Result<TransferOutcome> {
    let mut progress = handle.subscribe();
    let mut interrupted = false;

    loop {
        tokio::select! {
            outcome = &mut done => {
                render(&progress.borrow());
                eprintln!();
                return outcome.wrap_err("Transfer worker stopped without an outcome");
            }
            changed = progress.changed() => {
                if changed.is_err() {
                    let outcome = (&mut done).await;
                    eprintln!();
                    return outcome.wrap_err("Transfer worker stopped without an outcome");
                }
                render(&progress.borrow_and_update());
            }
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                handle.cancel();
            }
        }
    }
}

fn render(progress: &TransferProgress) {
    let bar = match progress.fraction() {
        Some(fraction) => {
            let filled = ((fraction * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
            format!(
                "[{}{}] {:>3.0}%",
                "#".repeat(filled),
                " ".repeat(BAR_WIDTH - filled),
                fraction * 100.0
            )
        }
        None => format!("[{:^width$}]", "working", width = BAR_WIDTH),
    };
    eprint!("\r\x1b[2K{bar} {}", progress.status);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_copy() {
        let cli = Cli::try_parse_from(["ferry", "copy", "a", "b", "--to", "out"]).unwrap();
        let Command::Copy { sources, to } = cli.command else {
            panic!("expected copy");
        };
        assert_eq!(sources, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(to, PathBuf::from("out"));
    }

    #[test]
    fn test_cli_requires_sources() {
        assert!(Cli::try_parse_from(["ferry", "archive", "--to", "out.zip"]).is_err());
    }

    #[test]
    fn test_bundle_plan_shape() {
        let plan = bundle_plan(vec![PathBuf::from("a")], PathBuf::from("out.zip"))
            .build()
            .unwrap();
        assert_eq!(plan.steps_count(), 2);
        assert_eq!(plan.main_steps().len(), 3);
        assert_eq!(plan.cleanup_steps()[0].action(), Action::Remove);
    }
}
