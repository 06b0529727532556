use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use harrow_core::runner::{Runner, RunnerConfig};

mod commands;

/// Harrow - a dependency-driven task runner
#[derive(Parser)]
#[command(name = "harrow")]
#[command(about = "A dependency-driven task runner")]
#[command(version)]
struct Cli {
    /// Path to the taskfile (searched upward from the current directory
    /// when omitted)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Number of workers; 1 runs tasks sequentially
    #[arg(short, long, default_value_t = 1)]
    jobs: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run tasks, each optionally with bracketed arguments like
    /// `deploy[staging,us-east]`
    Run {
        /// Targets to invoke; defaults to the `default` task
        targets: Vec<String>,
    },
    /// List defined tasks
    List {
        /// Include tasks without a description
        #[arg(long)]
        all: bool,
    },
}

const TASKFILE_NAMES: &[&str] = &["harrow.yml", "Harrowfile.yml"];

/// Walk up from the current directory looking for a taskfile
fn find_taskfile() -> Option<PathBuf> {
    let mut dir = std::env::current_dir().ok()?;
    loop {
        for name in TASKFILE_NAMES {
            let candidate = dir.join(name);
            if candidate.exists() {
                return Some(candidate);
            }
        }
        if !dir.pop() {
            return None;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if cli.jobs < 1 {
        anyhow::bail!("--jobs must be at least 1");
    }

    let taskfile = match cli.file {
        Some(file) => file,
        None => find_taskfile().ok_or_else(|| {
            anyhow::anyhow!(
                "no taskfile found (looked for {} upward from the current directory)",
                TASKFILE_NAMES.join(", ")
            )
        })?,
    };

    let mut runner = Runner::new(RunnerConfig { jobs: cli.jobs });
    runner
        .load_taskfile(taskfile.to_string_lossy().into_owned())
        .map_err(|e| anyhow::anyhow!("failed to load {}: {}", taskfile.display(), e))?;

    match cli.command {
        Commands::Run { targets } => commands::run::execute(&mut runner, &targets).await,
        Commands::List { all } => commands::list::execute(&runner, all),
    }
}
