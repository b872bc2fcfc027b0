//! memtrain CLI: timed study/recall memory exercises in the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use memtrain_core::model::ExerciseKind;

mod commands;

#[derive(Parser)]
#[command(name = "memtrain", version, about = "Timed study and recall memory exercises")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one exercise session
    Play {
        /// Exercise kind: words, faces, digits
        #[arg(long)]
        kind: Option<ExerciseKind>,

        /// Use the built-in offline service instead of the configured one
        #[arg(long)]
        offline: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory to save the session summary JSON into
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show study pacing for a number of items
    Pacing {
        /// Number of items in the session
        #[arg(long)]
        items: usize,

        /// Skill level (omit to show every tier)
        #[arg(long)]
        skill: Option<i32>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List saved session summaries
    History {
        /// Directory summaries were saved into
        #[arg(long)]
        dir: PathBuf,
    },

    /// Create a starter config file
    Init,
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("memtrain=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Play {
            kind,
            offline,
            config,
            output,
        } => commands::play::execute(kind, offline, config, output).await,
        Commands::Pacing {
            items,
            skill,
            config,
        } => commands::pacing::execute(items, skill, config),
        Commands::History { dir } => commands::history::execute(dir),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
