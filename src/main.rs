use anyhow::Result;
use ayah_bot::commands::common::{resolve_config, Overrides};
use ayah_bot::commands::{ping, post, preview, status};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ayah-bot")]
#[command(about = "Posts one Quran verse per run, resuming from a checkpoint", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a TOML config file (default: ./ayah-bot.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the verse dataset CSV
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    /// Path to the checkpoint JSON file
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Post the next verse and advance the checkpoint on confirmed delivery
    Post {
        /// Destination channel (overrides CHANNEL_ID)
        #[arg(long)]
        channel: Option<String>,

        /// Verify bot credentials with getMe before posting
        #[arg(long)]
        preflight: bool,
    },

    /// Show the checkpoint and the verse the next run would post
    Status,

    /// Render the next message without sending it or touching the checkpoint
    Preview {
        /// Render this dataset index instead of the checkpoint's next verse
        #[arg(long)]
        index: Option<usize>,
    },

    /// Check bot credentials against the Telegram API
    Ping,
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let mut overrides = Overrides {
        config: cli.config,
        dataset: cli.dataset,
        state: cli.state,
        channel: None,
    };

    match cli.command {
        Commands::Post { channel, preflight } => {
            overrides.channel = channel;
            let config = resolve_config(&overrides)?;
            tracing::info!(
                version = env!("CARGO_PKG_VERSION"),
                dataset = %config.dataset_path.display(),
                state = %config.state_path.display(),
                "starting ayah-bot"
            );
            post::execute(&config, preflight)
        }
        Commands::Status => status::execute(&resolve_config(&overrides)?),
        Commands::Preview { index } => preview::execute(&resolve_config(&overrides)?, index),
        Commands::Ping => ping::execute(&resolve_config(&overrides)?),
    }
}
