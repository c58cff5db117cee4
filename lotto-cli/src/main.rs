mod commands;
mod config;

use clap::{Parser, Subcommand};
use config::CliConfig;
use lotto_core::NotificationKind;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "lotto")]
#[command(about = "Commit-reveal lottery: commitments, verification and round simulation")]
#[command(version)]
struct Cli {
    /// Data directory for the round database
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Game rules file (JSON); defaults to lotto.json in the data directory
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive round commitments from a secret
    Commit {
        /// Secret phrase (prompted if neither phrase nor salt is given)
        #[arg(short, long)]
        phrase: Option<String>,
        /// Raw 32-byte salt (hex)
        #[arg(short, long)]
        salt: Option<String>,
        /// Hash-chain length
        #[arg(short = 'n', long, default_value_t = 12)]
        iterations: u8,
    },
    /// Check a revealed salt against published commitments
    Verify {
        /// Revealed salt (hex)
        #[arg(long)]
        salt: String,
        /// Hash-chain length
        #[arg(short = 'n', long)]
        iterations: u8,
        /// Published salt hash (hex)
        #[arg(long)]
        salt_hash: String,
        /// Published salt-N hash (hex)
        #[arg(long)]
        salt_n_hash: String,
    },
    /// Run a full round on an in-process chain
    Simulate {
        /// Number of players
        #[arg(long, default_value_t = 5)]
        players: u32,
        /// Random tickets bought by each player
        #[arg(long, default_value_t = 2)]
        tickets: u32,
        /// Curator secret phrase (random salt if omitted)
        #[arg(long)]
        phrase: Option<String>,
        /// Hash-chain length
        #[arg(short = 'n', long, default_value_t = 12)]
        iterations: u8,
        /// Fix the winning pick (rehearsal round)
        #[arg(long)]
        winning_pick: Option<String>,
        /// Extra pick wagered by the first player (repeatable)
        #[arg(long = "pick")]
        picks: Vec<String>,
    },
    /// List finalized rounds
    History,
    /// List notifications recorded at a block
    Events {
        /// Block number
        #[arg(short, long)]
        block: u64,
        /// Notification kind (round_created, round_started, draw, round_completed, winner)
        #[arg(short, long)]
        kind: Option<NotificationKind>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "lotto={},lotto_engine={},lotto_core={}",
            log_level, log_level, log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CliConfig::resolve(cli.data_dir, cli.config.as_deref(), cli.verbose)?;

    // Ensure data directory exists
    tokio::fs::create_dir_all(&config.data_dir).await?;

    // Execute command
    let result = match cli.command {
        Commands::Commit {
            phrase,
            salt,
            iterations,
        } => commands::commit(phrase, salt, iterations),
        Commands::Verify {
            salt,
            iterations,
            salt_hash,
            salt_n_hash,
        } => commands::verify(&salt, iterations, &salt_hash, &salt_n_hash),
        Commands::Simulate {
            players,
            tickets,
            phrase,
            iterations,
            winning_pick,
            picks,
        } => {
            let opts = commands::SimulateOptions {
                players,
                tickets,
                phrase,
                iterations,
                winning_pick,
                picks,
            };
            commands::simulate(&config, opts).await
        }
        Commands::History => commands::history(&config).await,
        Commands::Events { block, kind } => commands::events(&config, block, kind).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
