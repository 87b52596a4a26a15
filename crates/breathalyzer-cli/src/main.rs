use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "breathalyzer-cli", version, about = "Breathalyzer leaderboard admin CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Leaderboard listing
    Leaderboard {
        #[command(subcommand)]
        action: commands::leaderboard::LeaderboardAction,
    },
    /// Whether the cooldown allows a new session
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Readings that failed to persist
    Orphans {
        #[command(subcommand)]
        action: commands::orphans::OrphansAction,
    },
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Leaderboard { action } => commands::leaderboard::run(action),
        Commands::Status { json } => commands::status::run(json),
        Commands::Config { action } => commands::config::run(action),
        Commands::Orphans { action } => commands::orphans::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
