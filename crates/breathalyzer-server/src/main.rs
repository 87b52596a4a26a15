use std::path::PathBuf;

use breathalyzer_core::{Breathalyzer, Config};
use breathalyzer_server::{start_server, state::AppState};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "breathalyzer-server", version, about = "Breathalyzer leaderboard HTTP server")]
struct Args {
    /// Directory holding config.toml and the leaderboard (defaults to the user data dir)
    #[arg(long, env = "BREATHALYZER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Bind host, overrides server.host
    #[arg(long)]
    host: Option<String>,

    /// Bind port, overrides server.port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run(Args::parse()).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let data_dir = match args.data_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            dir
        }
        None => breathalyzer_core::data_dir()?,
    };

    let mut config = Config::load_from(&data_dir)?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    let address = format!("{}:{}", config.server.host, config.server.port);

    info!(data_dir = %data_dir.display(), "Initializing state...");
    let station = Breathalyzer::open(config, &data_dir)?;

    info!("Starting server...");
    start_server(&address, AppState::new(station)).await?;
    Ok(())
}
