pub mod config;
pub mod leaderboard;
pub mod orphans;
pub mod status;

use std::path::PathBuf;

use breathalyzer_core::{data_dir, Config};

/// Resolve the data directory and load its config.
pub fn load_config() -> Result<(PathBuf, Config), Box<dyn std::error::Error>> {
    let dir = data_dir()?;
    let config = Config::load_from(&dir)?;
    Ok((dir, config))
}
