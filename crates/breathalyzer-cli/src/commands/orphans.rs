use breathalyzer_core::{OrphanQueue, RankedStore};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum OrphansAction {
    /// List readings that could not be written to the leaderboard
    List,
    /// Insert orphaned readings into the leaderboard
    Replay,
}

pub fn run(action: OrphansAction) -> Result<(), Box<dyn std::error::Error>> {
    let (dir, config) = super::load_config()?;
    let queue = OrphanQueue::open(config.orphans_path(&dir))?;

    match action {
        OrphansAction::List => {
            println!("{}", serde_json::to_string_pretty(&queue.list())?);
        }
        OrphansAction::Replay => {
            let store = RankedStore::open(config.leaderboard_path(&dir));
            let report = queue.replay(&store);
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.remaining > 0 {
                return Err(format!("{} reading(s) still orphaned", report.remaining).into());
            }
        }
    }
    Ok(())
}
