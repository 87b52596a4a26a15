use breathalyzer_core::RankedStore;
use chrono::Utc;

/// Cooldown as seen from the stored leaderboard.
///
/// The CLI has no view of a running server's session, so only the cooldown is
/// reported.
pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (dir, config) = super::load_config()?;
    let store = RankedStore::open(config.leaderboard_path(&dir));
    let status = config.cooldown().can_start(&store, None, Utc::now())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else if status.allowed {
        println!("READY");
    } else {
        println!("WAIT {} MINUTES", status.minutes_remaining);
    }
    Ok(())
}
