use breathalyzer_core::{LeaderboardEntry, PageRequest, RankedStore, DEFAULT_PAGE_LIMIT};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum LeaderboardAction {
    /// Show the highest readings
    Top {
        /// Number of rows
        #[arg(short, long, default_value = "10")]
        n: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one page of the leaderboard
    Page {
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        offset: i64,
        #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT as i64)]
        limit: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: LeaderboardAction) -> Result<(), Box<dyn std::error::Error>> {
    let (dir, config) = super::load_config()?;
    let store = RankedStore::open(config.leaderboard_path(&dir));

    match action {
        LeaderboardAction::Top { n, json } => {
            let rows = store.top_n(n)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print_rows(&rows);
            }
        }
        LeaderboardAction::Page { offset, limit, json } => {
            let page = store.page(PageRequest::new(offset, limit)?)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&page)?);
            } else {
                print_rows(&page.items);
                println!("({} of {} rows)", page.items.len(), page.total);
            }
        }
    }
    Ok(())
}

fn print_rows(rows: &[LeaderboardEntry]) {
    if rows.is_empty() {
        println!("No readings yet.");
        return;
    }
    for row in rows {
        println!(
            "{:>4}  {:<24} {:.3}  {}",
            row.rank,
            row.name,
            row.bac,
            row.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
    }
}
