use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::exit;
use std::time::Duration;

use clap::Parser;
use rusqlite::Connection;

use family_budget::{BudgetTracker, TrackerConfig, setup_logging};

/// Print budget progress and alerts from a family_budget database as JSON.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the SQLite database.
    #[arg(long, short)]
    db_path: String,

    /// The canonical timezone used to decide what "today" is, e.g. "Pacific/Auckland".
    #[arg(long, short, default_value = "Etc/UTC")]
    timezone: String,

    /// Report a single budget with its spending reconciled against the
    /// transactions and its alerts evaluated. Without this, every budget is
    /// listed using cached spent amounts.
    #[arg(long, short)]
    budget_id: Option<i64>,

    /// Recompute the cached spent amount of the budget before reporting.
    #[arg(long, requires = "budget_id")]
    resync: bool,

    /// How long, in milliseconds, to spend summing transactions before falling
    /// back to the cached spent amount.
    #[arg(long, default_value_t = 5000)]
    ledger_timeout_ms: u64,

    /// Also write debug logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    setup_logging(args.log_file.as_deref())?;

    let db_path = Path::new(&args.db_path);
    if !db_path.is_file() {
        eprintln!("Could not find a database at {db_path:#?}");
        exit(1);
    }

    let tracker = BudgetTracker::new(
        Connection::open(db_path)?,
        TrackerConfig {
            local_timezone: args.timezone,
            ledger_timeout: Duration::from_millis(args.ledger_timeout_ms),
        },
    )?;
    let now = tracker.now()?;

    let output = match args.budget_id {
        Some(budget_id) => {
            if args.resync {
                let spent = tracker.resync_budget_spent(budget_id, now)?;
                tracing::info!("cached spent amount of budget {budget_id} set to {spent}");
            }

            serde_json::to_string_pretty(&tracker.get_budget_report(budget_id, now)?)?
        }
        None => serde_json::to_string_pretty(&tracker.list_budget_summaries(now)?)?,
    };

    println!("{output}");

    Ok(())
}
