use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::Duration;

use family_budget::{
    Budget, BudgetPeriod, BudgetTracker, CategoryName, Transaction, TrackerConfig,
    TransactionType, now_in_timezone,
};

/// A utility for creating a test database for family_budget.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The canonical timezone used to decide which month the sample data falls in.
    #[arg(long, short, default_value = "Etc/UTC")]
    timezone: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    let now = now_in_timezone(&args.timezone)?;
    let today = now.date();

    println!("Creating database at {output_path:#?}");
    let tracker = BudgetTracker::new(
        Connection::open(output_path)?,
        TrackerConfig {
            local_timezone: args.timezone,
            ..Default::default()
        },
    )?;

    println!("Creating categories...");
    let groceries = tracker.create_category(CategoryName::new("Groceries")?)?;
    let transport = tracker.create_category(CategoryName::new("Transport")?)?;
    let fun = tracker.create_category(CategoryName::new("Entertainment")?)?;

    println!("Creating budgets and alerts...");
    let monthly_budgets = [
        (&groceries, 800.0),
        (&transport, 250.0),
        (&fun, 150.0),
    ];
    for (category, amount) in monthly_budgets {
        let budget = tracker.create_budget(
            Budget::build_for_period(category.name.as_ref(), amount, BudgetPeriod::Monthly, today)?
                .category_id(Some(category.id)),
            now,
        )?;
        tracker.create_alert(budget.id, 80.0)?;
        tracker.create_alert(budget.id, 100.0)?;
    }

    let family = tracker.create_budget(
        Budget::build_for_period("Household", 2000.0, BudgetPeriod::Monthly, today)?,
        now,
    )?;
    tracker.create_alert(family.id, 90.0)?;

    println!("Creating transactions...");
    let month_start = today.replace_day(1)?;
    let transactions = [
        (0, 182.40, Some(groceries.id), "Weekly shop"),
        (1, 45.00, Some(transport.id), "Fuel"),
        (2, 64.99, Some(fun.id), "Concert tickets"),
        (6, 156.10, Some(groceries.id), "Weekly shop"),
        (7, 38.50, Some(transport.id), "Bus pass top up"),
        (9, 89.00, Some(fun.id), "Dinner out"),
        (12, 120.00, None, "Power bill"),
    ];
    for (day_offset, amount, category_id, description) in transactions {
        let date = month_start + Duration::days(day_offset);
        if date > today {
            continue;
        }

        tracker.record_transaction(
            Transaction::build(amount, TransactionType::Expense, date, description)
                .category_id(category_id),
            now,
        )?;
    }

    tracker.record_transaction(
        Transaction::build(3200.0, TransactionType::Income, month_start, "Salary"),
        now,
    )?;

    println!("Success!");

    Ok(())
}
