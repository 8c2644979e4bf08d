//! Shared helpers for unit tests.

use rusqlite::Connection;
use time::{Date, macros::datetime};

use crate::{
    budget::{Budget, BudgetPeriod},
    category::CategoryId,
    database_id::BudgetId,
    db::initialize,
    transaction::{Transaction, TransactionType},
};

/// An in-memory database with every table created.
pub fn get_test_connection() -> Connection {
    let connection = Connection::open_in_memory().unwrap();
    initialize(&connection).unwrap();
    connection
}

/// An expense that has not been read from a database.
pub fn expense(amount: f64, category_id: Option<CategoryId>, date: Date) -> Transaction {
    Transaction {
        id: 1,
        amount,
        transaction_type: TransactionType::Expense,
        category_id,
        date,
        description: String::new(),
        tags: Vec::new(),
        created_at: datetime!(2025-01-01 00:00 UTC),
        updated_at: datetime!(2025-01-01 00:00 UTC),
    }
}

/// An active budget of 1000 with nothing spent that has not been read from a database.
pub fn test_budget(
    id: BudgetId,
    category_id: Option<CategoryId>,
    start_date: Date,
    end_date: Date,
) -> Budget {
    Budget {
        id,
        name: format!("Budget {id}"),
        amount: 1000.0,
        spent: 0.0,
        period: BudgetPeriod::Custom,
        category_id,
        start_date,
        end_date,
        is_active: true,
        created_at: datetime!(2025-01-01 00:00 UTC),
        updated_at: datetime!(2025-01-01 00:00 UTC),
    }
}
