/*! This module sets up the database schema used by the budgeting engine. */

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error, alert::create_alert_table, budget::create_budget_table,
    category::create_category_table, transaction::create_transaction_table,
};

/// Create every table the engine needs, if they do not already exist.
///
/// Foreign keys are switched on for `connection`, which budgets and alerts
/// rely on to be deleted along with their category or budget.
///
/// # Errors
/// Returns an error if a table cannot be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_category_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_budget_table(&transaction)?;
    create_alert_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
