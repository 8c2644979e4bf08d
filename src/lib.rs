//! Family budget tracking.
//!
//! This library records household income and expenses, keeps per-category and
//! family-wide budgets in sync with the money spent against them, reports
//! progress through each budget and raises threshold alerts.
//!
//! The main entry point is [BudgetTracker], which ties the SQLite backed
//! stores together.

#![warn(missing_docs)]

use time::Date;

mod alert;
mod budget;
mod category;
mod config;
mod database_id;
mod db;
mod logging;
mod timezone;
mod tracker;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use alert::{
    Alert, AlertState, AlertStore, AlertView, SqliteAlertStore, Threshold, alert_message,
    evaluate_alerts,
};
pub use budget::{
    AccumulatorOutcome, Budget, BudgetBuilder, BudgetPeriod, BudgetProgress, BudgetStatus,
    BudgetStore, BudgetSummary, NEAR_LIMIT_PERCENTAGE, Spent, SpentSource, SqliteBudgetStore,
    cached_spent, get_budget_summary, ledger_spent, list_budget_summaries, on_expense_recorded,
    reconciled_spent, resync_budget_spent, select_budget_for_expense,
};
pub use category::{
    Category, CategoryId, CategoryName, create_category, get_all_categories, get_category,
};
pub use config::TrackerConfig;
pub use database_id::{AlertId, BudgetId, DatabaseId, TransactionId};
pub use db::initialize as initialize_db;
pub use logging::setup_logging;
pub use timezone::{get_local_offset, now_in_timezone};
pub use tracker::{BudgetReport, BudgetTracker};
pub use transaction::{
    Ledger, SqliteLedger, Transaction, TransactionBuilder, TransactionType, create_transaction,
    delete_transaction, get_transaction, update_transaction,
};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// A budget or transaction amount was zero, negative or not a number.
    #[error("{0} is not a valid amount, amounts must be greater than zero")]
    InvalidAmount(f64),

    /// A budget ends before it starts.
    #[error("the end date {end} is before the start date {start}")]
    InvalidDateRange {
        /// The first day of the budget window.
        start: Date,
        /// The last day of the budget window.
        end: Date,
    },

    /// An alert threshold outside of (0, 100].
    #[error("{0} is not a valid alert threshold, thresholds must be greater than 0 and at most 100")]
    InvalidThreshold(f64),

    /// An empty string was used to name a budget.
    #[error("budget name cannot be empty")]
    EmptyBudgetName,

    /// An empty string was used to create a category name.
    #[error("category name cannot be empty")]
    EmptyCategoryName,

    /// The budget already has an alert at this threshold.
    #[error("the budget already has an alert at {0}%")]
    DuplicateAlertThreshold(f64),

    /// The category ID used for a transaction or budget did not match a valid category.
    #[error("the category ID does not refer to a valid category")]
    InvalidCategory(Option<category::CategoryId>),

    /// A string that is not one of the transaction types.
    #[error("\"{0}\" is not a valid transaction type")]
    InvalidTransactionType(String),

    /// A string that is not one of the budget periods.
    #[error("\"{0}\" is not a valid budget period")]
    InvalidBudgetPeriod(String),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// The tags of a transaction could not be serialized as JSON.
    #[error("could not serialize tags as JSON: {0}")]
    TagSerializationError(String),

    /// A database query ran past its deadline and was interrupted.
    #[error("the query was cancelled because it took too long")]
    Cancelled,

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// Tried to update a budget that does not exist
    #[error("tried to update a budget that is not in the database")]
    UpdateMissingBudget,

    /// Tried to delete a budget that does not exist
    #[error("tried to delete a budget that is not in the database")]
    DeleteMissingBudget,

    /// Tried to delete an alert that does not exist
    #[error("tried to delete an alert that is not in the database")]
    DeleteMissingAlert,

    /// Tried to update a transaction that does not exist
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// Tried to delete a transaction that does not exist
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: rusqlite::ErrorCode::OperationInterrupted,
                    ..
                },
                _,
            ) => Error::Cancelled,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}
