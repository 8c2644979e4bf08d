//! Budgets and the bookkeeping of how much has been spent against them.
//!
//! This module contains:
//! - The `Budget` model and `BudgetBuilder`
//! - The [BudgetStore] trait and its SQLite implementation
//! - The accumulator that adds new expenses to a budget's cached spent amount
//! - Reconciliation of the cached amount against the transaction ledger
//! - Progress and pace calculations, and the summaries built from them

mod accumulator;
mod core;
mod db;
mod progress;
mod reconcile;
mod store;
mod summary;

pub use accumulator::{AccumulatorOutcome, on_expense_recorded, select_budget_for_expense};
pub use core::{Budget, BudgetBuilder, BudgetPeriod};
pub use db::{SqliteBudgetStore, create_budget_table};
pub use progress::{BudgetProgress, BudgetStatus, NEAR_LIMIT_PERCENTAGE};
pub use reconcile::{
    Spent, SpentSource, cached_spent, ledger_spent, reconciled_spent, resync_budget_spent,
};
pub use store::BudgetStore;
pub use summary::{BudgetSummary, get_budget_summary, list_budget_summaries};
