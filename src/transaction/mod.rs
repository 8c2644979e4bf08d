//! Transaction management for the budgeting engine.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - Database functions for storing, querying, and managing transactions
//! - The [Ledger] aggregate queries that budgets are reconciled against

mod core;
mod ledger;

pub use core::{
    Transaction, TransactionBuilder, TransactionType, create_transaction,
    create_transaction_table, delete_transaction, get_transaction,
    update_transaction,
};
pub use ledger::{Ledger, SqliteLedger};
