//! Threshold alerts on budgets.
//!
//! An alert fires once the percentage of a budget that has been spent reaches
//! its threshold, and then stays fired.

mod core;
mod db;
mod evaluate;
mod store;

pub use core::{Alert, AlertState, Threshold, alert_message};
pub use db::{SqliteAlertStore, create_alert_table};
pub use evaluate::{AlertView, evaluate_alerts};
pub use store::AlertStore;
