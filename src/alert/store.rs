//! Defines the alert store trait.

use time::OffsetDateTime;

use crate::{
    Error,
    alert::{Alert, Threshold},
    database_id::{AlertId, BudgetId},
};

/// Handles the creation, retrieval and latching of budget alerts.
pub trait AlertStore {
    /// Create an untriggered alert for a budget.
    fn create(&self, budget_id: BudgetId, threshold: Threshold) -> Result<Alert, Error>;

    /// Retrieve an alert by its `id`.
    fn get(&self, id: AlertId) -> Result<Alert, Error>;

    /// Retrieve the alerts of a budget, lowest threshold first.
    fn get_by_budget(&self, budget_id: BudgetId) -> Result<Vec<Alert>, Error>;

    /// Latch an alert as triggered at `at` and return the stored alert.
    ///
    /// An alert that has already triggered keeps its original trigger time.
    fn mark_triggered(&self, id: AlertId, at: OffsetDateTime) -> Result<Alert, Error>;

    /// Delete an alert.
    fn delete(&self, id: AlertId) -> Result<(), Error>;
}
