//! Defines the budget store trait.

use time::OffsetDateTime;

use crate::{
    Error,
    budget::{Budget, BudgetBuilder},
    database_id::BudgetId,
};

/// Handles the creation, retrieval and bookkeeping of budgets.
///
/// Implementations must make [BudgetStore::increment_spent] atomic with
/// respect to other writers: two concurrent increments of 50 and 70 must
/// always add 120.
pub trait BudgetStore {
    /// Create a new budget with nothing spent.
    fn create(&self, builder: BudgetBuilder, now: OffsetDateTime) -> Result<Budget, Error>;

    /// Retrieve a budget by its `id`.
    fn get(&self, id: BudgetId) -> Result<Budget, Error>;

    /// Retrieve every budget, active or not.
    fn get_all(&self) -> Result<Vec<Budget>, Error>;

    /// Retrieve the budgets that are currently accumulating spending.
    fn get_active(&self) -> Result<Vec<Budget>, Error>;

    /// Replace the user editable fields of a budget. The cached spent amount is kept.
    fn update(
        &self,
        id: BudgetId,
        builder: BudgetBuilder,
        now: OffsetDateTime,
    ) -> Result<Budget, Error>;

    /// Activate or deactivate a budget without deleting it.
    fn set_active(&self, id: BudgetId, is_active: bool, now: OffsetDateTime) -> Result<(), Error>;

    /// Delete a budget and its alerts.
    fn delete(&self, id: BudgetId) -> Result<(), Error>;

    /// Add `amount` to the cached spent amount in a single atomic step.
    fn increment_spent(&self, id: BudgetId, amount: f64, now: OffsetDateTime)
    -> Result<(), Error>;

    /// Overwrite the cached spent amount, e.g. with a value reconciled from the ledger.
    fn set_spent(&self, id: BudgetId, spent: f64, now: OffsetDateTime) -> Result<(), Error>;
}
