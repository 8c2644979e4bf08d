//! Keeps the cached spent amount of budgets up to date as expenses are recorded.
//!
//! This is best-effort bookkeeping: failures are logged and never propagate
//! back to the code that recorded the transaction.

use std::cmp::Ordering;

use time::OffsetDateTime;

use crate::{
    budget::{Budget, BudgetStore},
    database_id::BudgetId,
    transaction::Transaction,
};

/// What happened when an expense was applied to the budgets.
#[derive(Debug, Clone, PartialEq)]
pub enum AccumulatorOutcome {
    /// The transaction was income, which budgets do not track.
    NotAnExpense,
    /// No active budget covers the transaction's category and date.
    NoMatchingBudget,
    /// The transaction amount was added to the budget's cached spent amount.
    Applied {
        /// The budget that was incremented.
        budget_id: BudgetId,
        /// The amount added.
        amount: f64,
    },
    /// The budgets could not be read or written. The error has been logged.
    Failed,
}

/// Pick the budget that an expense counts towards.
///
/// Candidates are active budgets for the transaction's category whose window
/// contains the transaction date. Family-wide budgets are never picked since
/// they are only ever reconciled from the ledger. When several candidates
/// remain, the one with the shortest window wins, then the one that started
/// most recently, then the one with the lowest ID.
pub fn select_budget_for_expense<'a>(
    budgets: &'a [Budget],
    transaction: &Transaction,
) -> Option<&'a Budget> {
    let category_id = transaction.category_id?;

    budgets
        .iter()
        .filter(|budget| {
            budget.is_active
                && budget.category_id == Some(category_id)
                && budget.contains_date(transaction.date)
        })
        .min_by(|a, b| compare_candidates(a, b))
}

fn compare_candidates(a: &Budget, b: &Budget) -> Ordering {
    a.window_days()
        .cmp(&b.window_days())
        .then_with(|| b.start_date.cmp(&a.start_date))
        .then_with(|| a.id.cmp(&b.id))
}

/// Add a newly recorded expense to the budget it funds.
///
/// Call this after `transaction` has been durably stored. The increment is
/// delegated to [BudgetStore::increment_spent], which is atomic, so
/// concurrent expenses against the same budget are all counted.
///
/// This function never fails: errors are logged and reported as
/// [AccumulatorOutcome::Failed].
pub fn on_expense_recorded(
    transaction: &Transaction,
    budget_store: &impl BudgetStore,
    now: OffsetDateTime,
) -> AccumulatorOutcome {
    if !transaction.is_expense() {
        return AccumulatorOutcome::NotAnExpense;
    }

    let budgets = match budget_store.get_active() {
        Ok(budgets) => budgets,
        Err(error) => {
            tracing::error!(
                "could not load active budgets for transaction {}: {error}",
                transaction.id
            );
            return AccumulatorOutcome::Failed;
        }
    };

    let Some(budget) = select_budget_for_expense(&budgets, transaction) else {
        tracing::debug!(
            "no active budget covers transaction {} (category {:?}, date {})",
            transaction.id,
            transaction.category_id,
            transaction.date
        );
        return AccumulatorOutcome::NoMatchingBudget;
    };

    match budget_store.increment_spent(budget.id, transaction.amount, now) {
        Ok(()) => {
            tracing::info!(
                "added {} from transaction {} to budget {}",
                transaction.amount,
                transaction.id,
                budget.id
            );
            AccumulatorOutcome::Applied {
                budget_id: budget.id,
                amount: transaction.amount,
            }
        }
        Err(error) => {
            tracing::error!(
                "could not add transaction {} to budget {}: {error}",
                transaction.id,
                budget.id
            );
            AccumulatorOutcome::Failed
        }
    }
}


#[cfg(test)]
mod on_expense_recorded_tests {
    use std::{
        sync::{Arc, Mutex},
        thread,
    };

    use time::macros::{date, datetime};

    use crate::{
        Error,
        budget::{Budget, BudgetBuilder, BudgetStore, SqliteBudgetStore},
        category::{CategoryName, create_category},
        database_id::BudgetId,
        test_utils::{expense, get_test_connection, test_budget},
        transaction::{Transaction, TransactionType},
    };

    use super::{AccumulatorOutcome, on_expense_recorded};

    const NOW: time::OffsetDateTime = datetime!(2025-01-15 12:00 UTC);

    fn get_test_store() -> (SqliteBudgetStore, Budget) {
        let connection = get_test_connection();
        let category_id = create_category(CategoryName::new_unchecked("Food"), &connection)
            .unwrap()
            .id;
        let store = SqliteBudgetStore::new(Arc::new(Mutex::new(connection)));
        let budget = store
            .create(
                Budget::build("Food", 1000.0, date!(2025 - 01 - 01), date!(2025 - 01 - 31))
                    .category_id(Some(category_id)),
                NOW,
            )
            .unwrap();

        (store, budget)
    }

    #[test]
    fn adds_expense_to_matching_budget() {
        let (store, budget) = get_test_store();
        let transaction = expense(42.5, budget.category_id, date!(2025 - 01 - 15));

        let outcome = on_expense_recorded(&transaction, &store, NOW);

        assert_eq!(
            outcome,
            AccumulatorOutcome::Applied {
                budget_id: budget.id,
                amount: 42.5
            }
        );
        let updated = store.get(budget.id).unwrap();
        assert_eq!(updated.spent, 42.5);
        assert_eq!(updated.updated_at, NOW);
    }

    #[test]
    fn ignores_income() {
        let (store, budget) = get_test_store();
        let transaction = Transaction {
            transaction_type: TransactionType::Income,
            ..expense(42.5, budget.category_id, date!(2025 - 01 - 15))
        };

        let outcome = on_expense_recorded(&transaction, &store, NOW);

        assert_eq!(outcome, AccumulatorOutcome::NotAnExpense);
        assert_eq!(store.get(budget.id).unwrap().spent, 0.0);
    }

    #[test]
    fn no_match_is_a_no_op() {
        let (store, budget) = get_test_store();
        let transaction = expense(42.5, None, date!(2025 - 01 - 15));

        let outcome = on_expense_recorded(&transaction, &store, NOW);

        assert_eq!(outcome, AccumulatorOutcome::NoMatchingBudget);
        assert_eq!(store.get(budget.id).unwrap().spent, 0.0);
    }

    #[test]
    fn concurrent_expenses_are_both_counted() {
        let (store, budget) = get_test_store();
        let first = expense(50.0, budget.category_id, date!(2025 - 01 - 15));
        let second = expense(70.0, budget.category_id, date!(2025 - 01 - 16));

        thread::scope(|scope| {
            for transaction in [&first, &second] {
                let store = store.clone();
                scope.spawn(move || on_expense_recorded(transaction, &store, NOW));
            }
        });

        assert_eq!(store.get(budget.id).unwrap().spent, 120.0);
    }

    /// A store whose operations fail, to check that failures are swallowed.
    ///
    /// `get_active` returns `active_budgets` when set so that the increment is reached.
    struct BrokenStore {
        active_budgets: Option<Vec<Budget>>,
    }

    impl BudgetStore for BrokenStore {
        fn create(&self, _: BudgetBuilder, _: time::OffsetDateTime) -> Result<Budget, Error> {
            Err(Error::DatabaseLockError)
        }

        fn get(&self, _: BudgetId) -> Result<Budget, Error> {
            Err(Error::DatabaseLockError)
        }

        fn get_all(&self) -> Result<Vec<Budget>, Error> {
            Err(Error::DatabaseLockError)
        }

        fn get_active(&self) -> Result<Vec<Budget>, Error> {
            self.active_budgets.clone().ok_or(Error::DatabaseLockError)
        }

        fn update(
            &self,
            _: BudgetId,
            _: BudgetBuilder,
            _: time::OffsetDateTime,
        ) -> Result<Budget, Error> {
            Err(Error::DatabaseLockError)
        }

        fn set_active(&self, _: BudgetId, _: bool, _: time::OffsetDateTime) -> Result<(), Error> {
            Err(Error::DatabaseLockError)
        }

        fn delete(&self, _: BudgetId) -> Result<(), Error> {
            Err(Error::DatabaseLockError)
        }

        fn increment_spent(
            &self,
            _: BudgetId,
            _: f64,
            _: time::OffsetDateTime,
        ) -> Result<(), Error> {
            Err(Error::DatabaseLockError)
        }

        fn set_spent(&self, _: BudgetId, _: f64, _: time::OffsetDateTime) -> Result<(), Error> {
            Err(Error::DatabaseLockError)
        }
    }

    #[test]
    fn store_failure_is_reported_not_raised() {
        let transaction = expense(42.5, Some(1), date!(2025 - 01 - 15));

        let outcome = on_expense_recorded(
            &transaction,
            &BrokenStore {
                active_budgets: None,
            },
            NOW,
        );

        assert_eq!(outcome, AccumulatorOutcome::Failed);
    }

    #[test]
    fn increment_failure_is_reported_not_raised() {
        let store = BrokenStore {
            active_budgets: Some(vec![test_budget(
                7,
                Some(1),
                date!(2025 - 01 - 01),
                date!(2025 - 01 - 31),
            )]),
        };
        let transaction = expense(42.5, Some(1), date!(2025 - 01 - 15));

        let outcome = on_expense_recorded(&transaction, &store, NOW);

        assert_eq!(outcome, AccumulatorOutcome::Failed);
    }
}
