//! Recomputes how much has been spent against a budget from the ledger.
//!
//! Every budget carries a cached `spent` amount that is cheap to read but may
//! drift, since it is only ever incremented when expenses are created. The
//! ledger sum is exact but costs a query. Single-budget reads use
//! [reconciled_spent]; list views use [cached_spent].

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    budget::{Budget, BudgetStore},
    database_id::BudgetId,
    transaction::{Ledger, TransactionType},
};

/// Where a spent amount came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpentSource {
    /// Summed from the ledger during this read.
    Reconciled,
    /// The budget's cached running total.
    Cached,
}

/// An amount spent against a budget and where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spent {
    /// The amount spent.
    pub amount: f64,
    /// Whether the amount was summed from the ledger or read from the cache.
    pub source: SpentSource,
}

/// The budget's cached spent amount, without touching the ledger.
pub fn cached_spent(budget: &Budget) -> Spent {
    Spent {
        amount: budget.spent,
        source: SpentSource::Cached,
    }
}

/// Sum the expenses that count towards `budget` from the ledger.
///
/// Category budgets sum their category over the budget window; family-wide
/// budgets sum every expense in the window.
///
/// # Errors
/// Returns the ledger's error unchanged.
pub fn ledger_spent(budget: &Budget, ledger: &impl Ledger) -> Result<f64, Error> {
    match budget.category_id {
        Some(category_id) => ledger.sum_by_category_and_date_range(
            category_id,
            budget.date_range(),
            TransactionType::Expense,
        ),
        None => ledger.sum_by_date_range(budget.date_range(), TransactionType::Expense),
    }
}

/// The authoritative spent amount for `budget`, falling back to the cache.
///
/// If the ledger cannot be queried (including when the query is cancelled)
/// the cached amount is returned instead of an error. The reconciled amount
/// is not written back to the budget.
pub fn reconciled_spent(budget: &Budget, ledger: &impl Ledger) -> Spent {
    match ledger_spent(budget, ledger) {
        Ok(amount) => Spent {
            amount,
            source: SpentSource::Reconciled,
        },
        Err(error) => {
            tracing::warn!(
                "could not reconcile budget {} from the ledger, using cached spent amount {}: {error}",
                budget.id,
                budget.spent
            );
            cached_spent(budget)
        }
    }
}

/// Overwrite the cached spent amount of a budget with the ledger sum.
///
/// Reads never repair the cache on their own; this is the explicit way to
/// remove drift, e.g. after transactions were edited or deleted.
///
/// # Errors
/// Returns an error if the budget does not exist, the ledger cannot be
/// queried or the budget cannot be written.
pub fn resync_budget_spent(
    id: BudgetId,
    budget_store: &impl BudgetStore,
    ledger: &impl Ledger,
    now: OffsetDateTime,
) -> Result<f64, Error> {
    let budget = budget_store.get(id)?;
    let spent = ledger_spent(&budget, ledger)?;

    if spent != budget.spent {
        tracing::info!(
            "resynced budget {id}: cached spent amount {} -> {spent}",
            budget.spent
        );
        budget_store.set_spent(id, spent, now)?;
    }

    Ok(spent)
}

#[cfg(test)]
mod reconcile_tests {
    use std::{
        cell::RefCell,
        ops::RangeInclusive,
        sync::{Arc, Mutex},
    };

    use time::{
        Date,
        macros::{date, datetime},
    };

    use crate::{
        Error,
        budget::{Budget, BudgetStore, SqliteBudgetStore},
        category::CategoryId,
        test_utils::{get_test_connection, test_budget},
        transaction::{Ledger, TransactionType},
    };

    use super::{
        Spent, SpentSource, cached_spent, ledger_spent, reconciled_spent, resync_budget_spent,
    };

    /// A ledger that returns a fixed total and records the queries it receives.
    struct StubLedger {
        total: Result<f64, fn() -> Error>,
        calls: RefCell<Vec<(Option<CategoryId>, RangeInclusive<Date>)>>,
    }

    impl StubLedger {
        fn returning(total: f64) -> Self {
            Self {
                total: Ok(total),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn failing(make_error: fn() -> Error) -> Self {
            Self {
                total: Err(make_error),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Ledger for StubLedger {
        fn sum_by_category_and_date_range(
            &self,
            category_id: CategoryId,
            date_range: RangeInclusive<Date>,
            transaction_type: TransactionType,
        ) -> Result<f64, Error> {
            assert_eq!(transaction_type, TransactionType::Expense);
            self.calls.borrow_mut().push((Some(category_id), date_range));
            self.total.map_err(|make_error| make_error())
        }

        fn sum_by_date_range(
            &self,
            date_range: RangeInclusive<Date>,
            transaction_type: TransactionType,
        ) -> Result<f64, Error> {
            assert_eq!(transaction_type, TransactionType::Expense);
            self.calls.borrow_mut().push((None, date_range));
            self.total.map_err(|make_error| make_error())
        }
    }

    #[test]
    fn category_budget_sums_its_category_over_its_window() {
        let budget = test_budget(1, Some(7), date!(2025 - 01 - 01), date!(2025 - 01 - 31));
        let ledger = StubLedger::returning(275.25);

        let spent = reconciled_spent(&budget, &ledger);

        assert_eq!(
            spent,
            Spent {
                amount: 275.25,
                source: SpentSource::Reconciled
            }
        );
        assert_eq!(
            ledger.calls.borrow().as_slice(),
            &[(Some(7), date!(2025 - 01 - 01)..=date!(2025 - 01 - 31))]
        );
    }

    #[test]
    fn family_wide_budget_sums_every_category() {
        let budget = test_budget(1, None, date!(2025 - 02 - 01), date!(2025 - 02 - 28));
        let ledger = StubLedger::returning(800.0);

        let spent = reconciled_spent(&budget, &ledger);

        assert_eq!(spent.amount, 800.0);
        assert_eq!(
            ledger.calls.borrow().as_slice(),
            &[(None, date!(2025 - 02 - 01)..=date!(2025 - 02 - 28))]
        );
    }

    #[test]
    fn ledger_failure_falls_back_to_cache() {
        let mut budget = test_budget(1, Some(7), date!(2025 - 01 - 01), date!(2025 - 01 - 31));
        budget.spent = 99.5;

        let errors: [fn() -> Error; 2] = [|| Error::Cancelled, || Error::DatabaseLockError];
        for make_error in errors {
            let spent = reconciled_spent(&budget, &StubLedger::failing(make_error));

            assert_eq!(spent, cached_spent(&budget));
            assert_eq!(spent.amount, 99.5);
            assert_eq!(spent.source, SpentSource::Cached);
        }
    }

    #[test]
    fn ledger_spent_propagates_errors() {
        let budget = test_budget(1, None, date!(2025 - 01 - 01), date!(2025 - 01 - 31));

        assert_eq!(
            ledger_spent(&budget, &StubLedger::failing(|| Error::Cancelled)),
            Err(Error::Cancelled)
        );
    }

    #[test]
    fn reconciling_does_not_write_back() {
        let store = SqliteBudgetStore::new(Arc::new(Mutex::new(get_test_connection())));
        let budget = store
            .create(
                Budget::build("Family", 2000.0, date!(2025 - 02 - 01), date!(2025 - 02 - 28)),
                datetime!(2025-02-01 00:00 UTC),
            )
            .unwrap();

        reconciled_spent(&budget, &StubLedger::returning(800.0));

        assert_eq!(store.get(budget.id).unwrap().spent, 0.0);
    }

    #[test]
    fn resync_writes_ledger_sum_to_cache() {
        let store = SqliteBudgetStore::new(Arc::new(Mutex::new(get_test_connection())));
        let budget = store
            .create(
                Budget::build("Family", 2000.0, date!(2025 - 02 - 01), date!(2025 - 02 - 28)),
                datetime!(2025-02-01 00:00 UTC),
            )
            .unwrap();
        store
            .increment_spent(budget.id, 950.0, datetime!(2025-02-02 00:00 UTC))
            .unwrap();

        let spent = resync_budget_spent(
            budget.id,
            &store,
            &StubLedger::returning(800.0),
            datetime!(2025-02-03 00:00 UTC),
        );

        assert_eq!(spent, Ok(800.0));
        assert_eq!(store.get(budget.id).unwrap().spent, 800.0);
    }

    #[test]
    fn resync_leaves_cache_alone_when_ledger_fails() {
        let store = SqliteBudgetStore::new(Arc::new(Mutex::new(get_test_connection())));
        let budget = store
            .create(
                Budget::build("Family", 2000.0, date!(2025 - 02 - 01), date!(2025 - 02 - 28)),
                datetime!(2025-02-01 00:00 UTC),
            )
            .unwrap();
        store
            .increment_spent(budget.id, 950.0, datetime!(2025-02-02 00:00 UTC))
            .unwrap();

        let result = resync_budget_spent(
            budget.id,
            &store,
            &StubLedger::failing(|| Error::Cancelled),
            datetime!(2025-02-03 00:00 UTC),
        );

        assert_eq!(result, Err(Error::Cancelled));
        assert_eq!(store.get(budget.id).unwrap().spent, 950.0);
    }
}
