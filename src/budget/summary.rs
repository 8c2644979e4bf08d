//! Builds the read views of budgets.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    budget::{
        Budget, BudgetProgress, BudgetStore,
        reconcile::{Spent, SpentSource, cached_spent, reconciled_spent},
    },
    database_id::BudgetId,
    transaction::Ledger,
};

/// A budget together with how much has been spent against it.
///
/// `progress.spent` is the figure to show; `budget.spent` is always the
/// cached running total as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSummary {
    /// The budget as stored.
    pub budget: Budget,
    /// Where `progress.spent` came from.
    pub spent_source: SpentSource,
    /// Spending and time progress through the window.
    pub progress: BudgetProgress,
}

impl BudgetSummary {
    fn new(budget: Budget, spent: Spent, now: OffsetDateTime) -> Self {
        let progress = BudgetProgress::for_budget(&budget, spent.amount, now);

        Self {
            budget,
            spent_source: spent.source,
            progress,
        }
    }
}

/// Get the summary of a single budget with its spent amount reconciled from
/// the ledger.
///
/// Falls back to the cached spent amount if the ledger cannot be queried.
///
/// # Errors
/// Returns [Error::NotFound] if the budget does not exist, or the store's error
/// if the budget cannot be read.
pub fn get_budget_summary(
    id: BudgetId,
    budget_store: &impl BudgetStore,
    ledger: &impl Ledger,
    now: OffsetDateTime,
) -> Result<BudgetSummary, Error> {
    let budget = budget_store.get(id)?;
    let spent = reconciled_spent(&budget, ledger);

    Ok(BudgetSummary::new(budget, spent, now))
}

/// Get the summaries of every budget using their cached spent amounts.
///
/// # Errors
/// Returns the store's error if the budgets cannot be read.
pub fn list_budget_summaries(
    budget_store: &impl BudgetStore,
    now: OffsetDateTime,
) -> Result<Vec<BudgetSummary>, Error> {
    Ok(budget_store
        .get_all()?
        .into_iter()
        .map(|budget| {
            let spent = cached_spent(&budget);
            BudgetSummary::new(budget, spent, now)
        })
        .collect())
}

#[cfg(test)]
mod summary_tests {
    use std::{
        ops::RangeInclusive,
        sync::{Arc, Mutex},
    };

    use time::{
        Date,
        macros::{date, datetime},
    };

    use crate::{
        Error,
        budget::{Budget, BudgetStore, SpentSource, SqliteBudgetStore},
        category::CategoryId,
        test_utils::get_test_connection,
        transaction::{Ledger, TransactionType},
    };

    use super::{get_budget_summary, list_budget_summaries};

    struct FixedLedger(Option<f64>);

    impl Ledger for FixedLedger {
        fn sum_by_category_and_date_range(
            &self,
            _category_id: CategoryId,
            _date_range: RangeInclusive<Date>,
            _transaction_type: TransactionType,
        ) -> Result<f64, Error> {
            self.0.ok_or(Error::Cancelled)
        }

        fn sum_by_date_range(
            &self,
            _date_range: RangeInclusive<Date>,
            _transaction_type: TransactionType,
        ) -> Result<f64, Error> {
            self.0.ok_or(Error::Cancelled)
        }
    }

    fn store_with_budget(amount: f64) -> (SqliteBudgetStore, Budget) {
        let store = SqliteBudgetStore::new(Arc::new(Mutex::new(get_test_connection())));
        let budget = store
            .create(
                Budget::build("Family", amount, date!(2025 - 02 - 01), date!(2025 - 02 - 28)),
                datetime!(2025-02-01 00:00 UTC),
            )
            .unwrap();

        (store, budget)
    }

    #[test]
    fn summary_uses_ledger_sum() {
        let (store, budget) = store_with_budget(2000.0);

        let summary = get_budget_summary(
            budget.id,
            &store,
            &FixedLedger(Some(800.0)),
            datetime!(2025-02-10 00:00 UTC),
        )
        .unwrap();

        assert_eq!(summary.spent_source, SpentSource::Reconciled);
        assert_eq!(summary.progress.spent, 800.0);
        assert_eq!(summary.progress.remaining, 1200.0);
        assert_eq!(summary.progress.percentage, 40.0);
        assert_eq!(summary.budget.spent, 0.0, "the cache should be untouched");
    }

    #[test]
    fn summary_falls_back_to_cache() {
        let (store, budget) = store_with_budget(1000.0);
        store
            .increment_spent(budget.id, 275.25, datetime!(2025-02-02 00:00 UTC))
            .unwrap();

        let summary = get_budget_summary(
            budget.id,
            &store,
            &FixedLedger(None),
            datetime!(2025-02-10 00:00 UTC),
        )
        .unwrap();

        assert_eq!(summary.spent_source, SpentSource::Cached);
        assert_eq!(summary.progress.spent, 275.25);
        assert_eq!(summary.progress.remaining, 724.75);
    }

    #[test]
    fn over_budget_summary_has_negative_remaining() {
        let (store, budget) = store_with_budget(500.0);

        let summary = get_budget_summary(
            budget.id,
            &store,
            &FixedLedger(Some(650.0)),
            datetime!(2025-02-10 00:00 UTC),
        )
        .unwrap();

        assert_eq!(summary.progress.remaining, -150.0);
        assert!(summary.progress.is_over_budget);
    }

    #[test]
    fn missing_budget_is_not_found() {
        let (store, _) = store_with_budget(500.0);

        let result = get_budget_summary(
            42,
            &store,
            &FixedLedger(Some(0.0)),
            datetime!(2025-02-10 00:00 UTC),
        );

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn list_uses_cached_amounts() {
        let (store, budget) = store_with_budget(1000.0);
        store
            .increment_spent(budget.id, 120.0, datetime!(2025-02-02 00:00 UTC))
            .unwrap();
        store
            .create(
                Budget::build("Holiday", 300.0, date!(2025 - 03 - 01), date!(2025 - 03 - 31)),
                datetime!(2025-02-01 00:00 UTC),
            )
            .unwrap();

        let summaries = list_budget_summaries(&store, datetime!(2025-02-10 00:00 UTC)).unwrap();

        assert_eq!(summaries.len(), 2);
        assert!(
            summaries
                .iter()
                .all(|summary| summary.spent_source == SpentSource::Cached)
        );
        assert_eq!(summaries[0].progress.spent, 120.0);
        assert_eq!(summaries[0].progress.remaining, 880.0);
        assert_eq!(summaries[1].progress.spent, 0.0);
    }
}
