//! Aggregate queries over the transaction ledger.
//!
//! The ledger is the source of truth for how much has been spent. Budgets keep
//! a cached copy of these sums which is reconciled against the ledger on read.

use std::{
    ops::RangeInclusive,
    sync::{Arc, Mutex},
    time::Instant,
};

use rusqlite::{Connection, Params};
use time::Date;

use crate::{Error, category::CategoryId, transaction::TransactionType};

/// How many SQLite virtual machine instructions run between deadline checks.
const PROGRESS_HANDLER_PERIOD: i32 = 1_000;

/// Sums transaction amounts.
pub trait Ledger {
    /// The total of `transaction_type` transactions in `category_id` with a
    /// date inside `date_range` (inclusive).
    fn sum_by_category_and_date_range(
        &self,
        category_id: CategoryId,
        date_range: RangeInclusive<Date>,
        transaction_type: TransactionType,
    ) -> Result<f64, Error>;

    /// The total of `transaction_type` transactions in any category with a
    /// date inside `date_range` (inclusive).
    fn sum_by_date_range(
        &self,
        date_range: RangeInclusive<Date>,
        transaction_type: TransactionType,
    ) -> Result<f64, Error>;
}

/// A [Ledger] that sums the transaction table of a SQLite database.
///
/// An optional deadline bounds how long a query may run. Queries that are
/// still running when the deadline passes are interrupted and return
/// [Error::Cancelled].
#[derive(Debug, Clone)]
pub struct SqliteLedger {
    connection: Arc<Mutex<Connection>>,
    deadline: Option<Instant>,
}

impl SqliteLedger {
    /// Create a ledger over the SQLite `connection` with no deadline.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self {
            connection,
            deadline: None,
        }
    }

    /// Abort queries that are still running at `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    fn sum<P: Params>(&self, sql: &str, params: P) -> Result<f64, Error> {
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(Error::Cancelled);
        }

        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        let Some(deadline) = self.deadline else {
            return query_sum(&connection, sql, params);
        };

        connection.progress_handler(
            PROGRESS_HANDLER_PERIOD,
            Some(move || Instant::now() >= deadline),
        )?;

        let result = query_sum(&connection, sql, params);

        // The connection is shared, so a handler left behind would interrupt
        // every later statement once the deadline has passed.
        if let Err(error) = connection.progress_handler(0, None::<fn() -> bool>) {
            tracing::error!("could not remove the ledger deadline handler: {error}");
            return Err(Error::SqlError(error));
        }

        result
    }
}

fn query_sum<P: Params>(connection: &Connection, sql: &str, params: P) -> Result<f64, Error> {
    connection
        .prepare(sql)?
        .query_row(params, |row| row.get(0))
        .map_err(|error| error.into())
}

impl Ledger for SqliteLedger {
    fn sum_by_category_and_date_range(
        &self,
        category_id: CategoryId,
        date_range: RangeInclusive<Date>,
        transaction_type: TransactionType,
    ) -> Result<f64, Error> {
        self.sum(
            "SELECT COALESCE(SUM(amount), 0.0) FROM \"transaction\"
             WHERE transaction_type = ?1 AND category_id = ?2 AND date BETWEEN ?3 AND ?4",
            (
                transaction_type,
                category_id,
                date_range.start(),
                date_range.end(),
            ),
        )
    }

    fn sum_by_date_range(
        &self,
        date_range: RangeInclusive<Date>,
        transaction_type: TransactionType,
    ) -> Result<f64, Error> {
        self.sum(
            "SELECT COALESCE(SUM(amount), 0.0) FROM \"transaction\"
             WHERE transaction_type = ?1 AND date BETWEEN ?2 AND ?3",
            (transaction_type, date_range.start(), date_range.end()),
        )
    }
}

#[cfg(test)]
mod sqlite_ledger_tests {
    use std::{
        sync::{Arc, Mutex},
        time::{Duration, Instant},
    };

    use rusqlite::Connection;
    use time::{
        Date,
        macros::{date, datetime},
    };

    use crate::{
        Error,
        category::{CategoryId, CategoryName, create_category},
        test_utils::get_test_connection,
        transaction::{Transaction, TransactionType, create_transaction},
    };

    use super::{Ledger, SqliteLedger};

    fn insert(
        amount: f64,
        transaction_type: TransactionType,
        date: Date,
        category_id: Option<CategoryId>,
        connection: &Connection,
    ) {
        create_transaction(
            Transaction::build(amount, transaction_type, date, "").category_id(category_id),
            datetime!(2025-01-01 00:00 UTC),
            connection,
        )
        .expect("Could not create transaction");
    }

    fn get_test_ledger() -> (SqliteLedger, CategoryId, CategoryId) {
        let connection = get_test_connection();
        let food = create_category(CategoryName::new_unchecked("Food"), &connection)
            .unwrap()
            .id;
        let rent = create_category(CategoryName::new_unchecked("Rent"), &connection)
            .unwrap()
            .id;

        insert(100.25, TransactionType::Expense, date!(2025 - 01 - 01), Some(food), &connection);
        insert(175.0, TransactionType::Expense, date!(2025 - 01 - 31), Some(food), &connection);
        // Outside the January window.
        insert(50.0, TransactionType::Expense, date!(2025 - 02 - 01), Some(food), &connection);
        insert(900.0, TransactionType::Expense, date!(2025 - 01 - 15), Some(rent), &connection);
        insert(10.0, TransactionType::Expense, date!(2025 - 01 - 20), None, &connection);
        insert(3000.0, TransactionType::Income, date!(2025 - 01 - 15), Some(food), &connection);

        (
            SqliteLedger::new(Arc::new(Mutex::new(connection))),
            food,
            rent,
        )
    }

    #[test]
    fn sums_category_within_inclusive_range() {
        let (ledger, food, _) = get_test_ledger();

        let total = ledger.sum_by_category_and_date_range(
            food,
            date!(2025 - 01 - 01)..=date!(2025 - 01 - 31),
            TransactionType::Expense,
        );

        assert_eq!(total, Ok(275.25));
    }

    #[test]
    fn sums_all_categories_within_range() {
        let (ledger, _, _) = get_test_ledger();

        let total = ledger.sum_by_date_range(
            date!(2025 - 01 - 01)..=date!(2025 - 01 - 31),
            TransactionType::Expense,
        );

        assert_eq!(total, Ok(1185.25));
    }

    #[test]
    fn sums_income_separately() {
        let (ledger, food, _) = get_test_ledger();

        let total = ledger.sum_by_category_and_date_range(
            food,
            date!(2025 - 01 - 01)..=date!(2025 - 12 - 31),
            TransactionType::Income,
        );

        assert_eq!(total, Ok(3000.0));
    }

    #[test]
    fn empty_range_sums_to_zero() {
        let (ledger, _, _) = get_test_ledger();

        let total = ledger.sum_by_date_range(
            date!(2024 - 01 - 01)..=date!(2024 - 12 - 31),
            TransactionType::Expense,
        );

        assert_eq!(total, Ok(0.0));
    }

    #[test]
    fn expired_deadline_cancels_query() {
        let (ledger, _, _) = get_test_ledger();
        let ledger = ledger.with_deadline(Instant::now() - Duration::from_secs(1));

        let total = ledger.sum_by_date_range(
            date!(2025 - 01 - 01)..=date!(2025 - 01 - 31),
            TransactionType::Expense,
        );

        assert_eq!(total, Err(Error::Cancelled));
    }

    #[test]
    fn deadline_interrupts_running_query() {
        let connection = get_test_connection();
        connection
            .execute_batch(
                "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < 1000000)
                 INSERT INTO \"transaction\"
                    (amount, transaction_type, date, description, created_at, updated_at)
                 SELECT 1.0, 'expense', '2025-01-10', '', '2025-01-01', '2025-01-01' FROM n;",
            )
            .unwrap();
        let connection = Arc::new(Mutex::new(connection));
        let january = date!(2025 - 01 - 01)..=date!(2025 - 01 - 31);

        let total = SqliteLedger::new(connection.clone())
            .with_deadline(Instant::now() + Duration::from_millis(5))
            .sum_by_date_range(january.clone(), TransactionType::Expense);

        assert_eq!(total, Err(Error::Cancelled));
        assert_eq!(
            SqliteLedger::new(connection).sum_by_date_range(january, TransactionType::Expense),
            Ok(1_000_000.0),
            "the deadline should not outlive the query"
        );
    }

    #[test]
    fn future_deadline_allows_query() {
        let (ledger, _, rent) = get_test_ledger();
        let ledger = ledger.with_deadline(Instant::now() + Duration::from_secs(60));

        let total = ledger.sum_by_category_and_date_range(
            rent,
            date!(2025 - 01 - 01)..=date!(2025 - 01 - 31),
            TransactionType::Expense,
        );

        assert_eq!(total, Ok(900.0));
    }
}
