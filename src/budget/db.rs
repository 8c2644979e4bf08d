//! Implements a SQLite backed budget store.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, Row};
use time::OffsetDateTime;

use crate::{
    Error,
    budget::{Budget, BudgetBuilder, BudgetStore},
    category::CategoryId,
    database_id::BudgetId,
};

const SELECT_COLUMNS: &str = "id, name, amount, spent, period, category_id, start_date, end_date, is_active, created_at, updated_at";

/// Stores budgets in a SQLite database.
///
/// The category and alert tables must also exist, see [crate::initialize_db].
#[derive(Debug, Clone)]
pub struct SqliteBudgetStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteBudgetStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })
    }

    fn select(&self, where_clause: &str) -> Result<Vec<Budget>, Error> {
        self.connection()?
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM budget {where_clause} ORDER BY id ASC"
            ))?
            .query_map([], map_budget_row)?
            .map(|maybe_budget| maybe_budget.map_err(|error| error.into()))
            .collect()
    }
}

impl BudgetStore for SqliteBudgetStore {
    /// Create a new budget in the database.
    ///
    /// # Errors
    /// This function will return a:
    /// - validation error if `builder` breaks a budget invariant, see [BudgetBuilder::validate],
    /// - [Error::InvalidCategory] if the category ID does not refer to a real category,
    /// - or [Error::SqlError] if there is some other SQL error.
    fn create(&self, builder: BudgetBuilder, now: OffsetDateTime) -> Result<Budget, Error> {
        builder.validate()?;

        let budget = self
            .connection()?
            .prepare(&format!(
                "INSERT INTO budget
                    (name, amount, spent, period, category_id, start_date, end_date, is_active, created_at, updated_at)
                 VALUES (?1, ?2, 0.0, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
                 RETURNING {SELECT_COLUMNS}"
            ))?
            .query_row(
                (
                    builder.name.trim(),
                    builder.amount,
                    builder.period,
                    builder.category_id,
                    builder.start_date,
                    builder.end_date,
                    builder.is_active,
                    now,
                ),
                map_budget_row,
            )
            .map_err(|error| map_foreign_key_error(error, builder.category_id))?;

        Ok(budget)
    }

    /// Retrieve a budget by its `id`.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NotFound] if `id` does not refer to a valid budget,
    /// - or [Error::SqlError] there is some other SQL error.
    fn get(&self, id: BudgetId) -> Result<Budget, Error> {
        let budget = self
            .connection()?
            .prepare(&format!("SELECT {SELECT_COLUMNS} FROM budget WHERE id = :id"))?
            .query_row(&[(":id", &id)], map_budget_row)?;

        Ok(budget)
    }

    fn get_all(&self) -> Result<Vec<Budget>, Error> {
        self.select("")
    }

    fn get_active(&self) -> Result<Vec<Budget>, Error> {
        self.select("WHERE is_active = 1")
    }

    /// Replace the user editable fields of a budget.
    ///
    /// # Errors
    /// This function will return a:
    /// - validation error if `builder` breaks a budget invariant,
    /// - [Error::InvalidCategory] if the category ID does not refer to a real category,
    /// - [Error::UpdateMissingBudget] if `id` does not refer to a budget,
    /// - or [Error::SqlError] there is some other SQL error.
    fn update(
        &self,
        id: BudgetId,
        builder: BudgetBuilder,
        now: OffsetDateTime,
    ) -> Result<Budget, Error> {
        builder.validate()?;

        let rows_affected = self
            .connection()?
            .execute(
                "UPDATE budget
                 SET name = ?1, amount = ?2, period = ?3, category_id = ?4,
                     start_date = ?5, end_date = ?6, is_active = ?7, updated_at = ?8
                 WHERE id = ?9",
                (
                    builder.name.trim(),
                    builder.amount,
                    builder.period,
                    builder.category_id,
                    builder.start_date,
                    builder.end_date,
                    builder.is_active,
                    now,
                    id,
                ),
            )
            .map_err(|error| map_foreign_key_error(error, builder.category_id))?;

        if rows_affected == 0 {
            return Err(Error::UpdateMissingBudget);
        }

        self.get(id)
    }

    fn set_active(&self, id: BudgetId, is_active: bool, now: OffsetDateTime) -> Result<(), Error> {
        let rows_affected = self.connection()?.execute(
            "UPDATE budget SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
            (is_active, now, id),
        )?;

        if rows_affected == 0 {
            return Err(Error::UpdateMissingBudget);
        }

        Ok(())
    }

    fn delete(&self, id: BudgetId) -> Result<(), Error> {
        let rows_affected = self
            .connection()?
            .execute("DELETE FROM budget WHERE id = ?1", [id])?;

        if rows_affected == 0 {
            return Err(Error::DeleteMissingBudget);
        }

        Ok(())
    }

    /// Add `amount` to the cached spent amount.
    ///
    /// The addition happens inside SQLite in a single statement, so concurrent
    /// increments cannot overwrite each other.
    fn increment_spent(
        &self,
        id: BudgetId,
        amount: f64,
        now: OffsetDateTime,
    ) -> Result<(), Error> {
        let rows_affected = self.connection()?.execute(
            "UPDATE budget SET spent = spent + ?1, updated_at = ?2 WHERE id = ?3",
            (amount, now, id),
        )?;

        if rows_affected == 0 {
            return Err(Error::UpdateMissingBudget);
        }

        Ok(())
    }

    fn set_spent(&self, id: BudgetId, spent: f64, now: OffsetDateTime) -> Result<(), Error> {
        let rows_affected = self.connection()?.execute(
            "UPDATE budget SET spent = ?1, updated_at = ?2 WHERE id = ?3",
            (spent, now, id),
        )?;

        if rows_affected == 0 {
            return Err(Error::UpdateMissingBudget);
        }

        Ok(())
    }
}

/// Create the budget table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS budget (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            amount REAL NOT NULL CHECK (amount > 0),
            spent REAL NOT NULL DEFAULT 0,
            period TEXT NOT NULL,
            category_id INTEGER,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL CHECK (end_date >= start_date),
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_budget_active_category ON budget(is_active, category_id);",
    )?;

    Ok(())
}

/// Map a database row to a Budget.
pub fn map_budget_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    Ok(Budget {
        id: row.get(0)?,
        name: row.get(1)?,
        amount: row.get(2)?,
        spent: row.get(3)?,
        period: row.get(4)?,
        category_id: row.get(5)?,
        start_date: row.get(6)?,
        end_date: row.get(7)?,
        is_active: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn map_foreign_key_error(error: rusqlite::Error, category_id: Option<CategoryId>) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
            },
            _,
        ) => Error::InvalidCategory(category_id),
        error => error.into(),
    }
}
