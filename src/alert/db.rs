//! Implements a SQLite backed alert store.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, Row, types::Type};
use time::OffsetDateTime;

use crate::{
    Error,
    alert::{Alert, AlertState, AlertStore, Threshold},
    database_id::{AlertId, BudgetId},
};

const SELECT_COLUMNS: &str = "id, budget_id, threshold, is_triggered, triggered_at";

/// Stores budget alerts in a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteAlertStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteAlertStore {
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
}

impl AlertStore for SqliteAlertStore {
    /// Create an untriggered alert.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NotFound] if `budget_id` does not refer to a budget,
    /// - [Error::DuplicateAlertThreshold] if the budget already has an alert at `threshold`,
    /// - or [Error::SqlError] if there is some other SQL error.
    fn create(&self, budget_id: BudgetId, threshold: Threshold) -> Result<Alert, Error> {
        let alert = self
            .connection()?
            .prepare(&format!(
                "INSERT INTO alert (budget_id, threshold, is_triggered, triggered_at)
                 VALUES (?1, ?2, 0, NULL)
                 RETURNING {SELECT_COLUMNS}"
            ))?
            .query_row((budget_id, threshold.as_f64()), map_alert_row)
            .map_err(|error| match error {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error {
                        code: _,
                        extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                    },
                    _,
                ) => Error::NotFound,
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error {
                        code: _,
                        extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                    },
                    _,
                ) => Error::DuplicateAlertThreshold(threshold.as_f64()),
                error => error.into(),
            })?;

        Ok(alert)
    }

    fn get(&self, id: AlertId) -> Result<Alert, Error> {
        let alert = self
            .connection()?
            .prepare(&format!("SELECT {SELECT_COLUMNS} FROM alert WHERE id = :id"))?
            .query_row(&[(":id", &id)], map_alert_row)?;

        Ok(alert)
    }

    fn get_by_budget(&self, budget_id: BudgetId) -> Result<Vec<Alert>, Error> {
        self.connection()?
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM alert WHERE budget_id = :budget_id ORDER BY threshold ASC"
            ))?
            .query_map(&[(":budget_id", &budget_id)], map_alert_row)?
            .map(|maybe_alert| maybe_alert.map_err(|error| error.into()))
            .collect()
    }

    /// Latch an alert as triggered.
    ///
    /// The update only applies to untriggered alerts, so when two readers race
    /// to trigger the same alert the first trigger time is kept.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if `id` does not refer to an alert.
    fn mark_triggered(&self, id: AlertId, at: OffsetDateTime) -> Result<Alert, Error> {
        let rows_affected = self.connection()?.execute(
            "UPDATE alert SET is_triggered = 1, triggered_at = ?1 WHERE id = ?2 AND is_triggered = 0",
            (at, id),
        )?;

        if rows_affected == 0 {
            tracing::debug!("alert {id} was not latched, it is missing or already triggered");
        }

        self.get(id)
    }

    fn delete(&self, id: AlertId) -> Result<(), Error> {
        let rows_affected = self
            .connection()?
            .execute("DELETE FROM alert WHERE id = ?1", [id])?;

        if rows_affected == 0 {
            return Err(Error::DeleteMissingAlert);
        }

        Ok(())
    }
}

/// Create the alert table in the database.
///
/// Alerts are deleted along with their budget.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_alert_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS alert (
            id INTEGER PRIMARY KEY,
            budget_id INTEGER NOT NULL,
            threshold REAL NOT NULL CHECK (threshold > 0 AND threshold <= 100),
            is_triggered INTEGER NOT NULL DEFAULT 0,
            triggered_at TEXT,
            UNIQUE(budget_id, threshold),
            CHECK ((is_triggered = 0 AND triggered_at IS NULL) OR (is_triggered = 1 AND triggered_at IS NOT NULL)),
            FOREIGN KEY(budget_id) REFERENCES budget(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

/// Map a database row to an Alert.
pub fn map_alert_row(row: &Row) -> Result<Alert, rusqlite::Error> {
    let is_triggered: bool = row.get(3)?;
    let triggered_at: Option<OffsetDateTime> = row.get(4)?;

    let state = match (is_triggered, triggered_at) {
        (false, _) => AlertState::Untriggered,
        (true, Some(at)) => AlertState::Triggered { at },
        (true, None) => {
            return Err(rusqlite::Error::InvalidColumnType(
                4,
                "triggered_at".to_owned(),
                Type::Null,
            ));
        }
    };

    Ok(Alert {
        id: row.get(0)?,
        budget_id: row.get(1)?,
        threshold: Threshold::new_unchecked(row.get(2)?),
        state,
    })
}
