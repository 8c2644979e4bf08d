//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Type, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{Error, category::CategoryId, database_id::TransactionId};

// ============================================================================
// MODELS
// ============================================================================

/// Whether money was earned or spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money coming in. Never counted against budgets.
    Income,
    /// Money going out.
    Expense,
}

impl TransactionType {
    /// The string used to store the type in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            other => Err(Error::InvalidTransactionType(other.to_owned())),
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The amount of money spent or earned, always positive.
    pub amount: f64,
    /// Whether the money was spent or earned.
    pub transaction_type: TransactionType,
    /// The category the transaction belongs to, if any.
    pub category_id: Option<CategoryId>,
    /// When the transaction happened.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
    /// Free-form labels attached to the transaction.
    pub tags: Vec<String>,
    /// When the transaction was recorded.
    pub created_at: OffsetDateTime,
    /// When the transaction was last changed.
    pub updated_at: OffsetDateTime,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        amount: f64,
        transaction_type: TransactionType,
        date: Date,
        description: &str,
    ) -> TransactionBuilder {
        TransactionBuilder {
            amount,
            transaction_type,
            date,
            description: description.to_owned(),
            category_id: None,
            tags: Vec::new(),
        }
    }

    /// Whether this transaction counts towards budgets.
    pub fn is_expense(&self) -> bool {
        self.transaction_type == TransactionType::Expense
    }
}

/// A builder for creating or replacing [Transaction] records.
///
/// # Examples
///
/// ```
/// use time::macros::date;
///
/// use family_budget::{Transaction, TransactionType};
///
/// let builder = Transaction::build(45.99, TransactionType::Expense, date!(2025-01-15), "Groceries")
///     .category_id(Some(2))
///     .tags(vec!["weekly".to_owned()]);
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The monetary amount of the transaction.
    ///
    /// Must be a finite number greater than zero. Whether the money was spent
    /// or earned is given by `transaction_type`, not by the sign.
    pub amount: f64,

    /// Whether the money was spent or earned.
    pub transaction_type: TransactionType,

    /// The date when the transaction occurred.
    pub date: Date,

    /// A human-readable description of the transaction.
    pub description: String,

    /// The category of the transaction, e.g. "Groceries", "Transport", "Rent".
    ///
    /// Expenses without a category only count towards family-wide budgets.
    pub category_id: Option<CategoryId>,

    /// Free-form labels, stored as a JSON array.
    pub tags: Vec<String>,
}

impl TransactionBuilder {
    /// Set the category id for the transaction.
    pub fn category_id(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    /// Set the tags for the transaction.
    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    fn validate(&self) -> Result<(), Error> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(Error::InvalidAmount(self.amount));
        }

        Ok(())
    }

    fn tags_json(&self) -> Result<String, Error> {
        serde_json::to_string(&self.tags)
            .map_err(|error| Error::TagSerializationError(error.to_string()))
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const SELECT_COLUMNS: &str = "id, amount, transaction_type, category_id, date, description, tags, created_at, updated_at";

/// Create a new transaction in the database from a builder.
///
/// This only writes the transaction. Budget bookkeeping for expenses is done
/// by [crate::BudgetTracker::record_transaction].
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if the amount is not a positive, finite number,
/// - or [Error::InvalidCategory] if the category ID does not refer to a real category,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Transaction, Error> {
    builder.validate()?;
    let tags = builder.tags_json()?;

    let transaction = connection
        .prepare(&format!(
            "INSERT INTO \"transaction\"
                (amount, transaction_type, category_id, date, description, tags, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             RETURNING {SELECT_COLUMNS}"
        ))?
        .query_row(
            (
                builder.amount,
                builder.transaction_type,
                builder.category_id,
                builder.date,
                &builder.description,
                tags,
                now,
            ),
            map_transaction_row,
        )
        .map_err(|error| map_foreign_key_error(error, builder.category_id))?;

    Ok(transaction)
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM \"transaction\" WHERE id = :id"
        ))?
        .query_row(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Replace the fields of an existing transaction.
///
/// Budget caches are deliberately left alone: reads reconcile spending from
/// the ledger instead.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if the amount is not a positive, finite number,
/// - [Error::InvalidCategory] if the category ID does not refer to a real category,
/// - [Error::UpdateMissingTransaction] if `id` does not refer to a transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn update_transaction(
    id: TransactionId,
    builder: TransactionBuilder,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Transaction, Error> {
    builder.validate()?;
    let tags = builder.tags_json()?;

    let rows_affected = connection
        .execute(
            "UPDATE \"transaction\"
             SET amount = ?1, transaction_type = ?2, category_id = ?3, date = ?4,
                 description = ?5, tags = ?6, updated_at = ?7
             WHERE id = ?8",
            (
                builder.amount,
                builder.transaction_type,
                builder.category_id,
                builder.date,
                &builder.description,
                tags,
                now,
                id,
            ),
        )
        .map_err(|error| map_foreign_key_error(error, builder.category_id))?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingTransaction);
    }

    get_transaction(id, connection)
}

/// Delete a transaction by ID.
///
/// # Errors
/// Returns [Error::DeleteMissingTransaction] if the transaction doesn't exist.
pub fn delete_transaction(id: TransactionId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM \"transaction\" WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTransaction);
    }

    Ok(())
}

#[cfg(test)]
/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                amount REAL NOT NULL CHECK (amount > 0),
                transaction_type TEXT NOT NULL CHECK (transaction_type IN ('income', 'expense')),
                category_id INTEGER,
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE SET NULL
                )",
        (),
    )?;

    // Covers the ledger sums used to reconcile budgets.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_type_category_date
         ON \"transaction\"(transaction_type, category_id, date);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let amount = row.get(1)?;
    let transaction_type = row.get(2)?;
    let category_id = row.get(3)?;
    let date = row.get(4)?;
    let description = row.get(5)?;
    let raw_tags: String = row.get(6)?;
    let tags = serde_json::from_str(&raw_tags).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(error))
    })?;
    let created_at = row.get(7)?;
    let updated_at = row.get(8)?;

    Ok(Transaction {
        id,
        amount,
        transaction_type,
        category_id,
        date,
        description,
        tags,
        created_at,
        updated_at,
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

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod transaction_type_tests {
    use super::TransactionType;
    use crate::Error;

    #[test]
    fn parses_stored_names() {
        assert_eq!("income".parse(), Ok(TransactionType::Income));
        assert_eq!("expense".parse(), Ok(TransactionType::Expense));
    }

    #[test]
    fn rejects_unknown_names() {
        assert_eq!(
            "refund".parse::<TransactionType>(),
            Err(Error::InvalidTransactionType("refund".to_owned()))
        );
    }
}
