//! The entry point that ties transactions, budgets and alerts together.

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Instant,
};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    alert::{AlertStore, AlertView, SqliteAlertStore, Threshold, evaluate_alerts},
    budget::{
        AccumulatorOutcome, Budget, BudgetBuilder, BudgetStore, BudgetSummary, SqliteBudgetStore,
        get_budget_summary, list_budget_summaries, on_expense_recorded, resync_budget_spent,
    },
    category::{Category, CategoryName, create_category, get_all_categories},
    config::TrackerConfig,
    database_id::{AlertId, BudgetId, TransactionId},
    db::initialize,
    timezone::now_in_timezone,
    transaction::{
        SqliteLedger, Transaction, TransactionBuilder, create_transaction, delete_transaction,
        get_transaction, update_transaction,
    },
};

/// A budget summary together with the state of its alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetReport {
    /// The budget with its spent amount reconciled from the ledger.
    pub summary: BudgetSummary,
    /// The budget's alerts, lowest threshold first.
    pub alerts: Vec<AlertView>,
}

/// Records transactions and keeps budgets and alerts up to date.
///
/// All stores share one SQLite connection.
#[derive(Debug, Clone)]
pub struct BudgetTracker {
    connection: Arc<Mutex<Connection>>,
    budget_store: SqliteBudgetStore,
    alert_store: SqliteAlertStore,
    config: TrackerConfig,
}

impl BudgetTracker {
    /// Create a tracker over `connection`, creating any missing tables.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(connection: Connection, config: TrackerConfig) -> Result<Self, Error> {
        initialize(&connection)?;

        let connection = Arc::new(Mutex::new(connection));

        Ok(Self {
            budget_store: SqliteBudgetStore::new(connection.clone()),
            alert_store: SqliteAlertStore::new(connection.clone()),
            connection,
            config,
        })
    }

    /// The settings this tracker was created with.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// The current time in the configured local timezone.
    ///
    /// Pass this as `now` so that budget windows start at local midnight.
    ///
    /// # Errors
    /// Returns [Error::InvalidTimezoneError] if the configured timezone is not valid.
    pub fn now(&self) -> Result<OffsetDateTime, Error> {
        now_in_timezone(&self.config.local_timezone)
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })
    }

    fn ledger(&self) -> SqliteLedger {
        SqliteLedger::new(self.connection.clone())
            .with_deadline(Instant::now() + self.config.ledger_timeout)
    }

    /// Create a spending category.
    pub fn create_category(&self, name: CategoryName) -> Result<Category, Error> {
        create_category(name, &*self.connection()?)
    }

    /// Get every category.
    pub fn get_categories(&self) -> Result<Vec<Category>, Error> {
        get_all_categories(&*self.connection()?)
    }

    /// Store a transaction and, if it is an expense, add it to the budget it
    /// counts towards.
    ///
    /// Only storing the transaction can fail. Updating the budget is best
    /// effort and its result is reported in the returned [AccumulatorOutcome].
    ///
    /// # Errors
    /// Returns an error if the transaction is invalid or cannot be stored.
    pub fn record_transaction(
        &self,
        builder: TransactionBuilder,
        now: OffsetDateTime,
    ) -> Result<(Transaction, AccumulatorOutcome), Error> {
        let transaction = create_transaction(builder, now, &*self.connection()?)?;
        let outcome = on_expense_recorded(&transaction, &self.budget_store, now);

        Ok((transaction, outcome))
    }

    /// Retrieve a transaction by its `id`.
    pub fn get_transaction(&self, id: TransactionId) -> Result<Transaction, Error> {
        get_transaction(id, &*self.connection()?)
    }

    /// Replace a transaction.
    ///
    /// Cached budget amounts are not adjusted. Summaries of single budgets are
    /// reconciled from the ledger and so reflect the change straight away;
    /// call [BudgetTracker::resync_budget_spent] to fix the cache.
    pub fn update_transaction(
        &self,
        id: TransactionId,
        builder: TransactionBuilder,
        now: OffsetDateTime,
    ) -> Result<Transaction, Error> {
        update_transaction(id, builder, now, &*self.connection()?)
    }

    /// Delete a transaction. Cached budget amounts are not adjusted.
    pub fn delete_transaction(&self, id: TransactionId) -> Result<(), Error> {
        delete_transaction(id, &*self.connection()?)
    }

    /// Create a budget with nothing spent.
    pub fn create_budget(
        &self,
        builder: BudgetBuilder,
        now: OffsetDateTime,
    ) -> Result<Budget, Error> {
        self.budget_store.create(builder, now)
    }

    /// Retrieve a budget as stored, with its cached spent amount.
    pub fn get_budget(&self, id: BudgetId) -> Result<Budget, Error> {
        self.budget_store.get(id)
    }

    /// Replace the user editable fields of a budget, keeping its cached spent amount.
    pub fn update_budget(
        &self,
        id: BudgetId,
        builder: BudgetBuilder,
        now: OffsetDateTime,
    ) -> Result<Budget, Error> {
        self.budget_store.update(id, builder, now)
    }

    /// Stop a budget from accumulating new expenses.
    pub fn deactivate_budget(&self, id: BudgetId, now: OffsetDateTime) -> Result<(), Error> {
        self.budget_store.set_active(id, false, now)
    }

    /// Delete a budget together with its alerts.
    pub fn delete_budget(&self, id: BudgetId) -> Result<(), Error> {
        self.budget_store.delete(id)
    }

    /// Summarize a budget with its spent amount reconciled from the ledger.
    ///
    /// If the ledger query fails or takes longer than
    /// [TrackerConfig::ledger_timeout] the cached amount is used instead.
    pub fn get_budget_summary(
        &self,
        id: BudgetId,
        now: OffsetDateTime,
    ) -> Result<BudgetSummary, Error> {
        get_budget_summary(id, &self.budget_store, &self.ledger(), now)
    }

    /// Summarize every budget using cached spent amounts.
    pub fn list_budget_summaries(&self, now: OffsetDateTime) -> Result<Vec<BudgetSummary>, Error> {
        list_budget_summaries(&self.budget_store, now)
    }

    /// Overwrite a budget's cached spent amount with the ledger sum.
    pub fn resync_budget_spent(&self, id: BudgetId, now: OffsetDateTime) -> Result<f64, Error> {
        resync_budget_spent(id, &self.budget_store, &self.ledger(), now)
    }

    /// Add an alert to a budget.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::InvalidThreshold] if `threshold` is not in (0, 100],
    /// - [Error::NotFound] if the budget does not exist,
    /// - or [Error::DuplicateAlertThreshold] if the budget already has an alert at `threshold`.
    pub fn create_alert(&self, budget_id: BudgetId, threshold: f64) -> Result<AlertView, Error> {
        let threshold = Threshold::new(threshold)?;
        let alert = self.alert_store.create(budget_id, threshold)?;

        Ok(AlertView::from(&alert))
    }

    /// Get the alerts of a budget as last evaluated, without evaluating them.
    pub fn get_alerts_for_budget(&self, budget_id: BudgetId) -> Result<Vec<AlertView>, Error> {
        Ok(self
            .alert_store
            .get_by_budget(budget_id)?
            .iter()
            .map(AlertView::from)
            .collect())
    }

    /// Delete an alert.
    pub fn delete_alert(&self, id: AlertId) -> Result<(), Error> {
        self.alert_store.delete(id)
    }

    /// Check a budget's alerts against its reconciled spending, latching any
    /// that have been reached.
    pub fn evaluate_alerts(
        &self,
        budget_id: BudgetId,
        now: OffsetDateTime,
    ) -> Result<Vec<AlertView>, Error> {
        Ok(self.get_budget_report(budget_id, now)?.alerts)
    }

    /// Summarize a budget and evaluate its alerts against the same spent amount.
    pub fn get_budget_report(
        &self,
        budget_id: BudgetId,
        now: OffsetDateTime,
    ) -> Result<BudgetReport, Error> {
        let summary = self.get_budget_summary(budget_id, now)?;
        let alerts = evaluate_alerts(
            budget_id,
            summary.progress.percentage,
            &self.alert_store,
            now,
        )?;

        Ok(BudgetReport { summary, alerts })
    }
}
