//! Evaluates a budget's alerts against how much of the budget has been spent.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    alert::{Alert, AlertStore, Threshold},
    database_id::{AlertId, BudgetId},
};

/// An alert as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertView {
    /// The ID of the alert.
    pub id: AlertId,
    /// The percentage at which the alert fires.
    pub threshold: Threshold,
    /// Whether the alert has fired.
    pub is_triggered: bool,
    /// When the alert first fired, if it has.
    pub triggered_at: Option<OffsetDateTime>,
    /// A message describing the alert for the user.
    pub message: String,
}

impl From<&Alert> for AlertView {
    fn from(alert: &Alert) -> Self {
        Self {
            id: alert.id,
            threshold: alert.threshold,
            is_triggered: alert.state.is_triggered(),
            triggered_at: alert.state.triggered_at(),
            message: alert.message(),
        }
    }
}

/// Check every alert of a budget against `percentage` spent and latch the ones
/// that have been reached.
///
/// Newly triggered alerts are persisted with `now` as their trigger time. If
/// persisting fails the alert is still reported as triggered for this call and
/// will be latched again on the next evaluation.
///
/// # Errors
/// Returns the store's error if the alerts cannot be read.
pub fn evaluate_alerts(
    budget_id: BudgetId,
    percentage: f64,
    alert_store: &impl AlertStore,
    now: OffsetDateTime,
) -> Result<Vec<AlertView>, Error> {
    let alerts = alert_store.get_by_budget(budget_id)?;
    let mut views = Vec::with_capacity(alerts.len());

    for mut alert in alerts {
        let state = alert.state.observe(percentage, alert.threshold, now);

        if state != alert.state {
            tracing::info!(
                "budget {budget_id} reached {percentage:.2}%, triggering alert {} at {}%",
                alert.id,
                alert.threshold
            );

            alert = match alert_store.mark_triggered(alert.id, now) {
                Ok(stored) => stored,
                Err(error) => {
                    tracing::error!("could not save triggered alert {}: {error}", alert.id);
                    Alert { state, ..alert }
                }
            };
        }

        views.push(AlertView::from(&alert));
    }

    Ok(views)
}
