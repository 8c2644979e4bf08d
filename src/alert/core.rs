//! Defines the alert model and the trigger latch.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    database_id::{AlertId, BudgetId},
};

/// The percentage of a budget that must be spent before an alert triggers.
///
/// Always greater than zero and at most 100.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Threshold(f64);

impl Threshold {
    /// Create a threshold.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::InvalidThreshold] if `percentage`
    /// is not in the range (0, 100].
    pub fn new(percentage: f64) -> Result<Self, Error> {
        if percentage > 0.0 && percentage <= 100.0 {
            Ok(Self(percentage))
        } else {
            Err(Error::InvalidThreshold(percentage))
        }
    }

    /// Create a threshold without validation.
    ///
    /// The caller should ensure that the percentage is in the range (0, 100].
    pub fn new_unchecked(percentage: f64) -> Self {
        Self(percentage)
    }

    /// The threshold as a percentage.
    pub fn as_f64(&self) -> f64 {
        self.0
    }
}

impl Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether an alert has fired.
///
/// Once triggered an alert stays triggered, even if spending later drops back
/// below the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AlertState {
    /// The threshold has not been reached yet.
    Untriggered,
    /// The threshold was first reached at `at`.
    Triggered {
        /// When the threshold was first reached.
        at: OffsetDateTime,
    },
}

impl AlertState {
    /// The state after seeing `percentage` of the budget spent at `now`.
    pub fn observe(self, percentage: f64, threshold: Threshold, now: OffsetDateTime) -> Self {
        match self {
            AlertState::Untriggered if percentage >= threshold.as_f64() => {
                AlertState::Triggered { at: now }
            }
            state => state,
        }
    }

    /// Whether the alert has fired.
    pub fn is_triggered(&self) -> bool {
        matches!(self, AlertState::Triggered { .. })
    }

    /// When the alert fired, if it has.
    pub fn triggered_at(&self) -> Option<OffsetDateTime> {
        match self {
            AlertState::Triggered { at } => Some(*at),
            AlertState::Untriggered => None,
        }
    }
}

/// An alert that fires when a budget reaches a percentage of its amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// The ID of the alert.
    pub id: AlertId,
    /// The budget this alert watches.
    pub budget_id: BudgetId,
    /// The percentage of the budget at which the alert fires.
    pub threshold: Threshold,
    /// Whether and when the alert fired.
    pub state: AlertState,
}

impl Alert {
    /// The message shown to the user for this alert.
    pub fn message(&self) -> String {
        alert_message(self.threshold, self.state)
    }
}

/// The message for an alert at `threshold` that is in `state`.
pub fn alert_message(threshold: Threshold, state: AlertState) -> String {
    match state {
        AlertState::Triggered { .. } if threshold.as_f64() >= 100.0 => {
            "Budget exceeded! You've spent more than allocated.".to_owned()
        }
        AlertState::Triggered { .. } => {
            format!("Warning: You've reached {threshold}% of your budget.")
        }
        AlertState::Untriggered => format!("Alert will trigger at {threshold}% of budget."),
    }
}

#[cfg(test)]
mod threshold_tests {
    use crate::Error;

    use super::Threshold;

    #[test]
    fn accepts_values_up_to_one_hundred() {
        assert_eq!(Threshold::new(0.5).map(|t| t.as_f64()), Ok(0.5));
        assert_eq!(Threshold::new(80.0).map(|t| t.as_f64()), Ok(80.0));
        assert_eq!(Threshold::new(100.0).map(|t| t.as_f64()), Ok(100.0));
    }

    #[test]
    fn rejects_values_outside_range() {
        for percentage in [0.0, -5.0, 100.01, f64::NAN] {
            let result = Threshold::new(percentage);

            assert!(
                matches!(result, Err(Error::InvalidThreshold(_))),
                "want InvalidThreshold for {percentage}, got {result:?}"
            );
        }
    }
}

#[cfg(test)]
mod alert_state_tests {
    use time::macros::datetime;

    use super::{AlertState, Threshold};

    #[test]
    fn triggers_when_percentage_reaches_threshold() {
        let now = datetime!(2025-01-20 09:00 UTC);

        let state = AlertState::Untriggered.observe(80.0, Threshold::new_unchecked(80.0), now);

        assert_eq!(state, AlertState::Triggered { at: now });
        assert_eq!(state.triggered_at(), Some(now));
    }

    #[test]
    fn stays_untriggered_below_threshold() {
        let state = AlertState::Untriggered.observe(
            79.99,
            Threshold::new_unchecked(80.0),
            datetime!(2025-01-20 09:00 UTC),
        );

        assert_eq!(state, AlertState::Untriggered);
        assert!(!state.is_triggered());
    }

    #[test]
    fn never_reverts_once_triggered() {
        let first = datetime!(2025-01-20 09:00 UTC);
        let threshold = Threshold::new_unchecked(50.0);

        let state = AlertState::Untriggered
            .observe(60.0, threshold, first)
            .observe(10.0, threshold, datetime!(2025-01-21 09:00 UTC))
            .observe(70.0, threshold, datetime!(2025-01-22 09:00 UTC));

        assert_eq!(state, AlertState::Triggered { at: first });
    }
}
