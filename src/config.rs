//! Settings for the budget tracker.

use std::time::Duration;

/// The config for a [crate::BudgetTracker].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// The canonical name of the timezone used for "today", e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// How long a ledger query may run before the tracker falls back to cached
    /// spent amounts.
    pub ledger_timeout: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            local_timezone: "Etc/UTC".to_owned(),
            ledger_timeout: Duration::from_secs(5),
        }
    }
}
