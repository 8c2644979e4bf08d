//! Derives progress and pace figures for a budget.
//!
//! Everything here is a pure function of the budget amount, the amount spent,
//! the budget window and the current time.

use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime};

use crate::budget::Budget;

/// Budgets at or above this percentage spent are close to their limit.
pub const NEAR_LIMIT_PERCENTAGE: f64 = 80.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// How close a budget is to its limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    /// Less than [NEAR_LIMIT_PERCENTAGE] of the budget has been spent.
    Normal,
    /// At least [NEAR_LIMIT_PERCENTAGE] has been spent, but no more than the amount.
    NearLimit,
    /// More than the budget amount has been spent.
    OverBudget,
}

/// Progress of spending through a budget and of time through its window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetProgress {
    /// The budget cap.
    pub amount: f64,
    /// The amount spent that the figures below were derived from.
    pub spent: f64,
    /// `amount - spent`, negative once the budget is exceeded.
    pub remaining: f64,
    /// Percentage of the amount that has been spent, may exceed 100.
    pub percentage: f64,
    /// Whether strictly more than the amount has been spent.
    pub is_over_budget: bool,
    /// Whether the spent percentage has reached [NEAR_LIMIT_PERCENTAGE]
    /// without going over budget.
    pub is_near_limit: bool,
    /// `is_over_budget` and `is_near_limit` as one value.
    pub status: BudgetStatus,
    /// Length of the window in days.
    pub days_total: i64,
    /// Days since the window started, counting a started day as a whole day.
    pub days_elapsed: i64,
    /// Days until the window ends.
    pub days_left: i64,
    /// Percentage of the window that has passed, capped at 100.
    pub time_percentage: f64,
    /// The amount that may be spent per day to finish exactly on budget.
    pub daily_budget_pace: f64,
    /// The amount actually spent per elapsed day.
    pub daily_spending_pace: f64,
    /// The total spend at the end of the window if the current pace holds.
    pub projected_spend: f64,
    /// Whether the current pace would exceed the budget by the end of the window.
    pub is_projected_to_exceed: bool,
}

impl BudgetProgress {
    /// Calculate progress for an amount spent out of `amount` over the window
    /// from `start_date` to `end_date`, as seen at `now`.
    ///
    /// Dates are taken to start at midnight in the UTC offset of `now`, so
    /// pass `now` in the user's local time.
    pub fn calculate(
        amount: f64,
        spent: f64,
        start_date: Date,
        end_date: Date,
        now: OffsetDateTime,
    ) -> Self {
        let start = start_date.midnight().assume_offset(now.offset());
        let end = end_date.midnight().assume_offset(now.offset());

        let percentage = if amount > 0.0 {
            spent * 100.0 / amount
        } else {
            0.0
        };
        let is_over_budget = spent > amount;
        let is_near_limit = percentage >= NEAR_LIMIT_PERCENTAGE && !is_over_budget;
        let status = if is_over_budget {
            BudgetStatus::OverBudget
        } else if is_near_limit {
            BudgetStatus::NearLimit
        } else {
            BudgetStatus::Normal
        };

        let days_total = ceil_days(end - start);
        let days_elapsed = if now < start {
            0
        } else {
            ceil_days(now - start).max(1)
        };
        let days_left = ceil_days(end - now).max(0);

        let time_percentage = if days_total > 0 {
            (days_elapsed as f64 / days_total as f64 * 100.0).min(100.0)
        } else {
            0.0
        };
        let daily_budget_pace = if days_total > 0 {
            amount / days_total as f64
        } else {
            0.0
        };
        let daily_spending_pace = if days_elapsed > 0 {
            spent / days_elapsed as f64
        } else {
            0.0
        };
        let projected_spend = daily_spending_pace * days_total as f64;

        Self {
            amount,
            spent,
            remaining: amount - spent,
            percentage,
            is_over_budget,
            is_near_limit,
            status,
            days_total,
            days_elapsed,
            days_left,
            time_percentage,
            daily_budget_pace,
            daily_spending_pace,
            projected_spend,
            is_projected_to_exceed: projected_spend > amount,
        }
    }

    /// Calculate progress for `budget` given the amount `spent` against it.
    pub fn for_budget(budget: &Budget, spent: f64, now: OffsetDateTime) -> Self {
        Self::calculate(
            budget.amount,
            spent,
            budget.start_date,
            budget.end_date,
            now,
        )
    }
}

fn ceil_days(duration: Duration) -> i64 {
    (duration.as_seconds_f64() / SECONDS_PER_DAY).ceil() as i64
}
