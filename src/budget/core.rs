//! Defines the budget model and its validation rules.

use std::{fmt::Display, ops::RangeInclusive, str::FromStr};

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{Date, Duration, Month, OffsetDateTime};

use crate::{Error, category::CategoryId, database_id::BudgetId};

/// How often a budget is meant to repeat.
///
/// This is descriptive only: the window a budget applies to is always given by
/// its start and end dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    /// Monday to Sunday.
    Weekly,
    /// A calendar month.
    #[default]
    Monthly,
    /// A calendar year.
    Yearly,
    /// Any other window.
    Custom,
}

impl BudgetPeriod {
    /// The string used to store the period in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetPeriod::Weekly => "weekly",
            BudgetPeriod::Monthly => "monthly",
            BudgetPeriod::Yearly => "yearly",
            BudgetPeriod::Custom => "custom",
        }
    }

    /// The window of this period that contains `date`, e.g. the calendar
    /// month for [BudgetPeriod::Monthly].
    ///
    /// Returns `None` for [BudgetPeriod::Custom], which has no fixed window.
    pub fn window_containing(&self, date: Date) -> Option<RangeInclusive<Date>> {
        match self {
            BudgetPeriod::Weekly => {
                let start =
                    date - Duration::days(date.weekday().number_days_from_monday() as i64);
                Some(start..=start + Duration::days(6))
            }
            BudgetPeriod::Monthly => {
                let start = date.replace_day(1).ok()?;
                let end = date
                    .replace_day(last_day_of_month(date.year(), date.month()))
                    .ok()?;
                Some(start..=end)
            }
            BudgetPeriod::Yearly => {
                let start = Date::from_calendar_date(date.year(), Month::January, 1).ok()?;
                let end = Date::from_calendar_date(date.year(), Month::December, 31).ok()?;
                Some(start..=end)
            }
            BudgetPeriod::Custom => None,
        }
    }
}

fn last_day_of_month(year: i32, month: Month) -> u8 {
    match month {
        Month::January
        | Month::March
        | Month::May
        | Month::July
        | Month::August
        | Month::October
        | Month::December => 31,
        Month::April | Month::June | Month::September | Month::November => 30,
        Month::February if time::util::is_leap_year(year) => 29,
        Month::February => 28,
    }
}

impl Display for BudgetPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BudgetPeriod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(BudgetPeriod::Weekly),
            "monthly" => Ok(BudgetPeriod::Monthly),
            "yearly" => Ok(BudgetPeriod::Yearly),
            "custom" => Ok(BudgetPeriod::Custom),
            other => Err(Error::InvalidBudgetPeriod(other.to_owned())),
        }
    }
}

impl ToSql for BudgetPeriod {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for BudgetPeriod {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// A spending cap for one category, or for the whole family, over a date window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// The ID of the budget.
    pub id: BudgetId,
    /// A name for display, e.g. "Groceries (March)".
    pub name: String,
    /// The most that should be spent in the window. Always greater than zero.
    pub amount: f64,
    /// The cached running total of matching expenses.
    ///
    /// This may lag behind the ledger and may exceed `amount`.
    pub spent: f64,
    /// How often the budget is meant to repeat.
    pub period: BudgetPeriod,
    /// The category the budget caps, or `None` for a family-wide budget.
    pub category_id: Option<CategoryId>,
    /// The first day of the budget window.
    pub start_date: Date,
    /// The last day of the budget window, never before `start_date`.
    pub end_date: Date,
    /// Inactive budgets are kept for history but no longer accumulate spending.
    pub is_active: bool,
    /// When the budget was created.
    pub created_at: OffsetDateTime,
    /// When the budget was last changed, including changes to `spent`.
    pub updated_at: OffsetDateTime,
}

impl Budget {
    /// Create a new budget.
    ///
    /// Shortcut for [BudgetBuilder] for discoverability.
    pub fn build(name: &str, amount: f64, start_date: Date, end_date: Date) -> BudgetBuilder {
        BudgetBuilder {
            name: name.to_owned(),
            amount,
            period: BudgetPeriod::default(),
            category_id: None,
            start_date,
            end_date,
            is_active: true,
        }
    }

    /// Create a budget for the window of `period` that contains `date`.
    ///
    /// # Errors
    /// Returns [Error::InvalidBudgetPeriod] for [BudgetPeriod::Custom], which
    /// needs explicit dates.
    pub fn build_for_period(
        name: &str,
        amount: f64,
        period: BudgetPeriod,
        date: Date,
    ) -> Result<BudgetBuilder, Error> {
        let window = period
            .window_containing(date)
            .ok_or_else(|| Error::InvalidBudgetPeriod(period.to_string()))?;

        Ok(Self::build(name, amount, *window.start(), *window.end()).period(period))
    }

    /// Whether the budget caps all spending rather than a single category.
    pub fn is_family_wide(&self) -> bool {
        self.category_id.is_none()
    }

    /// The budget window as an inclusive date range.
    pub fn date_range(&self) -> RangeInclusive<Date> {
        self.start_date..=self.end_date
    }

    /// Whether `date` falls inside the budget window.
    pub fn contains_date(&self, date: Date) -> bool {
        self.date_range().contains(&date)
    }

    /// The number of days between the start and end of the window.
    pub fn window_days(&self) -> i64 {
        (self.end_date - self.start_date).whole_days()
    }
}

/// The user editable fields of a [Budget].
///
/// `spent` is not part of the builder: it only changes through
/// [BudgetStore::increment_spent](crate::budget::BudgetStore::increment_spent)
/// and [BudgetStore::set_spent](crate::budget::BudgetStore::set_spent).
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetBuilder {
    /// The name shown to the user. Must not be empty.
    pub name: String,
    /// How much may be spent in the window. Must be positive.
    pub amount: f64,
    /// The descriptive period.
    pub period: BudgetPeriod,
    /// The category funded by the budget, or `None` for a family-wide budget.
    pub category_id: Option<CategoryId>,
    /// First day of the window.
    pub start_date: Date,
    /// Last day of the window. Not before `start_date`.
    pub end_date: Date,
    /// Whether new expenses count towards the budget.
    pub is_active: bool,
}

impl BudgetBuilder {
    /// Set the descriptive period for the budget.
    pub fn period(mut self, period: BudgetPeriod) -> Self {
        self.period = period;
        self
    }

    /// Set the category the budget caps. `None` makes the budget family-wide.
    pub fn category_id(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    /// Set whether the budget is active.
    pub fn is_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Check the invariants that must hold before a budget is stored.
    ///
    /// # Errors
    /// Returns a:
    /// - [Error::EmptyBudgetName] if the name is empty or only whitespace,
    /// - [Error::InvalidAmount] if the amount is not a positive, finite number,
    /// - or [Error::InvalidDateRange] if the end date is before the start date.
    pub fn validate(&self) -> Result<(), Error> {
        if self.name.trim().is_empty() {
            return Err(Error::EmptyBudgetName);
        }

        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(Error::InvalidAmount(self.amount));
        }

        if self.end_date < self.start_date {
            return Err(Error::InvalidDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }

        Ok(())
    }
}
