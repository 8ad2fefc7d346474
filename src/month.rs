//! Calendar month helpers shared by budgets, recurring transactions and the dashboard.

use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::Error;

/// A `year` and `month` from a query string. Missing parts default to today's.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct MonthQuery {
    pub year: Option<i32>,
    /// 1 = January.
    pub month: Option<u8>,
}

/// The first and last day of a calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthRange {
    pub year: i32,
    pub month: u8,
    pub first_day: Date,
    pub last_day: Date,
}

impl MonthRange {
    /// The range of `month` (1-12) in `year`.
    ///
    /// # Errors
    /// Returns [Error::InvalidInput] if the month or year is out of range.
    pub fn new(year: i32, month: u8) -> Result<Self, Error> {
        let calendar_month = Month::try_from(month)
            .map_err(|_| Error::InvalidInput(format!("month must be between 1 and 12, got {month}")))?;

        let first_day = Date::from_calendar_date(year, calendar_month, 1)
            .map_err(|error| Error::InvalidInput(format!("invalid year {year}: {error}")))?;
        let last_day = Date::from_calendar_date(
            year,
            calendar_month,
            days_in_month(year, calendar_month),
        )
        .map_err(|error| Error::InvalidInput(format!("invalid year {year}: {error}")))?;

        Ok(Self {
            year,
            month,
            first_day,
            last_day,
        })
    }

    /// The month `date` falls in.
    pub fn containing(date: Date) -> Result<Self, Error> {
        Self::new(date.year(), date.month() as u8)
    }

    /// The month named by `query`, filling in missing parts from `today`.
    pub fn resolve(query: MonthQuery, today: Date) -> Result<Self, Error> {
        Self::new(
            query.year.unwrap_or(today.year()),
            query.month.unwrap_or(today.month() as u8),
        )
    }
}

/// The number of days in `month` of `year`.
pub fn days_in_month(year: i32, month: Month) -> u8 {
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
