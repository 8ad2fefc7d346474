//! Calendar arithmetic for recurring transactions.

use serde::{Deserialize, Serialize};
use time::{Date, Duration, Month};

use crate::{Error, month::days_in_month, text_enum::text_enum, validation::Validator};

text_enum! {
    /// How often a recurring transaction repeats.
    pub enum Frequency {
        Daily => "daily",
        /// On a weekday, see [Schedule::weekday].
        Weekly => "weekly",
        /// On a day of the month, see [Schedule::day_of_month].
        Monthly => "monthly",
        /// On a day of a month, see [Schedule::month].
        Yearly => "yearly",
    }
}

/// When a recurring transaction falls due.
///
/// Which of the optional fields are needed depends on the frequency. Days
/// past the end of a month are clamped to its last day, so a monthly
/// schedule on the 31st runs on the 30th in April and on the 28th or 29th in
/// February.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub frequency: Frequency,
    /// 1-31, for monthly and yearly schedules.
    pub day_of_month: Option<u8>,
    /// 0 = Monday to 6 = Sunday, for weekly schedules.
    pub weekday: Option<u8>,
    /// 1 = January, for yearly schedules.
    pub month: Option<u8>,
}

impl Schedule {
    /// Record a problem for each field the frequency needs that is missing
    /// or out of range.
    pub fn validate(&self, validator: &mut Validator) {
        match self.frequency {
            Frequency::Daily => {}
            Frequency::Weekly => match self.weekday {
                Some(0..=6) => {}
                Some(weekday) => {
                    validator.fail(format!("weekday must be between 0 and 6, got {weekday}"))
                }
                None => validator.fail("a weekly schedule needs a weekday"),
            },
            Frequency::Monthly => match self.day_of_month {
                Some(1..=31) => {}
                Some(day) => {
                    validator.fail(format!("day_of_month must be between 1 and 31, got {day}"))
                }
                None => validator.fail("a monthly schedule needs a day_of_month"),
            },
            Frequency::Yearly => {
                let month = match self.month.map(Month::try_from) {
                    Some(Ok(month)) => Some(month),
                    Some(Err(_)) => {
                        validator.fail("month must be between 1 and 12");
                        None
                    }
                    None => {
                        validator.fail("a yearly schedule needs a month");
                        None
                    }
                };

                match (self.day_of_month, month) {
                    (None, _) => validator.fail("a yearly schedule needs a day_of_month"),
                    // Checked against a leap year so 29 February is allowed.
                    (Some(day), Some(month)) if day == 0 || day > days_in_month(2024, month) => {
                        validator.fail(format!("{month} has no day {day}"))
                    }
                    _ => {}
                }
            }
        }
    }

    /// The first due date on or after `start`.
    ///
    /// # Errors
    /// Returns [Error::InvalidInput] if the date would be outside the
    /// supported calendar.
    pub fn first_on_or_after(&self, start: Date) -> Result<Date, Error> {
        match self.frequency {
            Frequency::Daily => Ok(start),
            Frequency::Weekly => add_days(start, self.days_until_weekday(start, false)),
            Frequency::Monthly => {
                let this_month =
                    clamped_date(start.year(), start.month(), self.day_or(start))?;

                if this_month >= start {
                    Ok(this_month)
                } else {
                    self.next_after(start)
                }
            }
            Frequency::Yearly => {
                let this_year = clamped_date(start.year(), self.month_or(start), self.day_or(start))?;

                if this_year >= start {
                    Ok(this_year)
                } else {
                    self.next_after(start)
                }
            }
        }
    }

    /// The due date that follows `date`.
    ///
    /// Daily schedules move one day, weekly ones to the next matching weekday
    /// strictly after `date`, monthly ones to the chosen day of the following
    /// month and yearly ones to the chosen day in the following year.
    ///
    /// # Errors
    /// Returns [Error::InvalidInput] if the date would be outside the
    /// supported calendar.
    pub fn next_after(&self, date: Date) -> Result<Date, Error> {
        match self.frequency {
            Frequency::Daily => add_days(date, 1),
            Frequency::Weekly => add_days(date, self.days_until_weekday(date, true)),
            Frequency::Monthly => {
                let (year, month) = match date.month() {
                    Month::December => (date.year() + 1, Month::January),
                    month => (date.year(), month.next()),
                };

                clamped_date(year, month, self.day_or(date))
            }
            Frequency::Yearly => clamped_date(date.year() + 1, self.month_or(date), self.day_or(date)),
        }
    }

    fn day_or(&self, date: Date) -> u8 {
        self.day_of_month.unwrap_or(date.day())
    }

    fn month_or(&self, date: Date) -> Month {
        self.month
            .and_then(|month| Month::try_from(month).ok())
            .unwrap_or(date.month())
    }

    fn days_until_weekday(&self, date: Date, strictly_after: bool) -> i64 {
        let current = date.weekday().number_days_from_monday();
        let target = self.weekday.unwrap_or(current) % 7;
        let days = (target + 7 - current) % 7;

        if days == 0 && strictly_after { 7 } else { days.into() }
    }
}

fn add_days(date: Date, days: i64) -> Result<Date, Error> {
    date.checked_add(Duration::days(days))
        .ok_or_else(|| Error::InvalidInput(format!("no date {days} days after {date}")))
}

fn clamped_date(year: i32, month: Month, day: u8) -> Result<Date, Error> {
    let day = day.clamp(1, days_in_month(year, month));

    Date::from_calendar_date(year, month, day)
        .map_err(|error| Error::InvalidInput(format!("invalid date in {year}: {error}")))
}
