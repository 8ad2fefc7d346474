//! Recurring transaction templates and their schema.

use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    account::AccountId,
    asset::AssetId,
    category::CategoryId,
    pagination::{Page, Paged},
    recurring::schedule::{Frequency, Schedule},
    transaction::{NewTransaction, TransactionKind},
    validation::Validator,
};

pub type RecurringId = i64;

/// Prepended to the description of every transaction created from a template.
pub const AUTO_PREFIX: &str = "[AUTO] ";

/// A template for a transaction that repeats on a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringTransaction {
    pub id: RecurringId,
    pub description: String,
    pub amount: f64,
    pub kind: TransactionKind,
    pub frequency: Frequency,
    pub day_of_month: Option<u8>,
    pub weekday: Option<u8>,
    pub month: Option<u8>,
    pub start_date: Date,
    pub end_date: Option<Date>,
    /// The date of the next transaction this template will create.
    pub next_date: Date,
    pub active: bool,
    pub account_id: AccountId,
    pub destination_account_id: Option<AccountId>,
    pub category_id: Option<CategoryId>,
    pub budget_id: Option<i64>,
    pub savings_goal_id: Option<i64>,
    pub asset_id: Option<AssetId>,
    pub note: Option<String>,
}

impl RecurringTransaction {
    pub fn schedule(&self) -> Schedule {
        Schedule {
            frequency: self.frequency,
            day_of_month: self.day_of_month,
            weekday: self.weekday,
            month: self.month,
        }
    }

    /// The transaction this template creates for the occurrence on `date`.
    pub fn occurrence(&self, date: Date) -> NewTransaction {
        NewTransaction {
            date,
            amount: self.amount,
            kind: self.kind,
            account_id: self.account_id,
            destination_account_id: self.destination_account_id,
            category_id: self.category_id,
            description: format!("{AUTO_PREFIX}{}", self.description),
            note: self.note.clone(),
            recurring: true,
            budget_id: self.budget_id,
            savings_goal_id: self.savings_goal_id,
            asset_id: self.asset_id,
            usage: None,
        }
    }
}

fn default_active() -> bool {
    true
}

/// The data for creating or replacing a recurring transaction.
///
/// `start_date` defaults to today when creating and to the stored start date
/// when replacing. `next_date` defaults to the first occurrence on or after
/// the start date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringForm {
    pub description: String,
    pub amount: f64,
    pub kind: TransactionKind,
    pub frequency: Frequency,
    #[serde(default)]
    pub day_of_month: Option<u8>,
    #[serde(default)]
    pub weekday: Option<u8>,
    #[serde(default)]
    pub month: Option<u8>,
    #[serde(default)]
    pub start_date: Option<Date>,
    #[serde(default)]
    pub end_date: Option<Date>,
    #[serde(default)]
    pub next_date: Option<Date>,
    #[serde(default = "default_active")]
    pub active: bool,
    pub account_id: AccountId,
    #[serde(default)]
    pub destination_account_id: Option<AccountId>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub budget_id: Option<i64>,
    #[serde(default)]
    pub savings_goal_id: Option<i64>,
    #[serde(default)]
    pub asset_id: Option<AssetId>,
    #[serde(default)]
    pub note: Option<String>,
}

impl RecurringForm {
    /// An active template with no schedule details or links.
    pub fn new(
        description: &str,
        amount: f64,
        kind: TransactionKind,
        frequency: Frequency,
        account_id: AccountId,
    ) -> Self {
        Self {
            description: description.to_owned(),
            amount,
            kind,
            frequency,
            day_of_month: None,
            weekday: None,
            month: None,
            start_date: None,
            end_date: None,
            next_date: None,
            active: true,
            account_id,
            destination_account_id: None,
            category_id: None,
            budget_id: None,
            savings_goal_id: None,
            asset_id: None,
            note: None,
        }
    }

    pub fn day_of_month(mut self, day: u8) -> Self {
        self.day_of_month = Some(day);
        self
    }

    pub fn weekday(mut self, weekday: u8) -> Self {
        self.weekday = Some(weekday);
        self
    }

    pub fn month(mut self, month: u8) -> Self {
        self.month = Some(month);
        self
    }

    pub fn start_date(mut self, start_date: Date) -> Self {
        self.start_date = Some(start_date);
        self
    }

    pub fn end_date(mut self, end_date: Date) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn destination(mut self, account_id: AccountId) -> Self {
        self.destination_account_id = Some(account_id);
        self
    }

    fn schedule(&self) -> Schedule {
        Schedule {
            frequency: self.frequency,
            day_of_month: self.day_of_month,
            weekday: self.weekday,
            month: self.month,
        }
    }

    fn validate(&self, start_date: Date) -> Result<(), Error> {
        let mut validator = Validator::default();
        validator.not_blank("description", &self.description);
        self.schedule().validate(&mut validator);
        if let Some(end_date) = self.end_date
            && end_date < start_date
        {
            validator.fail("end_date must not be before start_date");
        }
        validator.finish()?;

        // The created transactions must be valid too.
        NewTransaction {
            date: start_date,
            amount: self.amount,
            kind: self.kind,
            account_id: self.account_id,
            destination_account_id: self.destination_account_id,
            category_id: self.category_id,
            description: self.description.clone(),
            note: None,
            recurring: true,
            budget_id: self.budget_id,
            savings_goal_id: self.savings_goal_id,
            asset_id: self.asset_id,
            usage: None,
        }
        .validate()
    }
}

/// The filters for listing recurring transactions.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RecurringQuery {
    pub active: Option<bool>,
    pub kind: Option<TransactionKind>,
    pub frequency: Option<Frequency>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

pub fn create_recurring_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS recurring_transaction (
            id INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            amount REAL NOT NULL CHECK (amount > 0),
            kind TEXT NOT NULL,
            frequency TEXT NOT NULL,
            day_of_month INTEGER CHECK (day_of_month BETWEEN 1 AND 31),
            weekday INTEGER CHECK (weekday BETWEEN 0 AND 6),
            month INTEGER CHECK (month BETWEEN 1 AND 12),
            start_date TEXT NOT NULL,
            end_date TEXT,
            next_date TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            account_id INTEGER NOT NULL REFERENCES account(id),
            destination_account_id INTEGER REFERENCES account(id),
            category_id INTEGER REFERENCES category(id),
            budget_id INTEGER REFERENCES budget(id) ON DELETE SET NULL,
            savings_goal_id INTEGER REFERENCES savings_goal(id) ON DELETE SET NULL,
            asset_id INTEGER REFERENCES asset(id),
            note TEXT
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_recurring_transaction_due \
        ON recurring_transaction(active, next_date)",
        (),
    )?;

    Ok(())
}

pub(super) const RECURRING_COLUMNS: &str = "id, description, amount, kind, frequency, \
    day_of_month, weekday, month, start_date, end_date, next_date, active, account_id, \
    destination_account_id, category_id, budget_id, savings_goal_id, asset_id, note";

pub(super) fn map_row_to_recurring(row: &Row) -> Result<RecurringTransaction, rusqlite::Error> {
    Ok(RecurringTransaction {
        id: row.get(0)?,
        description: row.get(1)?,
        amount: row.get(2)?,
        kind: row.get(3)?,
        frequency: row.get(4)?,
        day_of_month: row.get(5)?,
        weekday: row.get(6)?,
        month: row.get(7)?,
        start_date: row.get(8)?,
        end_date: row.get(9)?,
        next_date: row.get(10)?,
        active: row.get(11)?,
        account_id: row.get(12)?,
        destination_account_id: row.get(13)?,
        category_id: row.get(14)?,
        budget_id: row.get(15)?,
        savings_goal_id: row.get(16)?,
        asset_id: row.get(17)?,
        note: row.get(18)?,
    })
}

/// Create a recurring transaction.
///
/// # Errors
/// Returns [Error::InvalidInput] if the schedule or the transaction it would
/// create is invalid and [Error::InvalidForeignKey] if a referenced record
/// does not exist.
pub fn create_recurring_transaction(
    form: &RecurringForm,
    today: Date,
    connection: &Connection,
) -> Result<RecurringTransaction, Error> {
    let start_date = form.start_date.unwrap_or(today);
    form.validate(start_date)?;

    let next_date = match form.next_date {
        Some(next_date) => next_date,
        None => form.schedule().first_on_or_after(start_date)?,
    };

    connection
        .query_row(
            &format!(
                "INSERT INTO recurring_transaction (description, amount, kind, frequency, \
                day_of_month, weekday, month, start_date, end_date, next_date, active, \
                account_id, destination_account_id, category_id, budget_id, savings_goal_id, \
                asset_id, note) \
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18) \
                RETURNING {RECURRING_COLUMNS}"
            ),
            params![
                form.description.trim(),
                form.amount,
                form.kind,
                form.frequency,
                form.day_of_month,
                form.weekday,
                form.month,
                start_date,
                form.end_date,
                next_date,
                form.active,
                form.account_id,
                form.destination_account_id,
                form.category_id,
                form.budget_id,
                form.savings_goal_id,
                form.asset_id,
                form.note,
            ],
            map_row_to_recurring,
        )
        .map_err(Error::from)
}

pub fn get_recurring_transaction(
    id: RecurringId,
    connection: &Connection,
) -> Result<RecurringTransaction, Error> {
    connection
        .query_row(
            &format!("SELECT {RECURRING_COLUMNS} FROM recurring_transaction WHERE id = ?1"),
            [id],
            map_row_to_recurring,
        )
        .map_err(Error::from)
}

/// Get one page of recurring transactions, soonest due first.
pub fn get_recurring_transactions(
    query: &RecurringQuery,
    page: Page,
    connection: &Connection,
) -> Result<Paged<RecurringTransaction>, Error> {
    let filter = "WHERE (?1 IS NULL OR active = ?1) \
        AND (?2 IS NULL OR kind = ?2) \
        AND (?3 IS NULL OR frequency = ?3)";

    let total: i64 = connection.query_row(
        &format!("SELECT COUNT(*) FROM recurring_transaction {filter}"),
        params![query.active, query.kind, query.frequency],
        |row| row.get(0),
    )?;

    let items = connection
        .prepare(&format!(
            "SELECT {RECURRING_COLUMNS} FROM recurring_transaction {filter} \
            ORDER BY next_date ASC, id ASC LIMIT ?4 OFFSET ?5"
        ))?
        .query_map(
            params![
                query.active,
                query.kind,
                query.frequency,
                page.limit(),
                page.offset()
            ],
            map_row_to_recurring,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Paged::new(items, total.max(0) as u64, page))
}

/// Replace a recurring transaction.
///
/// If `form` has no `next_date` and the schedule and start date are
/// unchanged the stored next date is kept, otherwise it becomes the first
/// occurrence on or after the later of the start date and `today`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no recurring transaction with `id`.
pub fn update_recurring_transaction(
    id: RecurringId,
    form: &RecurringForm,
    today: Date,
    connection: &Connection,
) -> Result<RecurringTransaction, Error> {
    let sql_transaction = connection.unchecked_transaction()?;
    let existing = get_recurring_transaction(id, &sql_transaction)?;

    let start_date = form.start_date.unwrap_or(existing.start_date);
    form.validate(start_date)?;

    let next_date = match form.next_date {
        Some(next_date) => next_date,
        None if form.schedule() == existing.schedule() && start_date == existing.start_date => {
            existing.next_date
        }
        None => form.schedule().first_on_or_after(start_date.max(today))?,
    };

    let updated = sql_transaction.query_row(
        &format!(
            "UPDATE recurring_transaction SET description = ?1, amount = ?2, kind = ?3, \
            frequency = ?4, day_of_month = ?5, weekday = ?6, month = ?7, start_date = ?8, \
            end_date = ?9, next_date = ?10, active = ?11, account_id = ?12, \
            destination_account_id = ?13, category_id = ?14, budget_id = ?15, \
            savings_goal_id = ?16, asset_id = ?17, note = ?18 \
            WHERE id = ?19 RETURNING {RECURRING_COLUMNS}"
        ),
        params![
            form.description.trim(),
            form.amount,
            form.kind,
            form.frequency,
            form.day_of_month,
            form.weekday,
            form.month,
            start_date,
            form.end_date,
            next_date,
            form.active,
            form.account_id,
            form.destination_account_id,
            form.category_id,
            form.budget_id,
            form.savings_goal_id,
            form.asset_id,
            form.note,
            id,
        ],
        map_row_to_recurring,
    )?;

    sql_transaction.commit()?;

    Ok(updated)
}

/// Pause an active recurring transaction or resume a paused one.
pub fn toggle_recurring_transaction(
    id: RecurringId,
    connection: &Connection,
) -> Result<RecurringTransaction, Error> {
    connection
        .query_row(
            &format!(
                "UPDATE recurring_transaction SET active = NOT active WHERE id = ?1 \
                RETURNING {RECURRING_COLUMNS}"
            ),
            [id],
            map_row_to_recurring,
        )
        .map_err(Error::from)
}

/// Delete a recurring transaction. Transactions it already created are kept.
pub fn delete_recurring_transaction(id: RecurringId, connection: &Connection) -> Result<(), Error> {
    let rows_affected =
        connection.execute("DELETE FROM recurring_transaction WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

pub(super) fn set_next_date(
    id: RecurringId,
    next_date: Date,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "UPDATE recurring_transaction SET next_date = ?1 WHERE id = ?2",
        params![next_date, id],
    )?;

    Ok(())
}
