use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    category::{CategoryId, get_category},
    db::PartialUpdate,
    text_enum::text_enum,
    validation::Validator,
};

pub type BudgetId = i64;

text_enum! {
    /// How often a budget's amount is meant to be spent.
    pub enum BudgetPeriod {
        Daily => "daily",
        Weekly => "weekly",
        Monthly => "monthly",
        Yearly => "yearly",
    }
}

impl Default for BudgetPeriod {
    fn default() -> Self {
        Self::Monthly
    }
}

/// A spending limit for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: BudgetId,
    pub category_id: CategoryId,
    pub amount: f64,
    pub period: BudgetPeriod,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub active: bool,
    pub note: Option<String>,
}

/// The data for creating a budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetForm {
    pub category_id: CategoryId,
    pub amount: f64,
    #[serde(default)]
    pub period: BudgetPeriod,
    /// Today if not given.
    #[serde(default)]
    pub start_date: Option<Date>,
    #[serde(default)]
    pub end_date: Option<Date>,
    #[serde(default)]
    pub note: Option<String>,
}

impl BudgetForm {
    /// A monthly budget starting today.
    pub fn new(category_id: CategoryId, amount: f64) -> Self {
        Self {
            category_id,
            amount,
            period: BudgetPeriod::Monthly,
            start_date: None,
            end_date: None,
            note: None,
        }
    }
}

/// The fields of a budget that can be changed.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetUpdate {
    pub amount: Option<f64>,
    pub period: Option<BudgetPeriod>,
    pub active: Option<bool>,
}

pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS budget (
            id INTEGER PRIMARY KEY,
            category_id INTEGER NOT NULL REFERENCES category(id),
            amount REAL NOT NULL CHECK (amount > 0),
            period TEXT NOT NULL DEFAULT 'monthly',
            start_date TEXT NOT NULL,
            end_date TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            note TEXT
        )",
        (),
    )?;

    Ok(())
}

pub(super) const BUDGET_COLUMNS: &str =
    "id, category_id, amount, period, start_date, end_date, active, note";

pub(super) fn map_row_to_budget(row: &Row) -> Result<Budget, rusqlite::Error> {
    Ok(Budget {
        id: row.get(0)?,
        category_id: row.get(1)?,
        amount: row.get(2)?,
        period: row.get(3)?,
        start_date: row.get(4)?,
        end_date: row.get(5)?,
        active: row.get(6)?,
        note: row.get(7)?,
    })
}

fn ensure_no_other_active_budget(
    category_id: CategoryId,
    except: Option<BudgetId>,
    connection: &Connection,
) -> Result<(), Error> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(*) FROM budget WHERE category_id = ?1 AND active = 1 AND id IS NOT ?2",
        params![category_id, except],
        |row| row.get(0),
    )?;

    if count > 0 {
        return Err(Error::ActiveBudgetExists(category_id));
    }

    Ok(())
}

/// Create a budget for a category.
///
/// # Errors
/// Returns [Error::InvalidForeignKey] if the category does not exist and
/// [Error::ActiveBudgetExists] if the category already has an active budget.
pub fn create_budget(form: &BudgetForm, today: Date, connection: &Connection) -> Result<Budget, Error> {
    let mut validator = Validator::default();
    validator.positive("amount", form.amount);
    let start_date = form.start_date.unwrap_or(today);
    if let Some(end_date) = form.end_date
        && end_date < start_date
    {
        validator.fail("end_date must not be before start_date");
    }
    validator.finish()?;

    get_category(form.category_id, connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidForeignKey,
        error => error,
    })?;
    ensure_no_other_active_budget(form.category_id, None, connection)?;

    connection
        .query_row(
            &format!(
                "INSERT INTO budget (category_id, amount, period, start_date, end_date, note) \
                VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                RETURNING {BUDGET_COLUMNS}"
            ),
            params![
                form.category_id,
                form.amount,
                form.period,
                start_date,
                form.end_date,
                form.note
            ],
            map_row_to_budget,
        )
        .map_err(Error::from)
}

pub fn get_budget(id: BudgetId, connection: &Connection) -> Result<Budget, Error> {
    connection
        .query_row(
            &format!("SELECT {BUDGET_COLUMNS} FROM budget WHERE id = ?1"),
            [id],
            map_row_to_budget,
        )
        .map_err(Error::from)
}

/// Change the amount, period or active flag of a budget.
///
/// # Errors
/// Returns [Error::NoFieldsToUpdate] if `update` is empty and
/// [Error::ActiveBudgetExists] when reactivating a budget whose category has
/// another active budget.
pub fn update_budget(
    id: BudgetId,
    update: &BudgetUpdate,
    connection: &Connection,
) -> Result<Budget, Error> {
    let mut validator = Validator::default();
    validator.positive("amount", update.amount);
    validator.finish()?;

    if update.active == Some(true) {
        let budget = get_budget(id, connection)?;
        ensure_no_other_active_budget(budget.category_id, Some(id), connection)?;
    }

    let mut statement = PartialUpdate::new("budget");
    statement
        .set("amount", update.amount)
        .set("period", update.period.map(|period| period.as_str().to_owned()))
        .set("active", update.active);

    statement.execute(id, BUDGET_COLUMNS, connection, map_row_to_budget)
}

pub fn delete_budget(id: BudgetId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM budget WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        budget::core::{
            BudgetForm, BudgetPeriod, BudgetUpdate, create_budget, delete_budget, get_budget,
            update_budget,
        },
        category::{CategoryKind, get_category_by_name},
        db::initialize,
    };

    fn get_test_connection() -> (Connection, i64) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let groceries = get_category_by_name("Groceries", CategoryKind::Expense, &connection)
            .unwrap()
            .id;

        (connection, groceries)
    }

    #[test]
    fn start_date_defaults_to_today() {
        let (connection, groceries) = get_test_connection();

        let budget =
            create_budget(&BudgetForm::new(groceries, 400.0), date!(2025 - 05 - 03), &connection)
                .unwrap();

        assert_eq!(budget.start_date, date!(2025 - 05 - 03));
        assert_eq!(budget.period, BudgetPeriod::Monthly);
        assert!(budget.active);
    }

    #[test]
    fn one_active_budget_per_category() {
        let (connection, groceries) = get_test_connection();
        let today = date!(2025 - 05 - 03);
        let first = create_budget(&BudgetForm::new(groceries, 400.0), today, &connection).unwrap();

        let second = create_budget(&BudgetForm::new(groceries, 300.0), today, &connection);
        assert_eq!(second, Err(Error::ActiveBudgetExists(groceries)));

        update_budget(
            first.id,
            &BudgetUpdate {
                active: Some(false),
                ..Default::default()
            },
            &connection,
        )
        .unwrap();
        let replacement =
            create_budget(&BudgetForm::new(groceries, 300.0), today, &connection).unwrap();

        let reactivate = update_budget(
            first.id,
            &BudgetUpdate {
                active: Some(true),
                ..Default::default()
            },
            &connection,
        );
        assert_eq!(reactivate, Err(Error::ActiveBudgetExists(groceries)));
        assert!(get_budget(replacement.id, &connection).unwrap().active);
    }

    #[test]
    fn unknown_category_is_invalid_foreign_key() {
        let (connection, _) = get_test_connection();

        let got = create_budget(&BudgetForm::new(999, 10.0), date!(2025 - 05 - 03), &connection);

        assert_eq!(got, Err(Error::InvalidForeignKey));
    }

    #[test]
    fn rejects_non_positive_amounts() {
        let (connection, groceries) = get_test_connection();

        let got = create_budget(&BudgetForm::new(groceries, 0.0), date!(2025 - 05 - 03), &connection);

        assert!(matches!(got, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn update_and_delete() {
        let (connection, groceries) = get_test_connection();
        let budget =
            create_budget(&BudgetForm::new(groceries, 400.0), date!(2025 - 05 - 03), &connection)
                .unwrap();

        let updated = update_budget(
            budget.id,
            &BudgetUpdate {
                amount: Some(450.0),
                period: Some(BudgetPeriod::Weekly),
                active: None,
            },
            &connection,
        )
        .unwrap();

        assert_eq!(updated.amount, 450.0);
        assert_eq!(updated.period, BudgetPeriod::Weekly);
        assert_eq!(
            update_budget(budget.id, &BudgetUpdate::default(), &connection),
            Err(Error::NoFieldsToUpdate)
        );
        delete_budget(budget.id, &connection).unwrap();
        assert_eq!(delete_budget(budget.id, &connection), Err(Error::NotFound));
    }
}
