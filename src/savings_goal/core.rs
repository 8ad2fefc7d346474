use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error, account::AccountId, cost_breakdown::round_to, db::PartialUpdate,
    validation::Validator,
};

pub type SavingsGoalId = i64;

const DEFAULT_PRIORITY: u8 = 3;

/// An amount of money to save, optionally by a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsGoal {
    pub id: SavingsGoalId,
    pub name: String,
    pub target_amount: f64,
    pub current_amount: f64,
    pub target_date: Option<Date>,
    /// The account the savings are kept in.
    pub account_id: Option<AccountId>,
    /// 1 is the most important, 5 the least.
    pub priority: u8,
    /// Set once the current amount reaches the target.
    pub completed: bool,
    pub note: Option<String>,
    /// `current_amount` as a percentage of `target_amount`, to one decimal place.
    pub progress_percent: f64,
}

/// The data for creating a savings goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsGoalForm {
    pub name: String,
    pub target_amount: f64,
    #[serde(default)]
    pub current_amount: f64,
    #[serde(default)]
    pub target_date: Option<Date>,
    #[serde(default)]
    pub account_id: Option<AccountId>,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub note: Option<String>,
}

fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}

impl SavingsGoalForm {
    /// A goal with nothing saved yet and the default priority.
    pub fn new(name: &str, target_amount: f64) -> Self {
        Self {
            name: name.to_owned(),
            target_amount,
            current_amount: 0.0,
            target_date: None,
            account_id: None,
            priority: DEFAULT_PRIORITY,
            note: None,
        }
    }
}

/// The fields of a savings goal that can be changed.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsGoalUpdate {
    pub name: Option<String>,
    pub target_amount: Option<f64>,
    pub current_amount: Option<f64>,
    pub target_date: Option<Date>,
    pub account_id: Option<AccountId>,
    pub priority: Option<u8>,
    /// If not given, recomputed when either amount changes.
    pub completed: Option<bool>,
    pub note: Option<String>,
}

/// The query for listing savings goals.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct SavingsGoalQuery {
    #[serde(default)]
    pub include_completed: bool,
}

pub fn create_savings_goal_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS savings_goal (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            target_amount REAL NOT NULL CHECK (target_amount > 0),
            current_amount REAL NOT NULL DEFAULT 0,
            target_date TEXT,
            account_id INTEGER REFERENCES account(id),
            priority INTEGER NOT NULL DEFAULT 3 CHECK (priority BETWEEN 1 AND 5),
            completed INTEGER NOT NULL DEFAULT 0,
            note TEXT
        )",
        (),
    )?;

    Ok(())
}

const SAVINGS_GOAL_COLUMNS: &str =
    "id, name, target_amount, current_amount, target_date, account_id, priority, completed, note";

fn map_row_to_savings_goal(row: &Row) -> Result<SavingsGoal, rusqlite::Error> {
    let target_amount: f64 = row.get(2)?;
    let current_amount: f64 = row.get(3)?;

    Ok(SavingsGoal {
        id: row.get(0)?,
        name: row.get(1)?,
        target_amount,
        current_amount,
        target_date: row.get(4)?,
        account_id: row.get(5)?,
        priority: row.get(6)?,
        completed: row.get(7)?,
        note: row.get(8)?,
        progress_percent: progress_percent(current_amount, target_amount),
    })
}

fn progress_percent(current_amount: f64, target_amount: f64) -> f64 {
    if target_amount > 0.0 {
        round_to(current_amount / target_amount * 100.0, 1)
    } else {
        0.0
    }
}

fn validate_priority(validator: &mut Validator, priority: Option<u8>) {
    if let Some(priority) = priority
        && !(1..=5).contains(&priority)
    {
        validator.fail(format!("priority must be between 1 and 5, got {priority}"));
    }
}

pub fn create_savings_goal(
    form: &SavingsGoalForm,
    connection: &Connection,
) -> Result<SavingsGoal, Error> {
    let mut validator = Validator::default();
    validator.not_blank("name", &form.name);
    validator.positive("target_amount", form.target_amount);
    validator.non_negative("current_amount", form.current_amount);
    validate_priority(&mut validator, Some(form.priority));
    validator.finish()?;

    connection
        .query_row(
            &format!(
                "INSERT INTO savings_goal \
                (name, target_amount, current_amount, target_date, account_id, priority, completed, note) \
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?3 >= ?2, ?7) \
                RETURNING {SAVINGS_GOAL_COLUMNS}"
            ),
            params![
                form.name.trim(),
                form.target_amount,
                form.current_amount,
                form.target_date,
                form.account_id,
                form.priority,
                form.note
            ],
            map_row_to_savings_goal,
        )
        .map_err(Error::from)
}

pub fn get_savings_goal(id: SavingsGoalId, connection: &Connection) -> Result<SavingsGoal, Error> {
    connection
        .query_row(
            &format!("SELECT {SAVINGS_GOAL_COLUMNS} FROM savings_goal WHERE id = ?1"),
            [id],
            map_row_to_savings_goal,
        )
        .map_err(Error::from)
}

/// List open goals by priority and then target date, optionally followed by completed goals.
pub fn get_savings_goals(
    include_completed: bool,
    connection: &Connection,
) -> Result<Vec<SavingsGoal>, Error> {
    let where_clause = if include_completed {
        ""
    } else {
        "WHERE completed = 0"
    };

    connection
        .prepare(&format!(
            "SELECT {SAVINGS_GOAL_COLUMNS} FROM savings_goal {where_clause} \
            ORDER BY completed, priority, target_date IS NULL, target_date, id"
        ))?
        .query_map([], map_row_to_savings_goal)?
        .map(|maybe_goal| maybe_goal.map_err(Error::from))
        .collect()
}

pub fn update_savings_goal(
    id: SavingsGoalId,
    update: &SavingsGoalUpdate,
    connection: &Connection,
) -> Result<SavingsGoal, Error> {
    let mut validator = Validator::default();
    if let Some(name) = &update.name {
        validator.not_blank("name", name);
    }
    validator.positive("target_amount", update.target_amount);
    validator.non_negative("current_amount", update.current_amount);
    validate_priority(&mut validator, update.priority);
    validator.finish()?;

    let sql_transaction = connection.unchecked_transaction()?;

    let mut statement = PartialUpdate::new("savings_goal");
    statement
        .set("name", update.name.as_deref().map(|name| name.trim().to_owned()))
        .set("target_amount", update.target_amount)
        .set("current_amount", update.current_amount)
        .set("target_date", update.target_date.map(|date| date.to_string()))
        .set("account_id", update.account_id)
        .set("priority", update.priority.map(i64::from))
        .set("completed", update.completed)
        .set("note", update.note.clone());
    let mut goal = statement.execute(
        id,
        SAVINGS_GOAL_COLUMNS,
        &sql_transaction,
        map_row_to_savings_goal,
    )?;

    let amounts_changed = update.target_amount.is_some() || update.current_amount.is_some();
    if amounts_changed && update.completed.is_none() {
        goal = sql_transaction.query_row(
            &format!(
                "UPDATE savings_goal SET completed = current_amount >= target_amount \
                WHERE id = ?1 RETURNING {SAVINGS_GOAL_COLUMNS}"
            ),
            [id],
            map_row_to_savings_goal,
        )?;
    }

    sql_transaction.commit()?;

    Ok(goal)
}

pub fn delete_savings_goal(id: SavingsGoalId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM savings_goal WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Add `amount` to a goal, completing it if the target is reached.
pub fn contribute_to_savings_goal(
    id: SavingsGoalId,
    amount: f64,
    connection: &Connection,
) -> Result<SavingsGoal, Error> {
    let mut validator = Validator::default();
    validator.positive("amount", amount);
    validator.finish()?;

    // SET expressions see the row as it was before the update.
    connection
        .query_row(
            &format!(
                "UPDATE savings_goal SET \
                current_amount = current_amount + ?1, \
                completed = current_amount + ?1 >= target_amount \
                WHERE id = ?2 RETURNING {SAVINGS_GOAL_COLUMNS}"
            ),
            params![amount, id],
            map_row_to_savings_goal,
        )
        .map_err(Error::from)
}

/// Take `amount` out of a goal, never going below zero.
pub fn withdraw_from_savings_goal(
    id: SavingsGoalId,
    amount: f64,
    connection: &Connection,
) -> Result<SavingsGoal, Error> {
    let mut validator = Validator::default();
    validator.positive("amount", amount);
    validator.finish()?;

    connection
        .query_row(
            &format!(
                "UPDATE savings_goal SET \
                current_amount = MAX(current_amount - ?1, 0), \
                completed = MAX(current_amount - ?1, 0) >= target_amount \
                WHERE id = ?2 RETURNING {SAVINGS_GOAL_COLUMNS}"
            ),
            params![amount, id],
            map_row_to_savings_goal,
        )
        .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        db::initialize,
        savings_goal::core::{
            SavingsGoalForm, SavingsGoalUpdate, contribute_to_savings_goal, create_savings_goal,
            delete_savings_goal, get_savings_goal, get_savings_goals, update_savings_goal,
            withdraw_from_savings_goal,
        },
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    #[test]
    fn contribute_completes_and_withdraw_reopens() {
        let connection = get_test_connection();
        let goal = create_savings_goal(&SavingsGoalForm::new("Bike", 500.0), &connection).unwrap();

        let goal = contribute_to_savings_goal(goal.id, 350.0, &connection).unwrap();
        assert!(!goal.completed);
        assert_eq!(goal.progress_percent, 70.0);

        let goal = contribute_to_savings_goal(goal.id, 150.0, &connection).unwrap();
        assert!(goal.completed);
        assert_eq!(goal.current_amount, 500.0);

        let goal = withdraw_from_savings_goal(goal.id, 0.01, &connection).unwrap();
        assert!(!goal.completed);
    }

    #[test]
    fn withdraw_is_floored_at_zero() {
        let connection = get_test_connection();
        let goal = create_savings_goal(
            &SavingsGoalForm {
                current_amount: 40.0,
                ..SavingsGoalForm::new("Bike", 500.0)
            },
            &connection,
        )
        .unwrap();

        let goal = withdraw_from_savings_goal(goal.id, 100.0, &connection).unwrap();

        assert_eq!(goal.current_amount, 0.0);
        assert_eq!(
            withdraw_from_savings_goal(goal.id, -1.0, &connection).map(|_| ()),
            Err(Error::InvalidInput("amount must be greater than zero".to_owned()))
        );
        assert_eq!(
            contribute_to_savings_goal(99, 1.0, &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn validates_target_and_priority() {
        let connection = get_test_connection();

        let no_target = create_savings_goal(&SavingsGoalForm::new("Bike", 0.0), &connection);
        let bad_priority = create_savings_goal(
            &SavingsGoalForm {
                priority: 6,
                ..SavingsGoalForm::new("Bike", 100.0)
            },
            &connection,
        );

        assert!(matches!(no_target, Err(Error::InvalidInput(_))));
        assert!(matches!(bad_priority, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn lists_open_goals_by_priority_then_date() {
        let connection = get_test_connection();
        let create = |name: &str, priority: u8, target_date| {
            create_savings_goal(
                &SavingsGoalForm {
                    priority,
                    target_date,
                    ..SavingsGoalForm::new(name, 100.0)
                },
                &connection,
            )
            .unwrap()
        };
        create("Later", 2, None);
        create("Soon", 2, Some(date!(2025 - 06 - 01)));
        create("Urgent", 1, Some(date!(2026 - 01 - 01)));
        let done = create("Done", 1, None);
        contribute_to_savings_goal(done.id, 100.0, &connection).unwrap();

        let open: Vec<String> = get_savings_goals(false, &connection)
            .unwrap()
            .into_iter()
            .map(|goal| goal.name)
            .collect();
        let all = get_savings_goals(true, &connection).unwrap();

        assert_eq!(open, ["Urgent", "Soon", "Later"]);
        assert_eq!(all.len(), 4);
        assert_eq!(all[3].name, "Done");
    }

    #[test]
    fn update_recomputes_completed() {
        let connection = get_test_connection();
        let goal = create_savings_goal(
            &SavingsGoalForm {
                current_amount: 80.0,
                ..SavingsGoalForm::new("Bike", 100.0)
            },
            &connection,
        )
        .unwrap();

        let lowered = update_savings_goal(
            goal.id,
            &SavingsGoalUpdate {
                target_amount: Some(75.0),
                ..Default::default()
            },
            &connection,
        )
        .unwrap();

        assert!(lowered.completed);
        assert_eq!(
            update_savings_goal(goal.id, &SavingsGoalUpdate::default(), &connection),
            Err(Error::NoFieldsToUpdate)
        );
        delete_savings_goal(goal.id, &connection).unwrap();
        assert_eq!(get_savings_goal(goal.id, &connection), Err(Error::NotFound));
    }
}
