//! The database schema and its migrations.
//!
//! The schema version is kept in SQLite's `user_version` pragma. Each
//! [Migration] moves the schema forward by one version and [initialize]
//! applies every migration newer than the stored version.

use rusqlite::{
    Connection, Row, Transaction as SqlTransaction, TransactionBehavior, params_from_iter,
    types::Value,
};

use crate::{
    Error,
    account::create_account_table,
    asset::create_asset_table,
    budget::create_budget_table,
    category::{create_category_table, seed_system_categories},
    recurring::create_recurring_transaction_table,
    savings_goal::create_savings_goal_table,
    transaction::{
        add_budget_and_savings_goal_links, add_recurring_flag, create_cost_component_table,
        create_transaction_table,
    },
};

/// One step in the evolution of the schema.
struct Migration {
    version: i64,
    description: &'static str,
    apply: fn(&Connection) -> Result<(), rusqlite::Error>,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create accounts, categories, assets, transactions and cost components",
        apply: create_core_tables,
    },
    Migration {
        version: 2,
        description: "create budgets and savings goals",
        apply: create_planning_tables,
    },
    Migration {
        version: 3,
        description: "link transactions to budgets and savings goals",
        apply: add_budget_and_savings_goal_links,
    },
    Migration {
        version: 4,
        description: "create recurring transactions",
        apply: create_recurring_tables,
    },
    Migration {
        version: 5,
        description: "seed system categories",
        apply: seed_system_categories,
    },
];

fn create_core_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    create_account_table(connection)?;
    create_category_table(connection)?;
    create_asset_table(connection)?;
    create_transaction_table(connection)?;
    create_cost_component_table(connection)
}

fn create_planning_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    create_budget_table(connection)?;
    create_savings_goal_table(connection)
}

fn create_recurring_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    create_recurring_transaction_table(connection)?;
    add_recurring_flag(connection)
}

/// The schema version after every migration has been applied.
pub fn latest_version() -> i64 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Read the schema version stored in the database.
pub fn schema_version(connection: &Connection) -> Result<i64, Error> {
    connection
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(Error::from)
}

/// Enable foreign keys and apply any pending migrations.
///
/// All pending migrations run in one exclusive transaction, so a failed
/// migration leaves the database at its previous version.
///
/// # Errors
/// Returns an error if a migration fails.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // Has no effect inside a transaction.
    connection.pragma_update(None, "foreign_keys", true)?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;
    let current_version = schema_version(&transaction)?;

    for migration in MIGRATIONS
        .iter()
        .filter(|migration| migration.version > current_version)
    {
        tracing::info!(
            "Applying migration {}: {}",
            migration.version,
            migration.description
        );
        (migration.apply)(&transaction)?;
        transaction.pragma_update(None, "user_version", migration.version)?;
    }

    transaction.commit()?;

    Ok(())
}

/// Whether `error` is caused by a failed UNIQUE constraint.
pub fn is_unique_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(sql_error, _)
            if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Builds an `UPDATE ... RETURNING` statement that only sets the given columns.
#[derive(Debug)]
pub struct PartialUpdate {
    table: &'static str,
    assignments: Vec<String>,
    values: Vec<Value>,
    unique_violation: Option<Error>,
}

impl PartialUpdate {
    /// Start an update of `table`.
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            assignments: Vec::new(),
            values: Vec::new(),
            unique_violation: None,
        }
    }

    /// Report `error` instead of an SQL error if a UNIQUE constraint fails.
    pub fn on_unique_violation(&mut self, error: Error) -> &mut Self {
        self.unique_violation = Some(error);
        self
    }

    /// Set `column` to `value` if it is present.
    pub fn set<V: Into<Value>>(&mut self, column: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.values.push(value.into());
            self.assignments
                .push(format!("{column} = ?{}", self.values.len()));
        }

        self
    }

    /// Whether no column has been set.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Apply the update to the row with `id` and map the updated row.
    ///
    /// # Errors
    /// Returns [Error::NoFieldsToUpdate] if no column was set and
    /// [Error::NotFound] if there is no row with `id`.
    pub fn execute<T>(
        mut self,
        id: i64,
        returning: &str,
        connection: &Connection,
        map_row: impl FnOnce(&Row) -> Result<T, rusqlite::Error>,
    ) -> Result<T, Error> {
        if self.is_empty() {
            return Err(Error::NoFieldsToUpdate);
        }

        self.values.push(Value::Integer(id));
        let query = format!(
            "UPDATE \"{}\" SET {} WHERE id = ?{} RETURNING {returning}",
            self.table,
            self.assignments.join(", "),
            self.values.len()
        );

        let unique_violation = self.unique_violation;

        connection
            .query_row(&query, params_from_iter(self.values), map_row)
            .map_err(|error| match unique_violation {
                Some(unique_violation) if is_unique_violation(&error) => unique_violation,
                _ => error.into(),
            })
    }
}
