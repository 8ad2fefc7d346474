//! The transaction model, its schema and the operations that keep account
//! balances in step with it.

use std::collections::BTreeMap;

use rusqlite::{Connection, Row, params, types::Type};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    account::{AccountId, adjust_account_balance},
    asset::{AssetId, get_asset},
    category::CategoryId,
    cost_breakdown::{ComponentKind, CostBreakdown, UsageEvent, decompose},
    text_enum::text_enum,
    validation::Validator,
};

pub type TransactionId = i64;

text_enum! {
    /// Which way money moves.
    pub enum TransactionKind {
        /// Money coming into an account.
        Income => "income",
        /// Money leaving an account.
        Expense => "expense",
        /// Money moving between two accounts.
        Transfer => "transfer",
    }
}

/// Money moving into, out of or between accounts on a given day.
///
/// The amount is always positive, the kind decides the direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub date: Date,
    pub amount: f64,
    pub kind: TransactionKind,
    /// The account the money comes from (expenses, transfers) or goes to (income).
    pub account_id: AccountId,
    /// The account receiving a transfer.
    pub destination_account_id: Option<AccountId>,
    pub category_id: Option<CategoryId>,
    pub description: String,
    pub note: Option<String>,
    /// Whether the transaction was created from a recurring transaction.
    pub recurring: bool,
    pub budget_id: Option<i64>,
    pub savings_goal_id: Option<i64>,
    pub asset_id: Option<AssetId>,
}

impl Transaction {
    /// The change each affected account's balance sees from this transaction.
    pub fn balance_effect(&self) -> Vec<(AccountId, f64)> {
        match (self.kind, self.destination_account_id) {
            (TransactionKind::Income, _) => vec![(self.account_id, self.amount)],
            (TransactionKind::Expense, _) => vec![(self.account_id, -self.amount)],
            (TransactionKind::Transfer, Some(destination)) => vec![
                (self.account_id, -self.amount),
                (destination, self.amount),
            ],
            (TransactionKind::Transfer, None) => vec![(self.account_id, -self.amount)],
        }
    }
}

/// The data for recording a transaction.
///
/// If both `asset_id` and `usage` are given, the cost of the usage is broken
/// down and stored with the transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub date: Date,
    pub amount: f64,
    pub kind: TransactionKind,
    pub account_id: AccountId,
    #[serde(default)]
    pub destination_account_id: Option<AccountId>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub recurring: bool,
    #[serde(default)]
    pub budget_id: Option<i64>,
    #[serde(default)]
    pub savings_goal_id: Option<i64>,
    #[serde(default)]
    pub asset_id: Option<AssetId>,
    #[serde(default)]
    pub usage: Option<UsageEvent>,
}

impl NewTransaction {
    /// A transaction with no description, links or usage.
    pub fn new(date: Date, amount: f64, kind: TransactionKind, account_id: AccountId) -> Self {
        Self {
            date,
            amount,
            kind,
            account_id,
            destination_account_id: None,
            category_id: None,
            description: String::new(),
            note: None,
            recurring: false,
            budget_id: None,
            savings_goal_id: None,
            asset_id: None,
            usage: None,
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_owned();
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

    pub(crate) fn validate(&self) -> Result<(), Error> {
        let mut validator = Validator::default();
        validator.positive("amount", self.amount);

        match (self.kind, self.destination_account_id) {
            (TransactionKind::Transfer, None) => {
                validator.fail("a transfer needs a destination_account_id")
            }
            (TransactionKind::Transfer, Some(destination)) if destination == self.account_id => {
                validator.fail("a transfer needs a destination account other than account_id")
            }
            (TransactionKind::Income | TransactionKind::Expense, Some(_)) => {
                validator.fail("only transfers can have a destination_account_id")
            }
            _ => {}
        }

        if self.savings_goal_id.is_some() && self.kind != TransactionKind::Income {
            validator.fail("savings_goal_id can only be set on income");
        }
        if self.budget_id.is_some() && self.kind != TransactionKind::Expense {
            validator.fail("budget_id can only be set on expenses");
        }
        if self.usage.is_some() && self.asset_id.is_none() {
            validator.fail("usage needs an asset_id");
        }

        validator.finish()
    }
}

/// A newly recorded transaction and the breakdown stored with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedTransaction {
    pub transaction: Transaction,
    pub breakdown: Option<CostBreakdown>,
}

/// A cost component as stored against a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCostComponent {
    pub id: i64,
    pub transaction_id: TransactionId,
    pub asset_id: Option<AssetId>,
    pub name: String,
    pub kind: ComponentKind,
    pub value: f64,
    pub unit: String,
    pub percentage: f64,
    pub method: String,
    pub parameters: BTreeMap<String, f64>,
}

pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY,
            date TEXT NOT NULL,
            amount REAL NOT NULL CHECK (amount > 0),
            kind TEXT NOT NULL,
            account_id INTEGER NOT NULL REFERENCES account(id),
            destination_account_id INTEGER REFERENCES account(id),
            category_id INTEGER REFERENCES category(id),
            asset_id INTEGER REFERENCES asset(id),
            description TEXT NOT NULL DEFAULT '',
            note TEXT
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_date ON \"transaction\"(date)",
        (),
    )?;
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_account ON \"transaction\"(account_id)",
        (),
    )?;

    Ok(())
}

pub fn create_cost_component_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS cost_component (
            id INTEGER PRIMARY KEY,
            transaction_id INTEGER NOT NULL REFERENCES \"transaction\"(id) ON DELETE CASCADE,
            asset_id INTEGER REFERENCES asset(id),
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            value REAL NOT NULL,
            unit TEXT NOT NULL,
            percentage REAL NOT NULL,
            method TEXT NOT NULL,
            parameters TEXT NOT NULL DEFAULT '{}'
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_cost_component_transaction \
        ON cost_component(transaction_id)",
        (),
    )?;

    Ok(())
}

/// Link transactions to the budget they count against and the savings goal they pay into.
pub fn add_budget_and_savings_goal_links(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "ALTER TABLE \"transaction\" ADD COLUMN budget_id INTEGER REFERENCES budget(id) ON DELETE SET NULL;
        ALTER TABLE \"transaction\" ADD COLUMN savings_goal_id INTEGER REFERENCES savings_goal(id) ON DELETE SET NULL;
        CREATE INDEX IF NOT EXISTS idx_transaction_budget ON \"transaction\"(budget_id);
        CREATE INDEX IF NOT EXISTS idx_transaction_savings_goal ON \"transaction\"(savings_goal_id);",
    )
}

/// Mark transactions created from recurring transactions.
pub fn add_recurring_flag(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "ALTER TABLE \"transaction\" ADD COLUMN recurring INTEGER NOT NULL DEFAULT 0",
        (),
    )?;

    Ok(())
}

pub(super) const TRANSACTION_COLUMNS: &str = "id, date, amount, kind, account_id, \
    destination_account_id, category_id, description, note, recurring, budget_id, \
    savings_goal_id, asset_id";

pub(super) fn map_row_to_transaction(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        date: row.get(1)?,
        amount: row.get(2)?,
        kind: row.get(3)?,
        account_id: row.get(4)?,
        destination_account_id: row.get(5)?,
        category_id: row.get(6)?,
        description: row.get(7)?,
        note: row.get(8)?,
        recurring: row.get(9)?,
        budget_id: row.get(10)?,
        savings_goal_id: row.get(11)?,
        asset_id: row.get(12)?,
    })
}

fn map_row_to_cost_component(row: &Row) -> Result<StoredCostComponent, rusqlite::Error> {
    let raw_parameters: String = row.get(9)?;
    let parameters = serde_json::from_str(&raw_parameters).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(error))
    })?;

    Ok(StoredCostComponent {
        id: row.get(0)?,
        transaction_id: row.get(1)?,
        asset_id: row.get(2)?,
        name: row.get(3)?,
        kind: row.get(4)?,
        value: row.get(5)?,
        unit: row.get(6)?,
        percentage: row.get(7)?,
        method: row.get(8)?,
        parameters,
    })
}

/// Record a transaction, store its cost breakdown and apply its balance effect.
///
/// Everything happens in one SQL transaction: if any step fails nothing is
/// written.
///
/// # Errors
/// Returns [Error::InvalidInput] if the transaction is invalid,
/// [Error::InvalidForeignKey] if a referenced record does not exist and
/// [Error::InvalidBreakdown] if the usage does not fit the asset.
pub fn create_transaction(
    new_transaction: &NewTransaction,
    connection: &Connection,
) -> Result<CreatedTransaction, Error> {
    new_transaction.validate()?;

    let sql_transaction = connection.unchecked_transaction()?;

    let breakdown = match (&new_transaction.usage, new_transaction.asset_id) {
        (Some(usage), Some(asset_id)) => {
            let asset = get_asset(asset_id, &sql_transaction).map_err(|error| match error {
                Error::NotFound => Error::InvalidForeignKey,
                error => error,
            })?;

            // A trip without its own date happened on the day of the transaction.
            Some(decompose(&asset, usage, new_transaction.date)?)
        }
        _ => None,
    };

    let transaction = insert_transaction(new_transaction, breakdown.as_ref(), &sql_transaction)?;

    sql_transaction.commit()?;

    Ok(CreatedTransaction {
        transaction,
        breakdown,
    })
}

/// Insert a transaction and apply its balance effect without opening an SQL
/// transaction, so callers can group it with other writes.
pub(crate) fn insert_transaction(
    new_transaction: &NewTransaction,
    breakdown: Option<&CostBreakdown>,
    connection: &Connection,
) -> Result<Transaction, Error> {
    new_transaction.validate()?;

    let transaction = connection.query_row(
        &format!(
            "INSERT INTO \"transaction\" (date, amount, kind, account_id, destination_account_id, \
            category_id, description, note, recurring, budget_id, savings_goal_id, asset_id) \
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12) \
            RETURNING {TRANSACTION_COLUMNS}"
        ),
        params![
            new_transaction.date,
            new_transaction.amount,
            new_transaction.kind,
            new_transaction.account_id,
            new_transaction.destination_account_id,
            new_transaction.category_id,
            new_transaction.description,
            new_transaction.note,
            new_transaction.recurring,
            new_transaction.budget_id,
            new_transaction.savings_goal_id,
            new_transaction.asset_id,
        ],
        map_row_to_transaction,
    )?;

    if let Some(breakdown) = breakdown {
        store_breakdown(transaction.id, breakdown, connection)?;
    }

    for (account_id, delta) in transaction.balance_effect() {
        adjust_account_balance(account_id, delta, connection)?;
    }

    tracing::debug!(
        "Recorded {} {} of {} on account {}",
        transaction.kind,
        transaction.id,
        transaction.amount,
        transaction.account_id
    );

    Ok(transaction)
}

fn store_breakdown(
    transaction_id: TransactionId,
    breakdown: &CostBreakdown,
    connection: &Connection,
) -> Result<(), Error> {
    let mut statement = connection.prepare(
        "INSERT INTO cost_component \
        (transaction_id, asset_id, name, kind, value, unit, percentage, method, parameters) \
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?;

    for component in breakdown.components() {
        let parameters = serde_json::to_string(component.parameters())
            .map_err(|error| Error::JSONSerializationError(error.to_string()))?;

        statement.execute(params![
            transaction_id,
            breakdown.asset_id(),
            component.name(),
            component.kind(),
            component.value(),
            component.unit(),
            component.percentage(),
            component.method(),
            parameters,
        ])?;
    }

    Ok(())
}

pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    connection
        .query_row(
            &format!("SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = ?1"),
            [id],
            map_row_to_transaction,
        )
        .map_err(Error::from)
}

/// Get the cost components stored with a transaction, in the order they were computed.
///
/// # Errors
/// Returns [Error::NotFound] if the transaction does not exist.
pub fn get_transaction_breakdown(
    id: TransactionId,
    connection: &Connection,
) -> Result<Vec<StoredCostComponent>, Error> {
    get_transaction(id, connection)?;

    connection
        .prepare(
            "SELECT id, transaction_id, asset_id, name, kind, value, unit, percentage, method, \
            parameters FROM cost_component WHERE transaction_id = ?1 ORDER BY id",
        )?
        .query_map([id], map_row_to_cost_component)?
        .map(|maybe_component| maybe_component.map_err(Error::from))
        .collect()
}

/// Delete a transaction and its stored breakdown and undo its balance effect.
///
/// # Errors
/// Returns [Error::NotFound] if the transaction does not exist.
pub fn delete_transaction(id: TransactionId, connection: &Connection) -> Result<(), Error> {
    let sql_transaction = connection.unchecked_transaction()?;

    let transaction = get_transaction(id, &sql_transaction)?;

    for (account_id, delta) in transaction.balance_effect() {
        adjust_account_balance(account_id, -delta, &sql_transaction)?;
    }

    sql_transaction.execute("DELETE FROM \"transaction\" WHERE id = ?1", [id])?;
    sql_transaction.commit()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        account::{AccountForm, AccountKind, create_account, get_account},
        asset::{AssetCategory, AssetForm, FuelType, create_asset},
        cost_breakdown::{ComponentKind, PeriodUsage, TripUsage, UsageEvent},
        db::initialize,
        transaction::core::{
            NewTransaction, TransactionKind, create_transaction, delete_transaction,
            get_transaction, get_transaction_breakdown,
        },
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    fn create_test_account(name: &str, balance: f64, connection: &Connection) -> i64 {
        create_account(
            &AccountForm {
                balance,
                ..AccountForm::new(name, AccountKind::Checking)
            },
            connection,
        )
        .unwrap()
        .id
    }

    #[track_caller]
    fn assert_balance(account_id: i64, want: f64, connection: &Connection) {
        let got = get_account(account_id, connection).unwrap().balance;
        assert!(
            (got - want).abs() < 1e-9,
            "want balance {want} for account {account_id}, got {got}"
        );
    }

    fn create_test_car(connection: &Connection) -> i64 {
        let form = AssetForm {
            purchase_date: Some(date!(2020 - 01 - 01)),
            purchase_price: Some(20_000.0),
            fuel_type: Some(FuelType::Petrol),
            consumption_per_100km: Some(5.5),
            ..AssetForm::new("Car", AssetCategory::Vehicle)
        };

        create_asset(&form, connection).unwrap().id
    }

    #[test]
    fn income_and_expense_change_balance() {
        let connection = get_test_connection();
        let account = create_test_account("Main", 100.0, &connection);

        create_transaction(
            &NewTransaction::new(date!(2025 - 03 - 01), 50.0, TransactionKind::Income, account),
            &connection,
        )
        .unwrap();
        create_transaction(
            &NewTransaction::new(date!(2025 - 03 - 02), 20.25, TransactionKind::Expense, account),
            &connection,
        )
        .unwrap();

        assert_balance(account, 129.75, &connection);
    }

    #[test]
    fn transfer_moves_money_between_accounts() {
        let connection = get_test_connection();
        let main = create_test_account("Main", 100.0, &connection);
        let savings = create_test_account("Savings", 0.0, &connection);

        create_transaction(
            &NewTransaction::new(date!(2025 - 03 - 01), 40.0, TransactionKind::Transfer, main)
                .destination(savings),
            &connection,
        )
        .unwrap();

        assert_balance(main, 60.0, &connection);
        assert_balance(savings, 40.0, &connection);
    }

    #[test]
    fn rejects_invalid_transactions() {
        let connection = get_test_connection();
        let main = create_test_account("Main", 0.0, &connection);
        let day = date!(2025 - 03 - 01);

        let cases = [
            NewTransaction::new(day, 0.0, TransactionKind::Expense, main),
            NewTransaction::new(day, 10.0, TransactionKind::Transfer, main),
            NewTransaction::new(day, 10.0, TransactionKind::Transfer, main).destination(main),
            NewTransaction {
                savings_goal_id: Some(1),
                ..NewTransaction::new(day, 10.0, TransactionKind::Expense, main)
            },
            NewTransaction {
                budget_id: Some(1),
                ..NewTransaction::new(day, 10.0, TransactionKind::Income, main)
            },
        ];

        for case in cases {
            let got = create_transaction(&case, &connection);
            assert!(
                matches!(got, Err(Error::InvalidInput(_))),
                "want invalid input for {case:?}, got {got:?}"
            );
        }
        assert_balance(main, 0.0, &connection);
    }

    #[test]
    fn unknown_account_is_invalid_foreign_key() {
        let connection = get_test_connection();

        let got = create_transaction(
            &NewTransaction::new(date!(2025 - 03 - 01), 10.0, TransactionKind::Expense, 99),
            &connection,
        );

        assert_eq!(got, Err(Error::InvalidForeignKey));
    }

    #[test]
    fn stores_breakdown_for_trip() {
        let connection = get_test_connection();
        let account = create_test_account("Main", 0.0, &connection);
        let car = create_test_car(&connection);

        let created = create_transaction(
            &NewTransaction {
                asset_id: Some(car),
                usage: Some(UsageEvent::Trip(TripUsage {
                    distance_km: 100.0,
                    fuel_price_per_litre: 2.0,
                    date: None,
                })),
                ..NewTransaction::new(date!(2025 - 01 - 01), 30.0, TransactionKind::Expense, account)
            },
            &connection,
        )
        .unwrap();

        let breakdown = created.breakdown.expect("trip should have a breakdown");
        assert_eq!(breakdown.component(ComponentKind::Fuel).unwrap().value(), 11.0);

        let stored = get_transaction_breakdown(created.transaction.id, &connection).unwrap();
        assert_eq!(stored.len(), breakdown.components().len());
        assert_eq!(stored[0].kind, ComponentKind::Fuel);
        assert_eq!(stored[0].parameters.get("litres_consumed"), Some(&5.5));
        assert_eq!(stored[0].asset_id, Some(car));
    }

    #[test]
    fn failed_breakdown_writes_nothing() {
        let connection = get_test_connection();
        let account = create_test_account("Main", 0.0, &connection);
        let car = create_test_car(&connection);

        let got = create_transaction(
            &NewTransaction {
                asset_id: Some(car),
                usage: Some(UsageEvent::Period(PeriodUsage {
                    days: 30,
                    kwh_price: 0.3,
                    actual_total_hours: None,
                })),
                ..NewTransaction::new(date!(2025 - 01 - 01), 30.0, TransactionKind::Expense, account)
            },
            &connection,
        );

        assert!(matches!(got, Err(Error::InvalidBreakdown(_))));
        let count: i64 = connection
            .query_row("SELECT COUNT(*) FROM \"transaction\"", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
        assert_balance(account, 0.0, &connection);
    }

    #[test]
    fn delete_restores_balance_and_removes_breakdown() {
        let connection = get_test_connection();
        let main = create_test_account("Main", 100.0, &connection);
        let savings = create_test_account("Savings", 0.0, &connection);
        let car = create_test_car(&connection);
        let trip = create_transaction(
            &NewTransaction {
                asset_id: Some(car),
                usage: Some(UsageEvent::Trip(TripUsage {
                    distance_km: 10.0,
                    fuel_price_per_litre: 1.8,
                    date: None,
                })),
                ..NewTransaction::new(date!(2025 - 02 - 01), 5.0, TransactionKind::Expense, main)
            },
            &connection,
        )
        .unwrap()
        .transaction;
        let transfer = create_transaction(
            &NewTransaction::new(date!(2025 - 02 - 02), 25.0, TransactionKind::Transfer, main)
                .destination(savings),
            &connection,
        )
        .unwrap()
        .transaction;

        delete_transaction(trip.id, &connection).unwrap();
        delete_transaction(transfer.id, &connection).unwrap();

        assert_balance(main, 100.0, &connection);
        assert_balance(savings, 0.0, &connection);
        assert_eq!(get_transaction(trip.id, &connection), Err(Error::NotFound));
        let components: i64 = connection
            .query_row("SELECT COUNT(*) FROM cost_component", [], |row| row.get(0))
            .unwrap();
        assert_eq!(components, 0);
        assert_eq!(delete_transaction(trip.id, &connection), Err(Error::NotFound));
    }
}
