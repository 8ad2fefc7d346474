use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    db::{PartialUpdate, is_unique_violation},
    text_enum::text_enum,
    validation::Validator,
};

pub type AccountId = i64;

/// The currency new accounts use when none is given.
pub const DEFAULT_CURRENCY: &str = "EUR";

text_enum! {
    /// The kind of account.
    pub enum AccountKind {
        /// An everyday bank account.
        Checking => "checking",
        /// A savings account.
        Savings => "savings",
        /// A credit card, usually with a negative balance.
        CreditCard => "credit_card",
        /// Cash in hand.
        Cash => "cash",
        /// A brokerage or investment account.
        Investment => "investment",
    }
}

/// A place money is kept, e.g. a bank account or a wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// The id for the account.
    pub id: AccountId,
    /// The unique name of the account.
    pub name: String,
    /// The kind of account.
    pub kind: AccountKind,
    /// The balance, updated by every transaction on the account.
    pub balance: f64,
    /// The ISO currency code.
    pub currency: String,
    /// Free text.
    pub description: Option<String>,
    /// Inactive accounts are hidden from lists by default.
    pub active: bool,
}

/// The data for creating an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountForm {
    /// The unique name of the account.
    pub name: String,
    /// The kind of account.
    pub kind: AccountKind,
    /// The opening balance.
    #[serde(default)]
    pub balance: f64,
    /// The ISO currency code, EUR if not given.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Free text.
    #[serde(default)]
    pub description: Option<String>,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_owned()
}

impl AccountForm {
    /// A form for an account with a zero balance in the default currency.
    pub fn new(name: &str, kind: AccountKind) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            balance: 0.0,
            currency: default_currency(),
            description: None,
        }
    }
}

/// The fields of an account that can be changed. Missing fields are left as is.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub kind: Option<AccountKind>,
    /// Overwrites the balance, e.g. to reconcile with a bank statement.
    pub balance: Option<f64>,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub active: Option<bool>,
}

/// The balance of a single account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub account_id: AccountId,
    pub balance: f64,
    pub currency: String,
}

pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            kind TEXT NOT NULL,
            balance REAL NOT NULL DEFAULT 0,
            currency TEXT NOT NULL DEFAULT 'EUR',
            description TEXT,
            active INTEGER NOT NULL DEFAULT 1
        )",
        (),
    )?;

    Ok(())
}

const ACCOUNT_COLUMNS: &str = "id, name, kind, balance, currency, description, active";

pub fn map_row_to_account(row: &Row) -> Result<Account, rusqlite::Error> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
        balance: row.get(3)?,
        currency: row.get(4)?,
        description: row.get(5)?,
        active: row.get(6)?,
    })
}

fn validate_currency(validator: &mut Validator, currency: &str) {
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
        validator.fail(format!(
            "currency must be a three letter ISO code, got \"{currency}\""
        ));
    }
}

/// Create a new account.
///
/// # Errors
/// Returns [Error::DuplicateAccountName] if an account with the same name
/// exists, or [Error::InvalidInput] if the form is invalid.
pub fn create_account(form: &AccountForm, connection: &Connection) -> Result<Account, Error> {
    let mut validator = Validator::default();
    validator.not_blank("name", &form.name);
    validator.finite("balance", form.balance);
    validate_currency(&mut validator, &form.currency);
    validator.finish()?;

    let name = form.name.trim();

    connection
        .query_row(
            &format!(
                "INSERT INTO account (name, kind, balance, currency, description) \
                VALUES (?1, ?2, ?3, ?4, ?5) \
                RETURNING {ACCOUNT_COLUMNS}"
            ),
            params![name, form.kind, form.balance, form.currency, form.description],
            map_row_to_account,
        )
        .map_err(|error| {
            if is_unique_violation(&error) {
                Error::DuplicateAccountName(name.to_owned())
            } else {
                error.into()
            }
        })
}

/// Get an account by its ID, including inactive accounts.
pub fn get_account(id: AccountId, connection: &Connection) -> Result<Account, Error> {
    connection
        .query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = ?1"),
            [id],
            map_row_to_account,
        )
        .map_err(Error::from)
}

/// List accounts ordered by name.
pub fn get_accounts(include_inactive: bool, connection: &Connection) -> Result<Vec<Account>, Error> {
    let where_clause = if include_inactive { "" } else { "WHERE active = 1" };

    connection
        .prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account {where_clause} ORDER BY name"
        ))?
        .query_map([], map_row_to_account)?
        .map(|maybe_account| maybe_account.map_err(Error::from))
        .collect()
}

/// Change the given fields of an account.
///
/// # Errors
/// Returns [Error::NoFieldsToUpdate] if `update` is empty, [Error::NotFound]
/// if the account does not exist and [Error::DuplicateAccountName] if the new
/// name is taken.
pub fn update_account(
    id: AccountId,
    update: &AccountUpdate,
    connection: &Connection,
) -> Result<Account, Error> {
    let mut validator = Validator::default();
    if let Some(name) = &update.name {
        validator.not_blank("name", name);
    }
    validator.finite("balance", update.balance);
    if let Some(currency) = &update.currency {
        validate_currency(&mut validator, currency);
    }
    validator.finish()?;

    let name = update.name.as_deref().map(str::trim);
    let mut statement = PartialUpdate::new("account");
    statement
        .set("name", name.map(str::to_owned))
        .set("kind", update.kind.map(|kind| kind.as_str().to_owned()))
        .set("balance", update.balance)
        .set("currency", update.currency.clone())
        .set("description", update.description.clone())
        .set("active", update.active)
        .on_unique_violation(Error::DuplicateAccountName(
            name.unwrap_or_default().to_owned(),
        ));

    statement.execute(id, ACCOUNT_COLUMNS, connection, map_row_to_account)
}

/// Soft delete an account so its transactions keep their reference.
pub fn deactivate_account(id: AccountId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("UPDATE account SET active = 0 WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Get the balance and currency of an account.
pub fn get_account_balance(id: AccountId, connection: &Connection) -> Result<AccountBalance, Error> {
    connection
        .query_row(
            "SELECT id, balance, currency FROM account WHERE id = ?1",
            [id],
            |row| {
                Ok(AccountBalance {
                    account_id: row.get(0)?,
                    balance: row.get(1)?,
                    currency: row.get(2)?,
                })
            },
        )
        .map_err(Error::from)
}

/// Add `delta` to the balance of an account. Use a negative `delta` to subtract.
///
/// # Errors
/// Returns [Error::NotFound] if the account does not exist.
pub fn adjust_account_balance(
    id: AccountId,
    delta: f64,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE account SET balance = balance + ?1 WHERE id = ?2",
        params![delta, id],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Get the total balance across all active accounts.
///
/// # Errors
/// Returns [Error] if:
/// - Database connection fails
/// - SQL query preparation or execution fails
pub fn get_total_account_balance(connection: &Connection) -> Result<f64, Error> {
    let mut stmt =
        connection.prepare("SELECT COALESCE(SUM(balance), 0) FROM account WHERE active = 1")?;

    let total: f64 = stmt.query_row([], |row| row.get(0))?;

    Ok(total)
}



#[cfg(test)]
mod get_total_account_balance_tests {
    use rusqlite::Connection;

    use super::{create_account_table, get_total_account_balance};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_account_table(&conn).unwrap();
        conn
    }

    #[test]
    fn returns_sum_of_active_accounts() {
        let conn = get_test_connection();

        for (name, balance, active) in [
            ("Account 1", 100.50, true),
            ("Account 2", 250.75, true),
            ("Account 3", -50.25, true),
            ("Closed", 1_000.0, false),
        ] {
            conn.execute(
                "INSERT INTO account (name, kind, balance, active) VALUES (?1, 'checking', ?2, ?3)",
                (name, balance, active),
            )
            .unwrap();
        }

        let result = get_total_account_balance(&conn).unwrap();

        assert_eq!(result, 301.0);
    }

    #[test]
    fn returns_zero_for_no_accounts() {
        let conn = get_test_connection();

        let result = get_total_account_balance(&conn).unwrap();

        assert_eq!(result, 0.0);
    }
}
