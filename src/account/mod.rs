//! Accounts hold money and carry a running balance.

mod core;
mod endpoints;

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::Connection;

use crate::AppState;

pub use core::{
    Account, AccountForm, AccountId, AccountKind, adjust_account_balance, create_account,
    create_account_table, get_account, get_total_account_balance,
};
pub use endpoints::{
    create_account_endpoint, delete_account_endpoint, get_account_balance_endpoint,
    get_account_endpoint, list_accounts_endpoint, update_account_endpoint,
};

/// The state needed by the account endpoints.
#[derive(Debug, Clone)]
pub struct AccountState {
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}
