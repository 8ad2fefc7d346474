//! Transaction management.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and the schema migrations for its table
//! - Recording transactions together with their cost breakdown and balance effect
//! - Filtering, paging and CSV export
//! - The JSON endpoints

mod core;
mod endpoints;
mod query;

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::Connection;

use crate::{AppState, PaginationConfig};

pub use core::{
    CreatedTransaction, NewTransaction, StoredCostComponent, Transaction, TransactionId,
    TransactionKind, add_budget_and_savings_goal_links, add_recurring_flag,
    create_cost_component_table, create_transaction, create_transaction_table, get_transaction,
};
pub(crate) use core::insert_transaction;
pub use endpoints::{
    create_transaction_endpoint, delete_transaction_endpoint, export_transactions_endpoint,
    get_transaction_breakdown_endpoint, get_transaction_endpoint, list_transactions_endpoint,
};
pub use query::{TransactionQuery, get_transactions};

/// The state needed by the transaction endpoints.
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The default and maximum page sizes.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}
