//! Recurring transactions.
//!
//! A recurring transaction is a template that creates a transaction on every
//! occurrence of its schedule. Nothing runs in the background here:
//! transactions are created when a template is run by hand or when
//! [catch_up_recurring_transactions] is called, which the server does at
//! start-up and optionally on an interval.

mod core;
mod endpoints;
mod run;
mod schedule;

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::Connection;

use crate::{AppState, PaginationConfig};

pub use core::{
    RecurringForm, RecurringId, RecurringTransaction, create_recurring_transaction,
    create_recurring_transaction_table,
};
pub use endpoints::{
    catch_up_endpoint, create_recurring_endpoint, delete_recurring_endpoint,
    get_recurring_endpoint, list_recurring_endpoint, run_recurring_endpoint,
    toggle_recurring_endpoint, update_recurring_endpoint,
};
pub use run::{CatchUpReport, catch_up_recurring_transactions};
pub use schedule::Frequency;

/// The state needed by the recurring transaction endpoints.
#[derive(Debug, Clone)]
pub struct RecurringState {
    /// The database connection for managing recurring transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The timezone used to decide what today is.
    pub local_timezone: String,
    /// The default and maximum page sizes.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for RecurringState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}
