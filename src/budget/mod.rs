//! Per-category budgets and how much of them has been spent.

mod core;
mod endpoints;
mod status;

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::Connection;

use crate::AppState;

pub use core::{
    Budget, BudgetForm, BudgetId, BudgetPeriod, create_budget, create_budget_table,
};
pub use endpoints::{
    create_budget_endpoint, delete_budget_endpoint, get_budget_endpoint,
    get_budget_summary_endpoint, list_budgets_endpoint, update_budget_endpoint,
};
pub use status::{BudgetSpending, BudgetStatus, get_budget_spending};

/// The state needed by the budget endpoints.
#[derive(Debug, Clone)]
pub struct BudgetState {
    /// The database connection for managing budgets.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The timezone used to decide which month is the current one.
    pub local_timezone: String,
}

impl FromRef<AppState> for BudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}
