//! Savings goals and contributions towards them.

mod core;
mod endpoints;

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::Connection;

use crate::AppState;

pub use core::{
    SavingsGoal, SavingsGoalForm, SavingsGoalId, create_savings_goal, create_savings_goal_table,
    get_savings_goals,
};
pub use endpoints::{
    contribute_endpoint, create_savings_goal_endpoint, delete_savings_goal_endpoint,
    get_savings_goal_endpoint, list_savings_goals_endpoint, update_savings_goal_endpoint,
    withdraw_endpoint,
};

/// The state needed by the savings goal endpoints.
#[derive(Debug, Clone)]
pub struct SavingsGoalState {
    /// The database connection for managing savings goals.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SavingsGoalState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}
