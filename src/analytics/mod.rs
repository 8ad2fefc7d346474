//! The dashboard: headline figures and summaries for a month.

mod dashboard;
mod endpoints;

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::Connection;

use crate::AppState;

pub use dashboard::{CategoryTotal, Dashboard, Kpis, get_dashboard};
pub use endpoints::get_dashboard_endpoint;

/// The state needed by the analytics endpoints.
#[derive(Debug, Clone)]
pub struct AnalyticsState {
    /// The database connection for reading the figures.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The timezone used to decide which month is the current one.
    pub local_timezone: String,
}

impl FromRef<AppState> for AnalyticsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}
