//! Physical assets and the endpoints that break down what using them costs.

mod core;
mod cost_endpoints;
mod endpoints;

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::Connection;

use crate::AppState;

pub use core::{
    Asset, AssetCategory, AssetForm, AssetId, AssetQuery, FuelType, create_asset,
    create_asset_table, get_asset,
};
pub use cost_endpoints::{
    allocate_by_appliances_endpoint, allocate_by_weights_endpoint, monthly_cost_endpoint,
    period_cost_endpoint, trip_cost_endpoint,
};
pub use endpoints::{
    create_asset_endpoint, delete_asset_endpoint, get_asset_endpoint, list_assets_endpoint,
    update_asset_endpoint,
};

/// The state needed by the asset endpoints.
#[derive(Debug, Clone)]
pub struct AssetState {
    /// The database connection for managing assets.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The timezone used to decide what "today" is for trips without a date.
    pub local_timezone: String,
}

impl FromRef<AppState> for AssetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}
