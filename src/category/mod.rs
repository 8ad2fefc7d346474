//! Income and expense categories.
//!
//! System categories are seeded by a migration and cannot be changed or
//! deleted. A user-defined category can only be deleted while no transaction,
//! budget or recurring transaction refers to it.

mod core;
mod endpoints;

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::Connection;

use crate::AppState;

pub use core::{
    Category, CategoryForm, CategoryId, CategoryKind, create_category, create_category_table,
    get_category, get_category_by_name, seed_system_categories,
};
pub use endpoints::{
    create_category_endpoint, delete_category_endpoint, get_category_endpoint,
    get_category_usage_endpoint, list_categories_endpoint, update_category_endpoint,
};

/// The state needed by the category endpoints.
#[derive(Debug, Clone)]
pub struct CategoryState {
    /// The database connection for managing categories.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}
