//! Lume Finance is a backend for tracking personal finances.
//!
//! It keeps accounts, categorised transactions, budgets, savings goals and
//! recurring transactions in a SQLite database and serves them as a JSON API.
//!
//! The [cost_breakdown] module decomposes what it costs to use a physical
//! asset, e.g. a car trip or a month of running a fridge, into components
//! such as fuel, wear and amortization.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod account;
mod analytics;
mod app_state;
mod asset;
mod budget;
mod category;
pub mod cost_breakdown;
mod db;
mod endpoints;
mod extract;
mod logging;
mod month;
mod pagination;
mod recurring;
mod routing;
mod savings_goal;
mod text_enum;
mod timezone;
mod transaction;
mod validation;

pub use account::{Account, AccountForm, AccountKind, create_account};
pub use app_state::AppState;
pub use asset::{Asset, AssetCategory, AssetForm, FuelType, create_asset};
pub use budget::{BudgetForm, BudgetPeriod, create_budget};
pub use category::{CategoryKind, get_category_by_name};
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use pagination::PaginationConfig;
pub use recurring::{
    CatchUpReport, Frequency, RecurringForm, catch_up_recurring_transactions,
    create_recurring_transaction,
};
pub use routing::{build_router, cors_layer};
pub use savings_goal::{SavingsGoalForm, create_savings_goal};
pub use timezone::local_today;
pub use transaction::{NewTransaction, TransactionKind, create_transaction};

use crate::cost_breakdown::BreakdownError;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("Could not listen for ctrl+c: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!("Could not listen for the terminate signal: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
        },
    }

    handle.graceful_shutdown(Some(Duration::from_secs(1)));
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The request data failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The request body or query string could not be parsed.
    #[error("could not parse the request: {0}")]
    InvalidRequest(String),

    /// A cost breakdown could not be computed for the asset and usage.
    #[error("could not compute the cost breakdown: {0}")]
    InvalidBreakdown(BreakdownError),

    /// A partial update did not contain any fields.
    #[error("the update did not contain any fields to change")]
    NoFieldsToUpdate,

    /// An ID referred to an account, category, asset, budget or savings goal
    /// that does not exist.
    #[error("a referenced account, category, asset, budget or savings goal does not exist")]
    InvalidForeignKey,

    /// The specified account name already exists in the database.
    #[error("the account \"{0}\" already exists in the database")]
    DuplicateAccountName(String),

    /// A category with the same name and kind already exists.
    #[error("the category \"{0}\" already exists in the database")]
    DuplicateCategory(String),

    /// System categories cannot be changed or deleted.
    #[error("system categories cannot be modified or deleted")]
    SystemCategory,

    /// The category is referenced and cannot be deleted.
    #[error("the category is still used by {0}")]
    CategoryInUse(String),

    /// Only one active budget may exist per category.
    #[error("an active budget already exists for category {0}")]
    ActiveBudgetExists(i64),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// An error occurred while writing CSV.
    #[error("could not write CSV: {0}")]
    CsvError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            rusqlite::Error::SqliteFailure(sql_error, _)
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                Error::InvalidForeignKey
            }
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<BreakdownError> for Error {
    fn from(value: BreakdownError) -> Self {
        Error::InvalidBreakdown(value)
    }
}

impl From<JsonRejection> for Error {
    fn from(value: JsonRejection) -> Self {
        Error::InvalidRequest(value.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(value: QueryRejection) -> Self {
        Error::InvalidRequest(value.body_text())
    }
}

impl Error {
    /// The HTTP status code that best describes the error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::InvalidInput(_)
            | Error::InvalidRequest(_)
            | Error::InvalidBreakdown(_)
            | Error::NoFieldsToUpdate
            | Error::InvalidForeignKey => StatusCode::BAD_REQUEST,
            Error::SystemCategory => StatusCode::FORBIDDEN,
            Error::DuplicateAccountName(_)
            | Error::DuplicateCategory(_)
            | Error::CategoryInUse(_)
            | Error::ActiveBudgetExists(_) => StatusCode::CONFLICT,
            Error::SqlError(_)
            | Error::DatabaseLockError
            | Error::InvalidTimezoneError(_)
            | Error::JSONSerializationError(_)
            | Error::CsvError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match self {
            Error::InvalidTimezoneError(timezone) => format!(
                "Could not get local timezone \"{timezone}\". Check your server settings and \
                ensure the timezone has been set to valid, canonical timezone string"
            ),
            // Internal errors are logged but not shown to the client.
            error if status.is_server_error() => {
                tracing::error!("An unexpected error occurred: {}", error);
                "An unexpected error occurred, check the server logs for more details.".to_owned()
            }
            error => error.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
