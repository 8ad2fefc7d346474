//! Defines the JSON endpoints for managing accounts.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{
    Error,
    account::{
        AccountState,
        core::{
            Account, AccountBalance, AccountForm, AccountId, AccountUpdate, create_account,
            deactivate_account, get_account, get_account_balance, get_accounts, update_account,
        },
    },
    app_state::lock_connection,
    extract::{ApiJson, ApiQuery},
};

/// The query for listing accounts.
#[derive(Debug, Default, Deserialize)]
pub struct AccountQuery {
    /// Include soft-deleted accounts.
    #[serde(default)]
    pub include_inactive: bool,
}

/// A route handler for listing accounts ordered by name.
pub async fn list_accounts_endpoint(
    State(state): State<AccountState>,
    ApiQuery(query): ApiQuery<AccountQuery>,
) -> Result<Json<Vec<Account>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_accounts(query.include_inactive, &connection).map(Json)
}

/// A route handler for getting a single account.
pub async fn get_account_endpoint(
    State(state): State<AccountState>,
    Path(account_id): Path<AccountId>,
) -> Result<Json<Account>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_account(account_id, &connection).map(Json)
}

/// A route handler for creating a new account.
pub async fn create_account_endpoint(
    State(state): State<AccountState>,
    ApiJson(form): ApiJson<AccountForm>,
) -> Result<(StatusCode, Json<Account>), Error> {
    let connection = lock_connection(&state.db_connection)?;

    let account = create_account(&form, &connection).inspect_err(|error| {
        tracing::warn!("Could not create account with {form:?}: {error}");
    })?;

    Ok((StatusCode::CREATED, Json(account)))
}

/// A route handler for changing some fields of an account.
pub async fn update_account_endpoint(
    State(state): State<AccountState>,
    Path(account_id): Path<AccountId>,
    ApiJson(update): ApiJson<AccountUpdate>,
) -> Result<Json<Account>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    update_account(account_id, &update, &connection).map(Json)
}

/// A route handler for soft deleting an account.
pub async fn delete_account_endpoint(
    State(state): State<AccountState>,
    Path(account_id): Path<AccountId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    deactivate_account(account_id, &connection)?;
    tracing::info!("Deactivated account {account_id}");

    Ok(StatusCode::NO_CONTENT)
}

/// A route handler for the balance of an account.
pub async fn get_account_balance_endpoint(
    State(state): State<AccountState>,
    Path(account_id): Path<AccountId>,
) -> Result<Json<AccountBalance>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_account_balance(account_id, &connection).map(Json)
}
