//! The JSON endpoints for transactions.

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};

use crate::{
    Error,
    app_state::lock_connection,
    extract::{ApiJson, ApiQuery},
    pagination::Paged,
    transaction::{
        TransactionState,
        core::{
            CreatedTransaction, NewTransaction, StoredCostComponent, Transaction, TransactionId,
            create_transaction, delete_transaction, get_transaction, get_transaction_breakdown,
        },
        query::{TransactionQuery, export_transactions_csv, get_transactions},
    },
};

/// A route handler for one page of transactions matching the query's filters.
pub async fn list_transactions_endpoint(
    State(state): State<TransactionState>,
    ApiQuery(query): ApiQuery<TransactionQuery>,
) -> Result<Json<Paged<Transaction>>, Error> {
    let page = state
        .pagination_config
        .resolve(query.page, query.per_page)?;
    let connection = lock_connection(&state.db_connection)?;

    get_transactions(&query, page, &connection).map(Json)
}

pub async fn get_transaction_endpoint(
    State(state): State<TransactionState>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<Transaction>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_transaction(transaction_id, &connection).map(Json)
}

/// A route handler for recording a transaction.
///
/// Responds with the transaction and, if the request named an asset and its
/// usage, the cost breakdown that was stored with it.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    ApiJson(new_transaction): ApiJson<NewTransaction>,
) -> Result<(StatusCode, Json<CreatedTransaction>), Error> {
    let connection = lock_connection(&state.db_connection)?;

    let created = create_transaction(&new_transaction, &connection).inspect_err(|error| {
        tracing::warn!("Could not create transaction: {error}");
    })?;

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_transaction_breakdown_endpoint(
    State(state): State<TransactionState>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<Vec<StoredCostComponent>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_transaction_breakdown(transaction_id, &connection).map(Json)
}

/// A route handler for deleting a transaction, which also undoes its effect
/// on account balances.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_transaction(transaction_id, &connection)?;
    tracing::info!("Deleted transaction {transaction_id}");

    Ok(StatusCode::NO_CONTENT)
}

/// A route handler for downloading the transactions matching the query's
/// filters as a CSV file.
pub async fn export_transactions_endpoint(
    State(state): State<TransactionState>,
    ApiQuery(query): ApiQuery<TransactionQuery>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let csv = export_transactions_csv(&query, &connection)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"transactions.csv\"",
            ),
        ],
        csv,
    ))
}
