use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    Error,
    app_state::lock_connection,
    extract::{ApiJson, ApiQuery},
    pagination::Paged,
    recurring::{
        RecurringState,
        core::{
            RecurringForm, RecurringId, RecurringQuery, RecurringTransaction,
            create_recurring_transaction, delete_recurring_transaction,
            get_recurring_transaction, get_recurring_transactions, toggle_recurring_transaction,
            update_recurring_transaction,
        },
        run::{CatchUpReport, RunResult, catch_up_recurring_transactions, run_recurring_transaction},
    },
    timezone::local_today,
};

pub async fn list_recurring_endpoint(
    State(state): State<RecurringState>,
    ApiQuery(query): ApiQuery<RecurringQuery>,
) -> Result<Json<Paged<RecurringTransaction>>, Error> {
    let page = state.pagination_config.resolve(query.page, query.per_page)?;
    let connection = lock_connection(&state.db_connection)?;

    get_recurring_transactions(&query, page, &connection).map(Json)
}

pub async fn get_recurring_endpoint(
    State(state): State<RecurringState>,
    Path(recurring_id): Path<RecurringId>,
) -> Result<Json<RecurringTransaction>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_recurring_transaction(recurring_id, &connection).map(Json)
}

pub async fn create_recurring_endpoint(
    State(state): State<RecurringState>,
    ApiJson(form): ApiJson<RecurringForm>,
) -> Result<(StatusCode, Json<RecurringTransaction>), Error> {
    let today = local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    let template = create_recurring_transaction(&form, today, &connection)?;
    tracing::info!(
        "Created {} recurring transaction {} \"{}\", next due {}",
        template.frequency,
        template.id,
        template.description,
        template.next_date
    );

    Ok((StatusCode::CREATED, Json(template)))
}

/// A route handler for replacing a recurring transaction.
pub async fn update_recurring_endpoint(
    State(state): State<RecurringState>,
    Path(recurring_id): Path<RecurringId>,
    ApiJson(form): ApiJson<RecurringForm>,
) -> Result<Json<RecurringTransaction>, Error> {
    let today = local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    update_recurring_transaction(recurring_id, &form, today, &connection).map(Json)
}

pub async fn delete_recurring_endpoint(
    State(state): State<RecurringState>,
    Path(recurring_id): Path<RecurringId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_recurring_transaction(recurring_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_recurring_endpoint(
    State(state): State<RecurringState>,
    Path(recurring_id): Path<RecurringId>,
) -> Result<Json<RecurringTransaction>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let template = toggle_recurring_transaction(recurring_id, &connection)?;
    tracing::info!(
        "Recurring transaction {} is now {}",
        template.id,
        if template.active { "active" } else { "paused" }
    );

    Ok(Json(template))
}

/// A route handler for creating the transaction of a recurring transaction now.
pub async fn run_recurring_endpoint(
    State(state): State<RecurringState>,
    Path(recurring_id): Path<RecurringId>,
) -> Result<Json<RunResult>, Error> {
    let today = local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    run_recurring_transaction(recurring_id, today, &connection).map(Json)
}

/// A route handler for creating every transaction that recurring
/// transactions should have created up to today.
pub async fn catch_up_endpoint(
    State(state): State<RecurringState>,
) -> Result<Json<CatchUpReport>, Error> {
    let today = local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    catch_up_recurring_transactions(today, &connection).map(Json)
}
