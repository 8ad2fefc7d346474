use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    Error,
    app_state::lock_connection,
    budget::{
        BudgetState,
        core::{
            Budget, BudgetForm, BudgetId, BudgetUpdate, create_budget, delete_budget, get_budget,
            update_budget,
        },
        status::{BudgetList, BudgetListQuery, BudgetSummary, get_budget_spending, get_budget_summary},
    },
    extract::{ApiJson, ApiQuery},
    month::{MonthQuery, MonthRange},
    timezone::local_today,
};

/// A route handler for the budgets and their spending in a month, the
/// current month if none is given.
pub async fn list_budgets_endpoint(
    State(state): State<BudgetState>,
    ApiQuery(query): ApiQuery<BudgetListQuery>,
) -> Result<Json<BudgetList>, Error> {
    let today = local_today(&state.local_timezone)?;
    let month = MonthRange::resolve(
        MonthQuery {
            year: query.year,
            month: query.month,
        },
        today,
    )?;
    let connection = lock_connection(&state.db_connection)?;

    let budgets = get_budget_spending(&month, query.active, &connection)?;

    Ok(Json(BudgetList {
        budgets,
        period: month,
    }))
}

pub async fn get_budget_summary_endpoint(
    State(state): State<BudgetState>,
    ApiQuery(query): ApiQuery<MonthQuery>,
) -> Result<Json<BudgetSummary>, Error> {
    let today = local_today(&state.local_timezone)?;
    let month = MonthRange::resolve(query, today)?;
    let connection = lock_connection(&state.db_connection)?;

    get_budget_summary(&month, &connection).map(Json)
}

pub async fn get_budget_endpoint(
    State(state): State<BudgetState>,
    Path(budget_id): Path<BudgetId>,
) -> Result<Json<Budget>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_budget(budget_id, &connection).map(Json)
}

pub async fn create_budget_endpoint(
    State(state): State<BudgetState>,
    ApiJson(form): ApiJson<BudgetForm>,
) -> Result<(StatusCode, Json<Budget>), Error> {
    let today = local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    let budget = create_budget(&form, today, &connection)?;
    tracing::info!(
        "Created budget {} of {} for category {}",
        budget.id,
        budget.amount,
        budget.category_id
    );

    Ok((StatusCode::CREATED, Json(budget)))
}

pub async fn update_budget_endpoint(
    State(state): State<BudgetState>,
    Path(budget_id): Path<BudgetId>,
    ApiJson(update): ApiJson<BudgetUpdate>,
) -> Result<Json<Budget>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    update_budget(budget_id, &update, &connection).map(Json)
}

pub async fn delete_budget_endpoint(
    State(state): State<BudgetState>,
    Path(budget_id): Path<BudgetId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_budget(budget_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
