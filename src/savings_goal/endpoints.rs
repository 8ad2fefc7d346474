use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{
    Error,
    app_state::lock_connection,
    extract::{ApiJson, ApiQuery},
    savings_goal::{
        SavingsGoalState,
        core::{
            SavingsGoal, SavingsGoalForm, SavingsGoalId, SavingsGoalQuery, SavingsGoalUpdate,
            contribute_to_savings_goal, create_savings_goal, delete_savings_goal,
            get_savings_goal, get_savings_goals, update_savings_goal, withdraw_from_savings_goal,
        },
    },
};

/// The body of a contribution or withdrawal.
#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: f64,
}

pub async fn list_savings_goals_endpoint(
    State(state): State<SavingsGoalState>,
    ApiQuery(query): ApiQuery<SavingsGoalQuery>,
) -> Result<Json<Vec<SavingsGoal>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_savings_goals(query.include_completed, &connection).map(Json)
}

pub async fn get_savings_goal_endpoint(
    State(state): State<SavingsGoalState>,
    Path(goal_id): Path<SavingsGoalId>,
) -> Result<Json<SavingsGoal>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_savings_goal(goal_id, &connection).map(Json)
}

pub async fn create_savings_goal_endpoint(
    State(state): State<SavingsGoalState>,
    ApiJson(form): ApiJson<SavingsGoalForm>,
) -> Result<(StatusCode, Json<SavingsGoal>), Error> {
    let connection = lock_connection(&state.db_connection)?;

    let goal = create_savings_goal(&form, &connection)?;
    tracing::info!("Created savings goal {} \"{}\"", goal.id, goal.name);

    Ok((StatusCode::CREATED, Json(goal)))
}

pub async fn update_savings_goal_endpoint(
    State(state): State<SavingsGoalState>,
    Path(goal_id): Path<SavingsGoalId>,
    ApiJson(update): ApiJson<SavingsGoalUpdate>,
) -> Result<Json<SavingsGoal>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    update_savings_goal(goal_id, &update, &connection).map(Json)
}

pub async fn delete_savings_goal_endpoint(
    State(state): State<SavingsGoalState>,
    Path(goal_id): Path<SavingsGoalId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_savings_goal(goal_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}

/// A route handler for adding money to a savings goal.
pub async fn contribute_endpoint(
    State(state): State<SavingsGoalState>,
    Path(goal_id): Path<SavingsGoalId>,
    ApiJson(request): ApiJson<AmountRequest>,
) -> Result<Json<SavingsGoal>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let goal = contribute_to_savings_goal(goal_id, request.amount, &connection)?;
    if goal.completed {
        tracing::info!("Savings goal {} \"{}\" reached its target", goal.id, goal.name);
    }

    Ok(Json(goal))
}

/// A route handler for taking money out of a savings goal.
pub async fn withdraw_endpoint(
    State(state): State<SavingsGoalState>,
    Path(goal_id): Path<SavingsGoalId>,
    ApiJson(request): ApiJson<AmountRequest>,
) -> Result<Json<SavingsGoal>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    withdraw_from_savings_goal(goal_id, request.amount, &connection).map(Json)
}
