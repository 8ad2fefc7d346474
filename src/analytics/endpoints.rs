use axum::{Json, extract::State};

use crate::{
    Error,
    analytics::{AnalyticsState, Dashboard, get_dashboard},
    app_state::lock_connection,
    extract::ApiQuery,
    month::{MonthQuery, MonthRange},
    timezone::local_today,
};

/// A route handler for the dashboard of a month, the current month if none
/// is given.
pub async fn get_dashboard_endpoint(
    State(state): State<AnalyticsState>,
    ApiQuery(query): ApiQuery<MonthQuery>,
) -> Result<Json<Dashboard>, Error> {
    let today = local_today(&state.local_timezone)?;
    let month = MonthRange::resolve(query, today)?;
    let connection = lock_connection(&state.db_connection)?;

    get_dashboard(&month, &connection).map(Json)
}
