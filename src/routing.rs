//! Application router configuration.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    middleware,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::{
    AppState, Error,
    account::{
        create_account_endpoint, delete_account_endpoint, get_account_balance_endpoint,
        get_account_endpoint, list_accounts_endpoint, update_account_endpoint,
    },
    analytics::get_dashboard_endpoint,
    app_state::lock_connection,
    asset::{
        allocate_by_appliances_endpoint, allocate_by_weights_endpoint, create_asset_endpoint,
        delete_asset_endpoint, get_asset_endpoint, list_assets_endpoint, monthly_cost_endpoint,
        period_cost_endpoint, trip_cost_endpoint, update_asset_endpoint,
    },
    budget::{
        create_budget_endpoint, delete_budget_endpoint, get_budget_endpoint,
        get_budget_summary_endpoint, list_budgets_endpoint, update_budget_endpoint,
    },
    category::{
        create_category_endpoint, delete_category_endpoint, get_category_endpoint,
        get_category_usage_endpoint, list_categories_endpoint, update_category_endpoint,
    },
    endpoints,
    logging::logging_middleware,
    recurring::{
        catch_up_endpoint, create_recurring_endpoint, delete_recurring_endpoint,
        get_recurring_endpoint, list_recurring_endpoint, run_recurring_endpoint,
        toggle_recurring_endpoint, update_recurring_endpoint,
    },
    savings_goal::{
        contribute_endpoint, create_savings_goal_endpoint, delete_savings_goal_endpoint,
        get_savings_goal_endpoint, list_savings_goals_endpoint, update_savings_goal_endpoint,
        withdraw_endpoint,
    },
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, export_transactions_endpoint,
        get_transaction_breakdown_endpoint, get_transaction_endpoint, list_transactions_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let asset_routes = Router::new()
        .route(
            endpoints::ASSETS,
            get(list_assets_endpoint).post(create_asset_endpoint),
        )
        .route(
            endpoints::ASSET,
            get(get_asset_endpoint)
                .put(update_asset_endpoint)
                .delete(delete_asset_endpoint),
        )
        .route(endpoints::ASSET_TRIP_COST, post(trip_cost_endpoint))
        .route(endpoints::ASSET_PERIOD_COST, post(period_cost_endpoint))
        .route(endpoints::ASSET_MONTHLY_COST, get(monthly_cost_endpoint))
        .route(
            endpoints::ALLOCATE_BY_APPLIANCES,
            post(allocate_by_appliances_endpoint),
        )
        .route(
            endpoints::ALLOCATE_BY_WEIGHTS,
            post(allocate_by_weights_endpoint),
        );

    let ledger_routes = Router::new()
        .route(
            endpoints::ACCOUNTS,
            get(list_accounts_endpoint).post(create_account_endpoint),
        )
        .route(
            endpoints::ACCOUNT,
            get(get_account_endpoint)
                .put(update_account_endpoint)
                .delete(delete_account_endpoint),
        )
        .route(endpoints::ACCOUNT_BALANCE, get(get_account_balance_endpoint))
        .route(
            endpoints::CATEGORIES,
            get(list_categories_endpoint).post(create_category_endpoint),
        )
        .route(
            endpoints::CATEGORY,
            get(get_category_endpoint)
                .put(update_category_endpoint)
                .delete(delete_category_endpoint),
        )
        .route(endpoints::CATEGORY_USAGE, get(get_category_usage_endpoint))
        .route(
            endpoints::TRANSACTIONS,
            get(list_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTIONS_EXPORT,
            get(export_transactions_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint).delete(delete_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION_BREAKDOWN,
            get(get_transaction_breakdown_endpoint),
        );

    let planning_routes = Router::new()
        .route(
            endpoints::BUDGETS,
            get(list_budgets_endpoint).post(create_budget_endpoint),
        )
        .route(endpoints::BUDGETS_SUMMARY, get(get_budget_summary_endpoint))
        .route(
            endpoints::BUDGET,
            get(get_budget_endpoint)
                .put(update_budget_endpoint)
                .delete(delete_budget_endpoint),
        )
        .route(
            endpoints::SAVINGS_GOALS,
            get(list_savings_goals_endpoint).post(create_savings_goal_endpoint),
        )
        .route(
            endpoints::SAVINGS_GOAL,
            get(get_savings_goal_endpoint)
                .put(update_savings_goal_endpoint)
                .delete(delete_savings_goal_endpoint),
        )
        .route(endpoints::SAVINGS_GOAL_CONTRIBUTE, post(contribute_endpoint))
        .route(endpoints::SAVINGS_GOAL_WITHDRAW, post(withdraw_endpoint))
        .route(
            endpoints::RECURRING,
            get(list_recurring_endpoint).post(create_recurring_endpoint),
        )
        .route(endpoints::RECURRING_CATCH_UP, post(catch_up_endpoint))
        .route(
            endpoints::RECURRING_ITEM,
            get(get_recurring_endpoint)
                .put(update_recurring_endpoint)
                .delete(delete_recurring_endpoint),
        )
        .route(endpoints::RECURRING_TOGGLE, post(toggle_recurring_endpoint))
        .route(endpoints::RECURRING_RUN, post(run_recurring_endpoint))
        .route(endpoints::DASHBOARD, get(get_dashboard_endpoint));

    Router::new()
        .route(endpoints::ROOT, get(get_service_info))
        .route(endpoints::HEALTH, get(get_health))
        .merge(asset_routes)
        .merge(ledger_routes)
        .merge(planning_routes)
        .fallback(get_404_not_found)
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

/// A CORS layer that allows requests from `allowed_origins`, or from any
/// origin if the list is empty.
///
/// Origins that are not valid header values are skipped with a warning.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    if allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(origin) => Some(origin),
            Err(error) => {
                tracing::warn!("Ignoring invalid CORS origin \"{origin}\": {error}");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

/// What the root route reports about the service.
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
}

async fn get_service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME").to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
    })
}

/// The result of a health check.
#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub database: String,
}

async fn get_health(State(state): State<AppState>) -> Result<Json<Health>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    connection.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;

    Ok(Json(Health {
        status: "healthy".to_owned(),
        database: "connected".to_owned(),
    }))
}

async fn get_404_not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "the requested route does not exist" })),
    )
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderValue, StatusCode, header};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{
        AppState, PaginationConfig,
        endpoints::{self, format_endpoint},
        pagination::Paged,
        routing::{Health, ServiceInfo, build_router, cors_layer},
        transaction::Transaction,
    };

    fn get_test_server() -> TestServer {
        let state = AppState::new(
            Connection::open_in_memory().unwrap(),
            "Etc/UTC",
            PaginationConfig::default(),
        )
        .unwrap();

        TestServer::try_new(build_router(state)).expect("Could not create test server.")
    }

    #[track_caller]
    fn assert_json_error(body: &Value) {
        assert!(
            body["error"].is_string(),
            "expected a JSON error message, got {body}"
        );
    }

    #[tokio::test]
    async fn health_reports_database() {
        let server = get_test_server();

        let health = server.get(endpoints::HEALTH).await.json::<Health>();

        assert_eq!(health.status, "healthy");
        assert_eq!(health.database, "connected");
    }

    #[tokio::test]
    async fn root_describes_service() {
        let server = get_test_server();

        let info = server.get(endpoints::ROOT).await.json::<ServiceInfo>();

        assert_eq!(info.name, env!("CARGO_PKG_NAME"));
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let server = get_test_server();

        let response = server.get("/api/nothing_here").await;

        response.assert_status_not_found();
        assert_json_error(&response.json::<Value>());
    }

    #[tokio::test]
    async fn static_routes_win_over_parameters() {
        let server = get_test_server();

        server
            .get(endpoints::BUDGETS_SUMMARY)
            .await
            .assert_status_ok();
        server
            .post(endpoints::RECURRING_CATCH_UP)
            .await
            .assert_status_ok();
        server
            .get(endpoints::TRANSACTIONS_EXPORT)
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn transfer_moves_money_between_accounts() {
        let server = get_test_server();
        let main = server
            .post(endpoints::ACCOUNTS)
            .json(&json!({"name": "Main", "kind": "checking", "balance": 1000.0}))
            .await
            .json::<Value>()["id"]
            .as_i64()
            .unwrap();
        let savings = server
            .post(endpoints::ACCOUNTS)
            .json(&json!({"name": "Savings", "kind": "savings"}))
            .await
            .json::<Value>()["id"]
            .as_i64()
            .unwrap();

        server
            .post(endpoints::TRANSACTIONS)
            .json(&json!({
                "date": "2025-03-01",
                "amount": 250.0,
                "kind": "transfer",
                "account_id": main,
                "destination_account_id": savings
            }))
            .await
            .assert_status(StatusCode::CREATED);

        let main_balance = server
            .get(&format_endpoint(endpoints::ACCOUNT_BALANCE, main))
            .await
            .json::<Value>();
        let savings_balance = server
            .get(&format_endpoint(endpoints::ACCOUNT_BALANCE, savings))
            .await
            .json::<Value>();
        assert_eq!(main_balance["balance"], 750.0);
        assert_eq!(savings_balance["balance"], 250.0);

        let query = serde_urlencoded::to_string([("account_id", savings.to_string())]).unwrap();
        let listed = server
            .get(&format!("{}?{query}", endpoints::TRANSACTIONS))
            .await
            .json::<Paged<Transaction>>();
        assert_eq!(listed.total, 1);
    }

    #[tokio::test]
    async fn validation_errors_are_json() {
        let server = get_test_server();

        let response = server
            .post(endpoints::TRANSACTIONS)
            .json(&json!({"date": "2025-03-01", "amount": -1.0, "kind": "expense", "account_id": 1}))
            .await;

        response.assert_status_bad_request();
        assert_json_error(&response.json::<Value>());
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let state = AppState::new(
            Connection::open_in_memory().unwrap(),
            "Etc/UTC",
            PaginationConfig::default(),
        )
        .unwrap();
        let app = build_router(state).layer(cors_layer(&["http://localhost:3000".to_owned()]));
        let server = TestServer::try_new(app).expect("Could not create test server.");

        let response = server
            .get(endpoints::HEALTH)
            .add_header(header::ORIGIN, HeaderValue::from_static("http://localhost:3000"))
            .await;

        assert_eq!(
            response.header(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            "http://localhost:3000"
        );
    }
}
