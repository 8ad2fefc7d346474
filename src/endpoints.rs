//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/assets/{asset_id}', use [format_endpoint].

/// The root route which describes the service.
pub const ROOT: &str = "/";
/// The route for checking that the server and database are up.
pub const HEALTH: &str = "/api/health";

/// The route for listing and creating assets.
pub const ASSETS: &str = "/api/assets";
/// The route for reading, replacing and deleting a single asset.
pub const ASSET: &str = "/api/assets/{asset_id}";
/// The route for the cost breakdown of a vehicle trip.
pub const ASSET_TRIP_COST: &str = "/api/assets/{asset_id}/trip_cost";
/// The route for the cost breakdown of running an appliance for a period.
pub const ASSET_PERIOD_COST: &str = "/api/assets/{asset_id}/period_cost";
/// The route for the estimated monthly cost of an asset.
pub const ASSET_MONTHLY_COST: &str = "/api/assets/{asset_id}/monthly_cost";
/// The route for splitting a bill between appliances.
pub const ALLOCATE_BY_APPLIANCES: &str = "/api/allocations/appliances";
/// The route for splitting a bill by weights, e.g. room areas.
pub const ALLOCATE_BY_WEIGHTS: &str = "/api/allocations/weights";

/// The route for listing and creating accounts.
pub const ACCOUNTS: &str = "/api/accounts";
/// The route for reading, updating and deleting a single account.
pub const ACCOUNT: &str = "/api/accounts/{account_id}";
/// The route for the balance of an account.
pub const ACCOUNT_BALANCE: &str = "/api/accounts/{account_id}/balance";

/// The route for listing and creating categories.
pub const CATEGORIES: &str = "/api/categories";
/// The route for reading, updating and deleting a single category.
pub const CATEGORY: &str = "/api/categories/{category_id}";
/// The route for how often a category is referenced.
pub const CATEGORY_USAGE: &str = "/api/categories/{category_id}/usage";

/// The route for listing and creating transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route for exporting transactions as CSV.
pub const TRANSACTIONS_EXPORT: &str = "/api/transactions/export";
/// The route for reading and deleting a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route for the stored cost breakdown of a transaction.
pub const TRANSACTION_BREAKDOWN: &str = "/api/transactions/{transaction_id}/breakdown";

/// The route for listing budgets with their spending and creating budgets.
pub const BUDGETS: &str = "/api/budgets";
/// The route for the totals over all budgets.
pub const BUDGETS_SUMMARY: &str = "/api/budgets/summary";
/// The route for reading, updating and deleting a single budget.
pub const BUDGET: &str = "/api/budgets/{budget_id}";

/// The route for listing and creating savings goals.
pub const SAVINGS_GOALS: &str = "/api/savings_goals";
/// The route for reading, updating and deleting a single savings goal.
pub const SAVINGS_GOAL: &str = "/api/savings_goals/{goal_id}";
/// The route for adding money to a savings goal.
pub const SAVINGS_GOAL_CONTRIBUTE: &str = "/api/savings_goals/{goal_id}/contribute";
/// The route for taking money out of a savings goal.
pub const SAVINGS_GOAL_WITHDRAW: &str = "/api/savings_goals/{goal_id}/withdraw";

/// The route for listing and creating recurring transactions.
pub const RECURRING: &str = "/api/recurring";
/// The route for executing every recurring transaction that is due.
pub const RECURRING_CATCH_UP: &str = "/api/recurring/catch_up";
/// The route for reading, updating and deleting a single recurring transaction.
pub const RECURRING_ITEM: &str = "/api/recurring/{recurring_id}";
/// The route for pausing or resuming a recurring transaction.
pub const RECURRING_TOGGLE: &str = "/api/recurring/{recurring_id}/toggle";
/// The route for executing a recurring transaction now.
pub const RECURRING_RUN: &str = "/api/recurring/{recurring_id}/run";

/// The route for the dashboard figures of a month.
pub const DASHBOARD: &str = "/api/analytics/dashboard";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// If `endpoint_path` has no parameter it is returned unchanged.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
