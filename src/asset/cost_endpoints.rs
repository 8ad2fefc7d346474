//! Endpoints that compute cost breakdowns and split bills.
//!
//! Nothing here is stored: breakdowns are only persisted when a transaction
//! is created for a usage event.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    app_state::lock_connection,
    asset::{
        AssetState,
        core::{AssetCategory, AssetId, get_asset},
    },
    cost_breakdown::{
        Allocation, ApplianceCostCalculator, ApplianceLoad, CostBreakdown, MAX_BILL_TOTAL,
        PeriodUsage, TripUsage, UsageEvent, VehicleCostCalculator, WeightedLabel,
        allocate_by_appliance_consumption, allocate_by_weights, decompose,
    },
    extract::{ApiJson, ApiQuery},
    timezone::local_today,
    validation::Validator,
};

/// A route handler for the cost breakdown of a vehicle trip.
///
/// A trip without a date happens today.
pub async fn trip_cost_endpoint(
    State(state): State<AssetState>,
    Path(asset_id): Path<AssetId>,
    ApiJson(trip): ApiJson<TripUsage>,
) -> Result<Json<CostBreakdown>, Error> {
    breakdown_for_asset(&state, asset_id, &UsageEvent::Trip(trip)).map(Json)
}

/// A route handler for the cost breakdown of running an appliance.
pub async fn period_cost_endpoint(
    State(state): State<AssetState>,
    Path(asset_id): Path<AssetId>,
    ApiJson(period): ApiJson<PeriodUsage>,
) -> Result<Json<CostBreakdown>, Error> {
    breakdown_for_asset(&state, asset_id, &UsageEvent::Period(period)).map(Json)
}

fn breakdown_for_asset(
    state: &AssetState,
    asset_id: AssetId,
    usage: &UsageEvent,
) -> Result<CostBreakdown, Error> {
    let today = local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;
    let asset = get_asset(asset_id, &connection)?;

    decompose(&asset, usage, today).map_err(Error::from)
}

/// The query for a monthly cost estimate.
///
/// Vehicles need `km_per_month` and `fuel_price`, appliances need `kwh_price`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MonthlyCostQuery {
    /// The electricity tariff in €/kWh.
    pub kwh_price: Option<f64>,
    /// The distance driven in a typical month.
    pub km_per_month: Option<f64>,
    /// The average fuel price.
    pub fuel_price: Option<f64>,
}

/// A route handler for the estimated monthly cost of a vehicle or appliance.
pub async fn monthly_cost_endpoint(
    State(state): State<AssetState>,
    Path(asset_id): Path<AssetId>,
    ApiQuery(query): ApiQuery<MonthlyCostQuery>,
) -> Result<Json<CostBreakdown>, Error> {
    let today = local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;
    let asset = get_asset(asset_id, &connection)?;

    let mut validator = Validator::default();
    validator.non_negative("kwh_price", query.kwh_price);
    validator.non_negative("km_per_month", query.km_per_month);
    validator.non_negative("fuel_price", query.fuel_price);
    validator.finish()?;

    let breakdown = match (asset.category, query) {
        (
            AssetCategory::Vehicle,
            MonthlyCostQuery {
                km_per_month: Some(km_per_month),
                fuel_price: Some(fuel_price),
                ..
            },
        ) => VehicleCostCalculator::from_asset(&asset)?.estimate_monthly_cost(
            km_per_month,
            fuel_price,
            today,
        ),
        (AssetCategory::Vehicle, _) => {
            return Err(Error::InvalidInput(
                "km_per_month and fuel_price are required for vehicles".to_owned(),
            ));
        }
        (
            AssetCategory::Appliance,
            MonthlyCostQuery {
                kwh_price: Some(kwh_price),
                ..
            },
        ) => ApplianceCostCalculator::from_asset(&asset)?.compute_monthly_cost(kwh_price),
        (AssetCategory::Appliance, _) => {
            return Err(Error::InvalidInput(
                "kwh_price is required for appliances".to_owned(),
            ));
        }
        (category, _) => {
            return Err(Error::InvalidInput(format!(
                "monthly costs can only be estimated for vehicles and appliances, not {category}"
            )));
        }
    };

    Ok(Json(breakdown.with_asset_id(asset.id)))
}

/// The body of a request to split a bill between appliances.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApplianceAllocationRequest {
    /// The bill amount.
    pub total: f64,
    /// The number of days the bill covers.
    #[serde(default = "default_billing_days")]
    pub days: u32,
    /// The appliances to split the bill between.
    pub asset_ids: Vec<AssetId>,
}

fn default_billing_days() -> u32 {
    30
}

/// The body of a request to split a bill by weights.
#[derive(Debug, Serialize, Deserialize)]
pub struct WeightAllocationRequest {
    /// The bill amount.
    pub total: f64,
    /// The labels and their relative weights.
    pub weights: Vec<WeightedLabel>,
}

/// How a bill was split.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct AllocationResponse {
    /// The bill amount.
    pub total: f64,
    /// The share of each label, in request order.
    pub allocations: Vec<Allocation>,
}

/// A route handler for splitting a bill by the estimated consumption of appliances.
pub async fn allocate_by_appliances_endpoint(
    State(state): State<AssetState>,
    ApiJson(request): ApiJson<ApplianceAllocationRequest>,
) -> Result<Json<AllocationResponse>, Error> {
    let mut validator = Validator::default();
    validator.in_range("total", request.total, 0.0, MAX_BILL_TOTAL);
    if request.asset_ids.is_empty() {
        validator.fail("asset_ids must not be empty");
    }
    validator.finish()?;

    let connection = lock_connection(&state.db_connection)?;
    let loads = request
        .asset_ids
        .iter()
        .map(|&asset_id| {
            let asset = get_asset(asset_id, &connection)?;
            ApplianceLoad::from_asset(&asset).map_err(Error::from)
        })
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(Json(AllocationResponse {
        total: request.total,
        allocations: allocate_by_appliance_consumption(request.total, &loads, request.days),
    }))
}

/// A route handler for splitting a bill in proportion to weights.
pub async fn allocate_by_weights_endpoint(
    ApiJson(request): ApiJson<WeightAllocationRequest>,
) -> Result<Json<AllocationResponse>, Error> {
    let mut validator = Validator::default();
    validator.in_range("total", request.total, 0.0, MAX_BILL_TOTAL);
    for weighted in &request.weights {
        validator.not_blank("label", &weighted.label);
        validator.non_negative(&format!("weight of {}", weighted.label), weighted.weight);
    }
    validator.finish()?;

    Ok(Json(AllocationResponse {
        total: request.total,
        allocations: allocate_by_weights(request.total, &request.weights),
    }))
}
