//! The cost-breakdown engine.
//!
//! Given a usage event for an asset, e.g. a trip with a car or a month of
//! running a fridge, the engine decomposes its cost into components such as
//! fuel, wear and amortization. The calculators are pure functions of the
//! asset attributes and the usage parameters.

mod allocation;
mod appliance;
mod breakdown;
mod vehicle;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::asset::{Asset, AssetCategory};

pub use allocation::{
    Allocation, MAX_BILL_TOTAL, WeightedLabel, allocate_by_appliance_consumption,
    allocate_by_weights,
};
pub use appliance::{ApplianceCostCalculator, ApplianceLoad};
pub use breakdown::{ComponentKind, CostBreakdown, CostComponent};
pub(crate) use breakdown::round_to;
pub use vehicle::VehicleCostCalculator;

/// The errors that prevent a breakdown from being computed.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum BreakdownError {
    /// The usage event does not apply to this kind of asset, e.g. a trip
    /// with a fridge.
    #[error("\"{asset}\" is a {actual} asset but this calculation needs a {expected}")]
    WrongCategory {
        /// The asset name.
        asset: String,
        /// The category the calculation needs.
        expected: AssetCategory,
        /// The category of the asset.
        actual: AssetCategory,
    },

    /// The asset lacks an attribute the calculation needs.
    #[error("\"{asset}\" has no {attribute}")]
    MissingAttribute {
        /// The asset name.
        asset: String,
        /// The name of the missing attribute.
        attribute: &'static str,
    },

    /// A usage parameter is negative or not a finite number.
    #[error("{0} must be a finite, non-negative number")]
    InvalidUsage(&'static str),
}

/// A trip with a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripUsage {
    /// The distance driven.
    pub distance_km: f64,
    /// The price per litre (or per kWh for electric vehicles).
    pub fuel_price_per_litre: f64,
    /// The day of the trip, today if not given.
    #[serde(default)]
    pub date: Option<Date>,
}

/// A period of running an appliance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodUsage {
    /// The length of the period.
    pub days: u32,
    /// The electricity tariff.
    pub kwh_price: f64,
    /// The metered hours of use, if known.
    #[serde(default)]
    pub actual_total_hours: Option<f64>,
}

/// How an asset was used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UsageEvent {
    /// Driving a vehicle.
    Trip(TripUsage),
    /// Running an appliance.
    Period(PeriodUsage),
}

impl UsageEvent {
    /// Check that every numeric parameter is finite and non-negative.
    ///
    /// # Errors
    /// Returns [BreakdownError::InvalidUsage] naming the first bad parameter.
    pub fn validate(&self) -> Result<(), BreakdownError> {
        match self {
            UsageEvent::Trip(TripUsage {
                distance_km,
                fuel_price_per_litre,
                ..
            }) => {
                ensure_non_negative("distance_km", *distance_km)?;
                ensure_non_negative("fuel_price_per_litre", *fuel_price_per_litre)
            }
            UsageEvent::Period(PeriodUsage {
                kwh_price,
                actual_total_hours,
                ..
            }) => {
                ensure_non_negative("kwh_price", *kwh_price)?;
                match actual_total_hours {
                    Some(hours) => ensure_non_negative("actual_total_hours", *hours),
                    None => Ok(()),
                }
            }
        }
    }
}

fn ensure_non_negative(name: &'static str, value: f64) -> Result<(), BreakdownError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(BreakdownError::InvalidUsage(name))
    }
}

/// Decompose the cost of `usage` of `asset`.
///
/// Trips need a vehicle and periods need an appliance. A trip without a date
/// is assumed to happen on `today`.
///
/// # Errors
/// Returns a [BreakdownError] if the usage is invalid, does not match the
/// asset's category, or the asset lacks a required attribute.
pub fn decompose(
    asset: &Asset,
    usage: &UsageEvent,
    today: Date,
) -> Result<CostBreakdown, BreakdownError> {
    usage.validate()?;

    let breakdown = match usage {
        UsageEvent::Trip(TripUsage {
            distance_km,
            fuel_price_per_litre,
            date,
        }) => VehicleCostCalculator::from_asset(asset)?.compute_trip_cost(
            *distance_km,
            *fuel_price_per_litre,
            date.unwrap_or(today),
        ),
        UsageEvent::Period(PeriodUsage {
            days,
            kwh_price,
            actual_total_hours,
        }) => ApplianceCostCalculator::from_asset(asset)?.compute_period_cost(
            *days,
            *kwh_price,
            *actual_total_hours,
        ),
    };

    tracing::debug!(
        "Decomposed {usage:?} for asset {} into a total of {}",
        asset.id,
        breakdown.total()
    );

    Ok(breakdown.with_asset_id(asset.id))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::date;

    use crate::{
        asset::{Asset, AssetCategory},
        cost_breakdown::{
            BreakdownError, ComponentKind, PeriodUsage, TripUsage, UsageEvent, decompose,
        },
    };

    fn car() -> Asset {
        Asset {
            consumption_per_100km: Some(5.5),
            purchase_price: Some(12_000.0),
            purchase_date: Some(date!(2020 - 01 - 01)),
            ..Asset::new(1, "Fiat Panda", AssetCategory::Vehicle)
        }
    }

    fn fridge() -> Asset {
        Asset {
            power_watts: Some(150.0),
            daily_usage_hours: Some(24.0),
            purchase_price: Some(600.0),
            ..Asset::new(2, "Fridge", AssetCategory::Appliance)
        }
    }

    #[test]
    fn trip_uses_vehicle_calculator() {
        let usage = UsageEvent::Trip(TripUsage {
            distance_km: 100.0,
            fuel_price_per_litre: 2.0,
            date: Some(date!(2024 - 01 - 01)),
        });

        let breakdown = decompose(&car(), &usage, date!(2025 - 01 - 01)).unwrap();

        assert_eq!(breakdown.asset_id(), Some(1));
        assert_eq!(breakdown.component(ComponentKind::Fuel).unwrap().value(), 11.0);
        assert_eq!(
            breakdown
                .component(ComponentKind::Amortization)
                .unwrap()
                .parameter("age_years"),
            Some(4.0)
        );
    }

    #[test]
    fn trip_without_date_happens_today() {
        let usage = UsageEvent::Trip(TripUsage {
            distance_km: 100.0,
            fuel_price_per_litre: 2.0,
            date: None,
        });

        let breakdown = decompose(&car(), &usage, date!(2022 - 01 - 01)).unwrap();

        assert_eq!(
            breakdown
                .component(ComponentKind::Amortization)
                .unwrap()
                .parameter("age_years"),
            Some(2.0)
        );
    }

    #[test]
    fn period_uses_appliance_calculator() {
        let usage = UsageEvent::Period(PeriodUsage {
            days: 30,
            kwh_price: 0.30,
            actual_total_hours: None,
        });

        let breakdown = decompose(&fridge(), &usage, date!(2025 - 01 - 01)).unwrap();

        assert_eq!(breakdown.asset_id(), Some(2));
        assert_eq!(breakdown.component(ComponentKind::Energy).unwrap().value(), 32.4);
    }

    #[test]
    fn trip_with_appliance_is_wrong_category() {
        let usage = UsageEvent::Trip(TripUsage {
            distance_km: 10.0,
            fuel_price_per_litre: 1.8,
            date: None,
        });

        let got = decompose(&fridge(), &usage, date!(2025 - 01 - 01));

        assert!(matches!(got, Err(BreakdownError::WrongCategory { .. })));
    }

    #[test]
    fn period_with_vehicle_is_wrong_category() {
        let usage = UsageEvent::Period(PeriodUsage {
            days: 30,
            kwh_price: 0.3,
            actual_total_hours: None,
        });

        let got = decompose(&car(), &usage, date!(2025 - 01 - 01));

        assert!(matches!(got, Err(BreakdownError::WrongCategory { .. })));
    }

    #[test]
    fn rejects_negative_distance() {
        let usage = UsageEvent::Trip(TripUsage {
            distance_km: -5.0,
            fuel_price_per_litre: 1.8,
            date: None,
        });

        let got = decompose(&car(), &usage, date!(2025 - 01 - 01));

        assert_eq!(got, Err(BreakdownError::InvalidUsage("distance_km")));
    }

    #[test]
    fn rejects_nan_tariff() {
        let usage = UsageEvent::Period(PeriodUsage {
            days: 30,
            kwh_price: f64::NAN,
            actual_total_hours: None,
        });

        assert_eq!(
            usage.validate(),
            Err(BreakdownError::InvalidUsage("kwh_price"))
        );
    }

    #[test]
    fn usage_is_tagged_by_type() {
        let usage: UsageEvent = serde_json::from_value(json!({
            "type": "trip",
            "distance_km": 12.5,
            "fuel_price_per_litre": 1.79,
            "date": "2024-03-01"
        }))
        .unwrap();

        assert_eq!(
            usage,
            UsageEvent::Trip(TripUsage {
                distance_km: 12.5,
                fuel_price_per_litre: 1.79,
                date: Some(date!(2024 - 03 - 01)),
            })
        );

        let usage: UsageEvent =
            serde_json::from_value(json!({"type": "period", "days": 7, "kwh_price": 0.3}))
                .unwrap();

        assert_eq!(
            usage,
            UsageEvent::Period(PeriodUsage {
                days: 7,
                kwh_price: 0.3,
                actual_total_hours: None,
            })
        );
    }
}
