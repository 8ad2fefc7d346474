//! Cost of trips made with a vehicle.

use time::Date;

use crate::{
    asset::{Asset, AssetCategory, FuelType},
    cost_breakdown::{
        BreakdownError,
        breakdown::{ComponentDraft, ComponentKind, CostBreakdown, round_to},
    },
};

/// Lifetime used when an asset does not specify one.
pub const DEFAULT_LIFETIME_YEARS: u32 = 10;
/// Annual depreciation in percent used when an asset does not specify one.
pub const DEFAULT_DEPRECIATION_RATE: f64 = 15.0;
/// Maintenance and wear in euros per kilometre used when a vehicle does not specify one.
pub const DEFAULT_MAINTENANCE_COST_PER_KM: f64 = 0.08;
/// The distance a vehicle is assumed to cover per year.
pub const AVERAGE_ANNUAL_KM: f64 = 15_000.0;

const DAYS_PER_YEAR: f64 = 365.25;

/// Computes fuel, wear and amortization costs for vehicle trips.
///
/// Amortization uses exponential depreciation: after `age` years the vehicle
/// is worth `price × ((100 − rate) / 100) ^ age`, and the value lost so far
/// is spread over the kilometres of the whole lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleCostCalculator {
    name: String,
    fuel_type: Option<FuelType>,
    consumption_per_100km: f64,
    maintenance_cost_per_km: f64,
    purchase_price: f64,
    purchase_date: Date,
    lifetime_years: u32,
    depreciation_rate: f64,
}

impl VehicleCostCalculator {
    /// Create a calculator with the default lifetime and depreciation rate.
    pub fn new(
        name: &str,
        consumption_per_100km: f64,
        maintenance_cost_per_km: f64,
        purchase_price: f64,
        purchase_date: Date,
    ) -> Self {
        Self {
            name: name.to_owned(),
            fuel_type: None,
            consumption_per_100km,
            maintenance_cost_per_km,
            purchase_price,
            purchase_date,
            lifetime_years: DEFAULT_LIFETIME_YEARS,
            depreciation_rate: DEFAULT_DEPRECIATION_RATE,
        }
    }

    /// Build a calculator from a stored asset.
    ///
    /// # Errors
    /// Returns [BreakdownError::WrongCategory] if the asset is not a vehicle and
    /// [BreakdownError::MissingAttribute] if the consumption, purchase price or
    /// purchase date is not set.
    pub fn from_asset(asset: &Asset) -> Result<Self, BreakdownError> {
        if asset.category != AssetCategory::Vehicle {
            return Err(BreakdownError::WrongCategory {
                asset: asset.name.clone(),
                expected: AssetCategory::Vehicle,
                actual: asset.category,
            });
        }

        let missing = |attribute| BreakdownError::MissingAttribute {
            asset: asset.name.clone(),
            attribute,
        };

        let calculator = Self::new(
            &asset.name,
            asset
                .consumption_per_100km
                .ok_or_else(|| missing("consumption_per_100km"))?,
            asset
                .maintenance_cost_per_km
                .unwrap_or(DEFAULT_MAINTENANCE_COST_PER_KM),
            asset
                .purchase_price
                .ok_or_else(|| missing("purchase_price"))?,
            asset.purchase_date.ok_or_else(|| missing("purchase_date"))?,
        )
        .fuel_type(asset.fuel_type)
        .lifetime_years(asset.lifetime_years.unwrap_or(DEFAULT_LIFETIME_YEARS))
        .depreciation_rate(
            asset
                .depreciation_rate
                .unwrap_or(DEFAULT_DEPRECIATION_RATE),
        );

        Ok(calculator)
    }

    /// Set the fuel type, used to pick units in the method descriptions.
    pub fn fuel_type(mut self, fuel_type: Option<FuelType>) -> Self {
        self.fuel_type = fuel_type;
        self
    }

    /// Set the expected lifetime of the vehicle.
    pub fn lifetime_years(mut self, lifetime_years: u32) -> Self {
        self.lifetime_years = lifetime_years;
        self
    }

    /// Set the annual depreciation rate in percent.
    pub fn depreciation_rate(mut self, depreciation_rate: f64) -> Self {
        self.depreciation_rate = depreciation_rate;
        self
    }

    /// Decompose the cost of a trip of `distance_km` made on `trip_date`.
    ///
    /// `fuel_price` is the price per litre, or per kWh for electric vehicles.
    pub fn compute_trip_cost(
        &self,
        distance_km: f64,
        fuel_price: f64,
        trip_date: Date,
    ) -> CostBreakdown {
        let drafts = vec![
            self.fuel_component(distance_km, fuel_price),
            self.wear_component(distance_km),
            self.amortization_component(distance_km, trip_date),
        ];

        CostBreakdown::from_drafts(
            drafts,
            Some(format!("Trip of {distance_km} km with {}", self.name)),
        )
    }

    /// Estimate the monthly running cost for `km_per_month` kilometres.
    pub fn estimate_monthly_cost(
        &self,
        km_per_month: f64,
        average_fuel_price: f64,
        date: Date,
    ) -> CostBreakdown {
        self.compute_trip_cost(km_per_month, average_fuel_price, date)
            .with_note(format!(
                "Estimated monthly cost of {km_per_month} km with {}",
                self.name
            ))
    }

    /// The vehicle's age in years on `date`, zero for dates before the purchase.
    pub fn age_in_years(&self, date: Date) -> f64 {
        let days = (date - self.purchase_date).whole_days() as f64;

        (days / DAYS_PER_YEAR).max(0.0)
    }

    /// The estimated market value of the vehicle on `date`.
    pub fn residual_value(&self, date: Date) -> f64 {
        let retained = (100.0 - self.depreciation_rate) / 100.0;

        self.purchase_price * retained.powf(self.age_in_years(date))
    }

    fn fuel_component(&self, distance_km: f64, fuel_price: f64) -> ComponentDraft {
        let consumed = distance_km / 100.0 * self.consumption_per_100km;
        let (consumed_parameter, consumption_unit, price_unit) =
            if self.fuel_type == Some(FuelType::Electric) {
                ("kwh_consumed", "kWh/100km", "€/kWh")
            } else {
                ("litres_consumed", "L/100km", "€/L")
            };

        ComponentDraft {
            name: "Fuel",
            kind: ComponentKind::Fuel,
            value: consumed * fuel_price,
            method: format!(
                "({distance_km} km / 100) × {} {consumption_unit} × {fuel_price} {price_unit}",
                self.consumption_per_100km
            ),
            parameters: vec![
                ("distance_km", distance_km),
                (consumed_parameter, round_to(consumed, 2)),
                ("consumption_per_100km", self.consumption_per_100km),
                ("fuel_price", fuel_price),
            ],
        }
    }

    fn wear_component(&self, distance_km: f64) -> ComponentDraft {
        ComponentDraft {
            name: "Wear and maintenance",
            kind: ComponentKind::Wear,
            value: distance_km * self.maintenance_cost_per_km,
            method: format!(
                "{distance_km} km × {} €/km",
                self.maintenance_cost_per_km
            ),
            parameters: vec![
                ("distance_km", distance_km),
                ("cost_per_km", self.maintenance_cost_per_km),
            ],
        }
    }

    fn amortization_component(&self, distance_km: f64, trip_date: Date) -> ComponentDraft {
        let age_years = self.age_in_years(trip_date);
        let residual_value = self.residual_value(trip_date);
        let lifetime_km = f64::from(self.lifetime_years) * AVERAGE_ANNUAL_KM;
        let amortization_per_km = if lifetime_km > 0.0 {
            (self.purchase_price - residual_value) / lifetime_km
        } else {
            0.0
        };

        ComponentDraft {
            name: "Amortization",
            kind: ComponentKind::Amortization,
            value: distance_km * amortization_per_km,
            method: format!(
                "{distance_km} km × {:.4} €/km (value lost over {} years of {AVERAGE_ANNUAL_KM} km)",
                amortization_per_km, self.lifetime_years
            ),
            parameters: vec![
                ("age_years", round_to(age_years, 1)),
                ("purchase_price", self.purchase_price),
                ("residual_value", round_to(residual_value, 2)),
                ("depreciation_rate", self.depreciation_rate),
                ("amortization_per_km", round_to(amortization_per_km, 4)),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::{
        asset::{Asset, AssetCategory},
        cost_breakdown::{
            BreakdownError,
            breakdown::ComponentKind,
            vehicle::{DEFAULT_DEPRECIATION_RATE, DEFAULT_LIFETIME_YEARS, VehicleCostCalculator},
        },
    };

    fn panda() -> VehicleCostCalculator {
        VehicleCostCalculator::new("Fiat Panda", 5.5, 0.08, 12_000.0, date!(2020 - 01 - 01))
    }

    #[track_caller]
    fn assert_close(got: f64, want: f64) {
        assert!((got - want).abs() < 1e-9, "want {want}, got {got}");
    }

    #[test]
    fn zero_distance_costs_nothing() {
        let breakdown = panda().compute_trip_cost(0.0, 1.85, date!(2024 - 06 - 01));

        assert_eq!(breakdown.total(), 0.0);
        assert_eq!(breakdown.components().len(), 3);
        for component in breakdown.components() {
            assert_eq!(component.value(), 0.0);
            assert_eq!(component.percentage(), 0.0);
        }
    }

    #[test]
    fn fuel_cost_for_100_km() {
        let breakdown = panda().compute_trip_cost(100.0, 2.0, date!(2024 - 06 - 01));

        let fuel = breakdown.component(ComponentKind::Fuel).unwrap();
        assert_close(fuel.value(), 11.0);
        assert_close(fuel.parameter("litres_consumed").unwrap(), 5.5);
    }

    #[test]
    fn wear_cost_for_50_km() {
        let breakdown = panda().compute_trip_cost(50.0, 1.85, date!(2024 - 06 - 01));

        let wear = breakdown.component(ComponentKind::Wear).unwrap();
        assert_close(wear.value(), 4.0);
        assert_close(wear.parameter("cost_per_km").unwrap(), 0.08);
    }

    #[test]
    fn amortization_uses_exponential_depreciation() {
        let calculator = panda();
        let trip_date = date!(2024 - 01 - 01);

        let breakdown = calculator.compute_trip_cost(100.0, 1.85, trip_date);

        let age = (trip_date - date!(2020 - 01 - 01)).whole_days() as f64 / 365.25;
        let residual = 12_000.0 * 0.85f64.powf(age);
        let per_km = (12_000.0 - residual) / (10.0 * 15_000.0);
        let amortization = breakdown.component(ComponentKind::Amortization).unwrap();
        assert_close(amortization.value(), (100.0 * per_km * 100.0).round() / 100.0);
        assert_close(amortization.parameter("age_years").unwrap(), 4.0);
        assert!(amortization.value() > 0.0);
    }

    #[test]
    fn trip_before_purchase_has_no_amortization() {
        let breakdown = panda().compute_trip_cost(100.0, 1.85, date!(2019 - 06 - 01));

        let amortization = breakdown.component(ComponentKind::Amortization).unwrap();
        assert_eq!(amortization.value(), 0.0);
        assert_eq!(amortization.parameter("age_years"), Some(0.0));
    }

    #[test]
    fn percentages_sum_to_about_100() {
        for distance in [1.0, 12.5, 100.0, 873.0] {
            let breakdown = panda().compute_trip_cost(distance, 1.79, date!(2023 - 03 - 15));

            let sum = breakdown.percentage_sum();
            assert!((99.0..=101.0).contains(&sum), "sum was {sum} for {distance} km");
        }
    }

    #[test]
    fn total_is_sum_of_components() {
        let breakdown = panda().compute_trip_cost(237.0, 1.91, date!(2025 - 02 - 11));

        let sum: f64 = breakdown
            .components()
            .iter()
            .map(|component| component.value())
            .sum();
        assert!((breakdown.total() - sum).abs() < 0.005);
    }

    #[test]
    fn note_names_vehicle_and_distance() {
        let breakdown = panda().compute_trip_cost(42.0, 1.85, date!(2024 - 06 - 01));

        assert_eq!(breakdown.note(), Some("Trip of 42 km with Fiat Panda"));
    }

    #[test]
    fn monthly_estimate_matches_trip_of_same_distance() {
        let calculator = panda();
        let date = date!(2024 - 06 - 01);

        let monthly = calculator.estimate_monthly_cost(1_000.0, 1.85, date);
        let trip = calculator.compute_trip_cost(1_000.0, 1.85, date);

        assert_eq!(monthly.total(), trip.total());
        assert_eq!(monthly.components(), trip.components());
        assert_ne!(monthly.note(), trip.note());
    }

    #[test]
    fn from_asset_applies_defaults() {
        let asset = Asset {
            consumption_per_100km: Some(5.5),
            purchase_price: Some(12_000.0),
            purchase_date: Some(date!(2020 - 01 - 01)),
            ..Asset::new(1, "Fiat Panda", AssetCategory::Vehicle)
        };

        let calculator = VehicleCostCalculator::from_asset(&asset).unwrap();

        assert_eq!(calculator, panda());
        assert_eq!(calculator.lifetime_years, DEFAULT_LIFETIME_YEARS);
        assert_eq!(calculator.depreciation_rate, DEFAULT_DEPRECIATION_RATE);
    }

    #[test]
    fn from_asset_rejects_appliance() {
        let asset = Asset::new(1, "Fridge", AssetCategory::Appliance);

        let got = VehicleCostCalculator::from_asset(&asset);

        assert!(matches!(
            got,
            Err(BreakdownError::WrongCategory {
                expected: AssetCategory::Vehicle,
                actual: AssetCategory::Appliance,
                ..
            })
        ));
    }

    #[test]
    fn from_asset_requires_consumption() {
        let asset = Asset {
            purchase_price: Some(12_000.0),
            purchase_date: Some(date!(2020 - 01 - 01)),
            ..Asset::new(1, "Fiat Panda", AssetCategory::Vehicle)
        };

        let got = VehicleCostCalculator::from_asset(&asset);

        assert_eq!(
            got,
            Err(BreakdownError::MissingAttribute {
                asset: "Fiat Panda".to_owned(),
                attribute: "consumption_per_100km"
            })
        );
    }
}
