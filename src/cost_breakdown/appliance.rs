//! Cost of running an electrical appliance.

use crate::{
    asset::{Asset, AssetCategory},
    cost_breakdown::{
        BreakdownError,
        breakdown::{ComponentDraft, ComponentKind, CostBreakdown, round_to},
        vehicle::DEFAULT_LIFETIME_YEARS,
    },
};

/// The number of days used for monthly estimates.
pub const DAYS_PER_MONTH: u32 = 30;
/// The number of days used for annual estimates.
pub const DAYS_PER_YEAR: u32 = 365;

/// Computes energy and amortization costs for an appliance over a period.
///
/// Unlike vehicles, appliances depreciate on a straight line: every day of
/// the lifetime costs the same share of the purchase price.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplianceCostCalculator {
    name: String,
    power_watts: f64,
    daily_usage_hours: f64,
    purchase_price: f64,
    lifetime_years: u32,
}

impl ApplianceCostCalculator {
    /// Create a calculator with the default lifetime.
    pub fn new(name: &str, power_watts: f64, daily_usage_hours: f64, purchase_price: f64) -> Self {
        Self {
            name: name.to_owned(),
            power_watts,
            daily_usage_hours,
            purchase_price,
            lifetime_years: DEFAULT_LIFETIME_YEARS,
        }
    }

    /// Build a calculator from a stored asset.
    ///
    /// # Errors
    /// Returns [BreakdownError::WrongCategory] if the asset is not an appliance and
    /// [BreakdownError::MissingAttribute] if the power, daily usage or purchase
    /// price is not set.
    pub fn from_asset(asset: &Asset) -> Result<Self, BreakdownError> {
        let load = ApplianceLoad::from_asset(asset)?;
        let purchase_price =
            asset
                .purchase_price
                .ok_or_else(|| BreakdownError::MissingAttribute {
                    asset: asset.name.clone(),
                    attribute: "purchase_price",
                })?;

        Ok(Self::new(
            &asset.name,
            load.power_watts,
            load.daily_usage_hours,
            purchase_price,
        )
        .lifetime_years(asset.lifetime_years.unwrap_or(DEFAULT_LIFETIME_YEARS)))
    }

    /// Set the expected lifetime of the appliance.
    pub fn lifetime_years(mut self, lifetime_years: u32) -> Self {
        self.lifetime_years = lifetime_years;
        self
    }

    /// Decompose the cost of running the appliance for `days` days.
    ///
    /// When `actual_total_hours` is given it replaces the estimate of daily
    /// usage hours times `days`.
    pub fn compute_period_cost(
        &self,
        days: u32,
        kwh_price: f64,
        actual_total_hours: Option<f64>,
    ) -> CostBreakdown {
        let hours =
            actual_total_hours.unwrap_or(self.daily_usage_hours * f64::from(days));

        let drafts = vec![
            self.energy_component(days, hours, kwh_price),
            self.amortization_component(days),
        ];

        CostBreakdown::from_drafts(
            drafts,
            Some(format!("{days} days of {}", self.name)),
        )
    }

    /// The cost of a typical month.
    pub fn compute_monthly_cost(&self, kwh_price: f64) -> CostBreakdown {
        self.compute_period_cost(DAYS_PER_MONTH, kwh_price, None)
    }

    /// The cost of a typical year.
    pub fn compute_annual_cost(&self, kwh_price: f64) -> CostBreakdown {
        self.compute_period_cost(DAYS_PER_YEAR, kwh_price, None)
    }

    /// The power draw and usage pattern of this appliance.
    pub fn load(&self) -> ApplianceLoad {
        ApplianceLoad {
            label: self.name.clone(),
            power_watts: self.power_watts,
            daily_usage_hours: self.daily_usage_hours,
        }
    }

    fn energy_component(&self, days: u32, hours: f64, kwh_price: f64) -> ComponentDraft {
        let kwh = self.power_watts / 1000.0 * hours;

        ComponentDraft {
            name: "Electricity",
            kind: ComponentKind::Energy,
            value: kwh * kwh_price,
            method: format!(
                "{} W × {:.1} h = {:.2} kWh × {kwh_price} €/kWh",
                self.power_watts, hours, kwh
            ),
            parameters: vec![
                ("power_watts", self.power_watts),
                ("hours", round_to(hours, 1)),
                ("kwh_consumed", round_to(kwh, 2)),
                ("kwh_price", kwh_price),
                ("days", f64::from(days)),
            ],
        }
    }

    fn amortization_component(&self, days: u32) -> ComponentDraft {
        let lifetime_days = f64::from(self.lifetime_years) * f64::from(DAYS_PER_YEAR);
        let daily_amortization = if lifetime_days > 0.0 {
            self.purchase_price / lifetime_days
        } else {
            0.0
        };

        ComponentDraft {
            name: "Amortization",
            kind: ComponentKind::Amortization,
            value: daily_amortization * f64::from(days),
            method: format!(
                "{} € / ({} years × {DAYS_PER_YEAR} days) × {days} days",
                self.purchase_price, self.lifetime_years
            ),
            parameters: vec![
                ("days", f64::from(days)),
                ("purchase_price", self.purchase_price),
                ("lifetime_years", f64::from(self.lifetime_years)),
                ("daily_amortization", round_to(daily_amortization, 4)),
            ],
        }
    }
}

/// The power draw and usage pattern of an appliance, used to split a bill.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplianceLoad {
    /// The name to report the allocation under.
    pub label: String,
    /// The rated power in watts.
    pub power_watts: f64,
    /// The average hours of use per day.
    pub daily_usage_hours: f64,
}

impl ApplianceLoad {
    /// Read the load of an appliance asset.
    ///
    /// # Errors
    /// Returns [BreakdownError::WrongCategory] if the asset is not an appliance and
    /// [BreakdownError::MissingAttribute] if the power or daily usage is not set.
    pub fn from_asset(asset: &Asset) -> Result<Self, BreakdownError> {
        if asset.category != AssetCategory::Appliance {
            return Err(BreakdownError::WrongCategory {
                asset: asset.name.clone(),
                expected: AssetCategory::Appliance,
                actual: asset.category,
            });
        }

        let missing = |attribute| BreakdownError::MissingAttribute {
            asset: asset.name.clone(),
            attribute,
        };

        Ok(Self {
            label: asset.name.clone(),
            power_watts: asset.power_watts.ok_or_else(|| missing("power_watts"))?,
            daily_usage_hours: asset
                .daily_usage_hours
                .ok_or_else(|| missing("daily_usage_hours"))?,
        })
    }

    /// The estimated energy use in kWh over `days` days.
    pub fn estimated_kwh(&self, days: u32) -> f64 {
        self.power_watts / 1000.0 * self.daily_usage_hours * f64::from(days)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::{
        asset::{Asset, AssetCategory},
        cost_breakdown::{
            BreakdownError,
            appliance::{ApplianceCostCalculator, ApplianceLoad},
            breakdown::ComponentKind,
        },
    };

    fn fridge() -> ApplianceCostCalculator {
        ApplianceCostCalculator::new("Fridge", 150.0, 24.0, 600.0)
    }

    #[track_caller]
    fn assert_close(got: f64, want: f64) {
        assert!((got - want).abs() < 1e-9, "want {want}, got {got}");
    }

    #[test]
    fn very_long_lifetimes_amortize_to_almost_nothing() {
        let breakdown = fridge()
            .lifetime_years(u32::MAX)
            .compute_period_cost(30, 0.30, None);

        let amortization = breakdown.component(ComponentKind::Amortization).unwrap();
        assert!(amortization.value() < 0.01);
    }

    #[test]
    fn energy_cost_for_a_month() {
        let breakdown = fridge().compute_period_cost(30, 0.30, None);

        let energy = breakdown.component(ComponentKind::Energy).unwrap();
        assert_close(energy.parameter("kwh_consumed").unwrap(), 108.0);
        assert_close(energy.value(), 32.4);
    }

    #[test]
    fn amortization_is_straight_line() {
        let breakdown = fridge().compute_period_cost(30, 0.30, None);

        let amortization = breakdown.component(ComponentKind::Amortization).unwrap();
        // 600 / (10 × 365) × 30 = 4.93
        assert_close(amortization.value(), 4.93);
        assert_close(amortization.parameter("daily_amortization").unwrap(), 0.1644);
    }

    #[test]
    fn actual_hours_replace_estimate() {
        let washer = ApplianceCostCalculator::new("Washer", 2000.0, 1.5, 500.0);

        let breakdown = washer.compute_period_cost(30, 0.25, Some(20.0));

        let energy = breakdown.component(ComponentKind::Energy).unwrap();
        assert_close(energy.parameter("hours").unwrap(), 20.0);
        assert_close(energy.parameter("kwh_consumed").unwrap(), 40.0);
        assert_close(energy.value(), 10.0);
    }

    #[test]
    fn zero_days_costs_nothing() {
        let breakdown = fridge().compute_period_cost(0, 0.30, None);

        assert_eq!(breakdown.total(), 0.0);
        assert!(
            breakdown
                .components()
                .iter()
                .all(|component| component.percentage() == 0.0)
        );
    }

    #[test]
    fn percentages_sum_to_about_100() {
        let breakdown = fridge().compute_annual_cost(0.27);

        let sum = breakdown.percentage_sum();
        assert!((99.0..=101.0).contains(&sum), "sum was {sum}");
    }

    #[test]
    fn monthly_and_annual_wrappers_use_fixed_periods() {
        let calculator = fridge();

        assert_eq!(
            calculator.compute_monthly_cost(0.3),
            calculator.compute_period_cost(30, 0.3, None)
        );
        assert_eq!(
            calculator.compute_annual_cost(0.3),
            calculator.compute_period_cost(365, 0.3, None)
        );
    }

    #[test]
    fn from_asset_requires_power() {
        let asset = Asset {
            daily_usage_hours: Some(24.0),
            purchase_price: Some(600.0),
            ..Asset::new(3, "Fridge", AssetCategory::Appliance)
        };

        let got = ApplianceCostCalculator::from_asset(&asset);

        assert_eq!(
            got,
            Err(BreakdownError::MissingAttribute {
                asset: "Fridge".to_owned(),
                attribute: "power_watts"
            })
        );
    }

    #[test]
    fn from_asset_rejects_vehicle() {
        let asset = Asset {
            purchase_date: Some(date!(2021 - 05 - 01)),
            ..Asset::new(1, "Fiat Panda", AssetCategory::Vehicle)
        };

        let got = ApplianceLoad::from_asset(&asset);

        assert!(matches!(
            got,
            Err(BreakdownError::WrongCategory {
                expected: AssetCategory::Appliance,
                actual: AssetCategory::Vehicle,
                ..
            })
        ));
    }

    #[test]
    fn load_estimates_kwh() {
        let load = fridge().load();

        assert_close(load.estimated_kwh(30), 108.0);
    }
}
