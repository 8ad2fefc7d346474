//! The result types produced by the cost calculators.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{asset::AssetId, text_enum::text_enum};

/// The currency every cost component is expressed in.
pub const CURRENCY_UNIT: &str = "EUR";

text_enum! {
    /// What a cost component measures.
    pub enum ComponentKind {
        /// Fuel burnt (or charge used) by a vehicle.
        Fuel => "fuel",
        /// Maintenance, tyres and other wear proportional to distance.
        Wear => "wear",
        /// The share of the purchase price used up by the event.
        Amortization => "amortization",
        /// Electricity drawn by an appliance.
        Energy => "energy",
    }
}

/// One named share of the cost of a usage event.
///
/// Components are read-only once computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostComponent {
    name: String,
    kind: ComponentKind,
    value: f64,
    unit: String,
    percentage: f64,
    method: String,
    parameters: BTreeMap<String, f64>,
}

impl CostComponent {
    /// A human readable name, e.g. "Fuel".
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind of cost.
    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    /// The cost in euros, rounded to cents.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// The currency of [CostComponent::value].
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// This component's share of the total in percent, rounded to one decimal.
    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    /// A description of how the value was calculated.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The numeric inputs and intermediate values of the calculation.
    pub fn parameters(&self) -> &BTreeMap<String, f64> {
        &self.parameters
    }

    /// Look up a single parameter by name.
    pub fn parameter(&self, name: &str) -> Option<f64> {
        self.parameters.get(name).copied()
    }
}

/// The decomposition of a usage event's cost into its components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    total: f64,
    components: Vec<CostComponent>,
    asset_id: Option<AssetId>,
    note: Option<String>,
}

impl CostBreakdown {
    /// Round each draft to cents and derive the total and percentages.
    ///
    /// The total is the sum of the rounded component values so that the
    /// displayed components always add up to the displayed total.
    pub(crate) fn from_drafts(drafts: Vec<ComponentDraft>, note: Option<String>) -> Self {
        let values: Vec<f64> = drafts
            .iter()
            .map(|draft| round_to(draft.value, 2))
            .collect();
        let total = round_to(values.iter().sum(), 2);

        let components = drafts
            .into_iter()
            .zip(values)
            .map(|(draft, value)| CostComponent {
                name: draft.name.to_owned(),
                kind: draft.kind,
                value,
                unit: CURRENCY_UNIT.to_owned(),
                percentage: percentage_of(value, total),
                method: draft.method,
                parameters: draft
                    .parameters
                    .into_iter()
                    .map(|(name, value)| (name.to_owned(), value))
                    .collect(),
            })
            .collect();

        Self {
            total,
            components,
            asset_id: None,
            note,
        }
    }

    /// Tag the breakdown with the asset it was computed for.
    pub fn with_asset_id(self, asset_id: AssetId) -> Self {
        Self {
            asset_id: Some(asset_id),
            ..self
        }
    }

    pub(crate) fn with_note(self, note: String) -> Self {
        Self {
            note: Some(note),
            ..self
        }
    }

    /// The total cost in euros.
    pub fn total(&self) -> f64 {
        self.total
    }

    /// The components in calculation order.
    pub fn components(&self) -> &[CostComponent] {
        &self.components
    }

    /// The first component of the given kind, if any.
    pub fn component(&self, kind: ComponentKind) -> Option<&CostComponent> {
        self.components
            .iter()
            .find(|component| component.kind == kind)
    }

    /// The asset the breakdown was computed for, if known.
    pub fn asset_id(&self) -> Option<AssetId> {
        self.asset_id
    }

    /// A short description of the usage event.
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// The sum of the component percentages.
    ///
    /// This is 100 within rounding error unless the total is zero.
    pub fn percentage_sum(&self) -> f64 {
        self.components
            .iter()
            .map(|component| component.percentage)
            .sum()
    }
}

/// An unrounded component produced by a calculator.
#[derive(Debug)]
pub(crate) struct ComponentDraft {
    pub name: &'static str,
    pub kind: ComponentKind,
    pub value: f64,
    pub method: String,
    pub parameters: Vec<(&'static str, f64)>,
}

/// Round `value` half away from zero to `decimals` decimal places.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);

    (value * factor).round() / factor
}

fn percentage_of(value: f64, total: f64) -> f64 {
    if total > 0.0 {
        round_to(value / total * 100.0, 1)
    } else {
        0.0
    }
}
