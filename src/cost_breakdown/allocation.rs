//! Splitting a utility bill between appliances or rooms.

use serde::{Deserialize, Serialize};

use crate::cost_breakdown::appliance::ApplianceLoad;

/// The largest bill that can be split.
pub const MAX_BILL_TOTAL: f64 = 1e12;

/// The share of a bill assigned to one label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    /// The appliance or room name.
    pub label: String,
    /// The amount in euros, rounded to cents.
    pub amount: f64,
}

/// A label with a relative weight, e.g. a room and its floor area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedLabel {
    /// The name to report the allocation under.
    pub label: String,
    /// The relative weight, must not be negative.
    pub weight: f64,
}

/// Split `total` between appliances in proportion to their estimated
/// consumption over `days` days.
///
/// Every appliance is allocated zero if the total estimated consumption is
/// zero.
pub fn allocate_by_appliance_consumption(
    total: f64,
    appliances: &[ApplianceLoad],
    days: u32,
) -> Vec<Allocation> {
    let shares = appliances
        .iter()
        .map(|appliance| (appliance.label.as_str(), appliance.estimated_kwh(days)))
        .collect::<Vec<_>>();

    allocate_proportionally(total, &shares)
}

/// Split `total` between labels in proportion to their weights.
///
/// Every label is allocated zero if the weights sum to zero.
pub fn allocate_by_weights(total: f64, weights: &[WeightedLabel]) -> Vec<Allocation> {
    let shares = weights
        .iter()
        .map(|weighted| (weighted.label.as_str(), weighted.weight))
        .collect::<Vec<_>>();

    allocate_proportionally(total, &shares)
}

/// Allocate whole cents with the largest remainder method so the amounts add
/// up to `total` exactly. Ties go to the earlier label.
fn allocate_proportionally(total: f64, shares: &[(&str, f64)]) -> Vec<Allocation> {
    let share_sum: f64 = shares.iter().map(|(_, share)| share).sum();

    if share_sum <= 0.0 {
        return shares
            .iter()
            .map(|(label, _)| Allocation {
                label: (*label).to_owned(),
                amount: 0.0,
            })
            .collect();
    }

    let total_cents = (total * 100.0).round() as i128;
    let exact_cents: Vec<f64> = shares
        .iter()
        .map(|(_, share)| total_cents as f64 * share / share_sum)
        .collect();
    let mut cents: Vec<i128> = exact_cents.iter().map(|exact| exact.floor() as i128).collect();

    let leftover = total_cents - cents.iter().sum::<i128>();
    let mut by_remainder: Vec<usize> = (0..shares.len()).collect();
    by_remainder.sort_by(|&a, &b| {
        let remainder_a = exact_cents[a] - exact_cents[a].floor();
        let remainder_b = exact_cents[b] - exact_cents[b].floor();
        remainder_b.total_cmp(&remainder_a)
    });

    for &index in by_remainder
        .iter()
        .take(usize::try_from(leftover).unwrap_or(0))
    {
        cents[index] += 1;
    }

    shares
        .iter()
        .zip(cents)
        .map(|((label, _), cents)| Allocation {
            label: (*label).to_owned(),
            amount: cents as f64 / 100.0,
        })
        .collect()
}
