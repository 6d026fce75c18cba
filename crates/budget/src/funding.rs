//! Funding source tally for a single budget line.

use planboard_core::BudgetLine;
use serde::Serialize;

use crate::resolver::resolve_line_cost;

/// A line's cost split by funding source, with the uncovered remainder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FundingTally {
    /// Resolved cost
    pub cost: f64,
    /// Government treasury
    pub government: f64,
    /// Partners
    pub partners: f64,
    /// Development programs (SDG)
    pub sdg: f64,
    /// Other sources
    pub other: f64,
    /// Sum of all sources
    pub available: f64,
    /// Unfunded part of the cost, never negative
    pub gap: f64,
}

impl FundingTally {
    /// Add another tally field by field.
    ///
    /// Gaps are summed as-is: one line's surplus never offsets another line's
    /// shortfall.
    pub fn add(&mut self, other: &FundingTally) {
        self.cost += other.cost;
        self.government += other.government;
        self.partners += other.partners;
        self.sdg += other.sdg;
        self.other += other.other;
        self.available += other.available;
        self.gap += other.gap;
    }
}

/// Tally one line's funding against its resolved cost.
pub fn tally_funding(line: &BudgetLine) -> FundingTally {
    let cost = resolve_line_cost(line);
    let government = line.government_treasury.value();
    let partners = line.partners_funding.value();
    let sdg = line.sdg_funding.value();
    let other = line.other_funding.value();
    let available = government + partners + sdg + other;

    FundingTally {
        cost,
        government,
        partners,
        sdg,
        other,
        available,
        gap: (cost - available).max(0.0),
    }
}
