//! Budget rollups.
//!
//! All groupings are built from the same per-plan pass over
//! [`plan_leaves`], so a plan contributes identical figures whether it is
//! aggregated alone, with its organization, or within a month.

use std::collections::BTreeMap;
use std::fmt;

use chrono::Datelike;
use planboard_core::{
    ActivityId, ActivityType, InitiativeId, MainActivity, ObjectiveId, OrganizationId, Plan,
    PlanId, PlanStatus, PlanType,
};
use serde::{Serialize, Serializer};

use crate::funding::{tally_funding, FundingTally};
use crate::resolver::leaf_lines;
use crate::walk::{plan_activities, plan_leaves, Leaf};

/// Count and cost of the leaves of one activity type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TypeBucket {
    /// Number of leaves
    pub count: usize,
    /// Summed resolved cost
    pub budget: f64,
}

/// Budget and funding totals over a set of plans.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetTotals {
    /// Plans included
    pub plan_count: usize,
    /// Leaves included
    pub leaf_count: usize,
    /// Summed resolved cost
    pub total_budget: f64,
    /// Government treasury funding
    pub total_government: f64,
    /// Partner funding
    pub total_partners: f64,
    /// SDG funding
    pub total_sdg: f64,
    /// Other funding
    pub total_other: f64,
    /// All funding sources
    pub total_available: f64,
    /// Sum of per-leaf gaps
    pub funding_gap: f64,
    /// Per activity type; every type is present, empty ones at zero
    pub budget_by_activity_type: BTreeMap<ActivityType, TypeBucket>,
}

impl Default for BudgetTotals {
    fn default() -> Self {
        Self {
            plan_count: 0,
            leaf_count: 0,
            total_budget: 0.0,
            total_government: 0.0,
            total_partners: 0.0,
            total_sdg: 0.0,
            total_other: 0.0,
            total_available: 0.0,
            funding_gap: 0.0,
            budget_by_activity_type: ActivityType::ALL
                .into_iter()
                .map(|t| (t, TypeBucket::default()))
                .collect(),
        }
    }
}

impl BudgetTotals {
    fn add_leaf(&mut self, leaf: &Leaf<'_>) {
        let tally = tally_funding(leaf.line);

        self.leaf_count += 1;
        self.total_budget += tally.cost;
        self.total_government += tally.government;
        self.total_partners += tally.partners;
        self.total_sdg += tally.sdg;
        self.total_other += tally.other;
        self.total_available += tally.available;
        self.funding_gap += tally.gap;

        let bucket = self
            .budget_by_activity_type
            .entry(leaf.line.activity_type)
            .or_default();
        bucket.count += 1;
        bucket.budget += tally.cost;
    }

    fn add_plan(&mut self, plan: &Plan) {
        self.plan_count += 1;
        for leaf in plan_leaves(plan) {
            self.add_leaf(&leaf);
        }
    }

    /// Funding gap as a share of the total budget, in percent.
    pub fn gap_ratio(&self) -> f64 {
        if self.total_budget > 0.0 {
            self.funding_gap / self.total_budget * 100.0
        } else {
            0.0
        }
    }
}

/// Aggregate a batch of plans.
pub fn aggregate<'a>(plans: impl IntoIterator<Item = &'a Plan>) -> BudgetTotals {
    let mut totals = BudgetTotals::default();
    for plan in plans {
        totals.add_plan(plan);
    }
    totals
}

/// Totals of a single plan.
pub fn aggregate_plan(plan: &Plan) -> BudgetTotals {
    aggregate([plan])
}

/// Per-plan totals for a batch.
pub fn aggregate_by_plan(plans: &[Plan]) -> BTreeMap<PlanId, BudgetTotals> {
    plans.iter().map(|p| (p.id, aggregate_plan(p))).collect()
}

/// Totals grouped by owning organization.
pub fn aggregate_by_organization(plans: &[Plan]) -> BTreeMap<OrganizationId, BudgetTotals> {
    group_by(plans, |p| p.organization)
}

/// Totals grouped by lifecycle status.
pub fn aggregate_by_status(plans: &[Plan]) -> BTreeMap<PlanStatus, BudgetTotals> {
    group_by(plans, |p| p.status)
}

/// Totals grouped by plan type.
pub fn aggregate_by_type(plans: &[Plan]) -> Vec<(PlanType, BudgetTotals)> {
    let mut groups: Vec<(PlanType, BudgetTotals)> = Vec::new();
    for plan in plans {
        match groups.iter_mut().find(|(t, _)| *t == plan.plan_type) {
            Some((_, totals)) => totals.add_plan(plan),
            None => groups.push((plan.plan_type, aggregate_plan(plan))),
        }
    }
    groups
}

fn group_by<K: Ord>(plans: &[Plan], key: impl Fn(&Plan) -> K) -> BTreeMap<K, BudgetTotals> {
    let mut groups: BTreeMap<K, BudgetTotals> = BTreeMap::new();
    for plan in plans {
        groups.entry(key(plan)).or_default().add_plan(plan);
    }
    groups
}

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    /// Year
    pub year: i32,
    /// Month, 1-12
    pub month: u32,
}

impl MonthKey {
    /// Month a timestamp falls in.
    pub fn of<D: Datelike>(date: &D) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Totals grouped by submission month.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthlyTotals {
    /// Plans with a submission date, by month
    pub months: BTreeMap<MonthKey, BudgetTotals>,
    /// Plans never submitted
    pub undated: BudgetTotals,
}

/// Group plans by the month of `submitted_at`.
pub fn aggregate_by_month(plans: &[Plan]) -> MonthlyTotals {
    let mut monthly = MonthlyTotals::default();
    for plan in plans {
        match plan.submitted_at {
            Some(at) => monthly
                .months
                .entry(MonthKey::of(&at))
                .or_default()
                .add_plan(plan),
            None => monthly.undated.add_plan(plan),
        }
    }
    monthly
}

/// Funding summary of one main activity across its authoritative lines.
pub fn summarize_activity(activity: &MainActivity) -> FundingTally {
    let mut total = FundingTally::default();
    for (line, _) in leaf_lines(activity) {
        total.add(&tally_funding(line));
    }
    total
}

/// One activity row of a [`PlanBudgetReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityBudgetRow {
    /// Objective
    pub objective: ObjectiveId,
    /// Initiative
    pub initiative: InitiativeId,
    /// Activity
    pub activity: ActivityId,
    /// Activity name
    pub name: String,
    /// Number of authoritative lines
    pub line_count: usize,
    /// Funding summary
    pub funding: FundingTally,
}

/// Totals of one objective within a plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectiveBudget {
    /// Objective
    pub objective: ObjectiveId,
    /// Objective title
    pub title: String,
    /// Totals over the objective's leaves
    pub totals: BudgetTotals,
}

/// Budget breakdown of a single plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanBudgetReport {
    /// Plan
    pub plan: PlanId,
    /// Owning organization
    pub organization: OrganizationId,
    /// Lifecycle status
    pub status: PlanStatus,
    /// Whole-plan totals
    pub totals: BudgetTotals,
    /// Per objective, in plan order
    pub objectives: Vec<ObjectiveBudget>,
    /// Per main activity, in plan order
    pub activities: Vec<ActivityBudgetRow>,
}

impl PlanBudgetReport {
    /// Build the breakdown for `plan`.
    pub fn build(plan: &Plan) -> Self {
        let leaves = plan_leaves(plan);

        let objectives = plan
            .objectives()
            .iter()
            .map(|objective| {
                let mut totals = BudgetTotals::default();
                for leaf in leaves.iter().filter(|l| l.parent.objective.id == objective.id) {
                    totals.add_leaf(leaf);
                }
                ObjectiveBudget {
                    objective: objective.id,
                    title: objective.title.clone(),
                    totals,
                }
            })
            .collect();

        let activities = plan_activities(plan)
            .into_iter()
            .map(|r| ActivityBudgetRow {
                objective: r.objective.id,
                initiative: r.initiative.id,
                activity: r.activity.id,
                name: r.activity.name.clone(),
                line_count: leaf_lines(r.activity).len(),
                funding: summarize_activity(r.activity),
            })
            .collect();

        Self {
            plan: plan.id,
            organization: plan.organization,
            status: plan.status,
            totals: aggregate_plan(plan),
            objectives,
            activities,
        }
    }
}
