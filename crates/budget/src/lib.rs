//! Budget aggregation for Planboard.
//!
//! Walks plan trees down to their costed budget lines and rolls the figures
//! up per plan, organization, month, plan type and activity type.

#![warn(missing_docs)]

pub mod resolver;
pub mod funding;
pub mod walk;
pub mod aggregator;
pub mod audit;
pub mod dashboard;

pub use resolver::{leaf_lines, resolve_cost, resolve_line_cost, LeafSource};
pub use funding::{tally_funding, FundingTally};
pub use walk::{plan_activities, plan_leaves, ActivityRef, Leaf};
pub use aggregator::{
    aggregate, aggregate_by_month, aggregate_by_organization, aggregate_by_plan,
    aggregate_by_status, aggregate_by_type, aggregate_plan, summarize_activity,
    ActivityBudgetRow, BudgetTotals, MonthKey, MonthlyTotals, ObjectiveBudget, PlanBudgetReport,
    TypeBucket,
};
pub use audit::{audit_plan, DataQualityWarning, WarningKind};
pub use dashboard::{
    BudgetDashboard, DashboardQuery, DashboardReport, OrganizationRollup, TypeRollup,
};
