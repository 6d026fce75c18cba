//! Budget line resolution.
//!
//! A main activity's cost comes from exactly one of its two budget
//! representations: the itemized sub-activities when there are any, otherwise
//! the legacy single budget. They are never added together.

use planboard_core::{BudgetCalculationType, BudgetLine, MainActivity};

/// Where a leaf line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafSource {
    /// One of the activity's sub-activities
    SubActivity,
    /// The activity's legacy single budget
    LegacyBudget,
}

/// The authoritative budget lines of an activity, in order.
pub fn leaf_lines(activity: &MainActivity) -> Vec<(&BudgetLine, LeafSource)> {
    if !activity.sub_activities.is_empty() {
        activity
            .sub_activities
            .iter()
            .map(|line| (line, LeafSource::SubActivity))
            .collect()
    } else {
        activity
            .budget
            .iter()
            .map(|line| (line, LeafSource::LegacyBudget))
            .collect()
    }
}

/// Cost of one line: the estimate selected by its calculation type.
pub fn resolve_line_cost(line: &BudgetLine) -> f64 {
    match line.budget_calculation_type {
        BudgetCalculationType::WithTool => line.estimated_cost_with_tool.value(),
        BudgetCalculationType::WithoutTool => line.estimated_cost_without_tool.value(),
    }
}

/// Cost of a main activity.
pub fn resolve_cost(activity: &MainActivity) -> f64 {
    leaf_lines(activity)
        .into_iter()
        .map(|(line, _)| resolve_line_cost(line))
        .sum()
}
