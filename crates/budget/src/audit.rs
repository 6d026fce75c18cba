//! Data-quality audit.
//!
//! Malformed numbers resolve to zero during aggregation and never block
//! anything. This pass reports them, along with other shapes that usually
//! mean the figures on screen are not what the planner intended.

use std::fmt;

use planboard_core::{ActivityId, Amount, BudgetLine, BudgetLineId, Plan, PlanId};
use serde::Serialize;
use tracing::warn;

use crate::resolver::{leaf_lines, resolve_line_cost};
use crate::walk::plan_activities;

/// What looks wrong.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningKind {
    /// A numeric field held text that is not a number; counted as zero
    MalformedField {
        /// Field name
        field: &'static str,
        /// Raw value
        raw: String,
    },
    /// The line's authoritative cost is zero
    ZeroCost,
    /// The activity has sub-activities and a legacy budget; the legacy budget is ignored
    ShadowedLegacyBudget,
}

/// A non-blocking data-quality finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQualityWarning {
    /// Plan
    pub plan: PlanId,
    /// Main activity
    pub activity: ActivityId,
    /// Budget line, when the finding is about one
    pub line: Option<BudgetLineId>,
    /// Finding
    #[serde(flatten)]
    pub kind: WarningKind,
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plan {} activity {}", self.plan, self.activity)?;
        if let Some(line) = self.line {
            write!(f, " line {}", line)?;
        }
        match &self.kind {
            WarningKind::MalformedField { field, raw } => {
                write!(f, ": {} is not a number ({:?}), counted as 0", field, raw)
            }
            WarningKind::ZeroCost => write!(f, ": estimated cost is 0"),
            WarningKind::ShadowedLegacyBudget => {
                write!(f, ": legacy budget ignored because sub-activities exist")
            }
        }
    }
}

fn amount_fields(line: &BudgetLine) -> [(&'static str, &Amount); 6] {
    [
        ("estimated_cost_with_tool", &line.estimated_cost_with_tool),
        ("estimated_cost_without_tool", &line.estimated_cost_without_tool),
        ("government_treasury", &line.government_treasury),
        ("partners_funding", &line.partners_funding),
        ("sdg_funding", &line.sdg_funding),
        ("other_funding", &line.other_funding),
    ]
}

/// Audit every counted activity and line of a plan.
pub fn audit_plan(plan: &Plan) -> Vec<DataQualityWarning> {
    let mut warnings = Vec::new();

    for r in plan_activities(plan) {
        let activity = r.activity.id;

        if r.activity.has_conflicting_budgets() {
            warnings.push(DataQualityWarning {
                plan: plan.id,
                activity,
                line: None,
                kind: WarningKind::ShadowedLegacyBudget,
            });
        }

        for (line, _) in leaf_lines(r.activity) {
            for (field, amount) in amount_fields(line) {
                if let Amount::Malformed(raw) = amount {
                    warnings.push(DataQualityWarning {
                        plan: plan.id,
                        activity,
                        line: line.id,
                        kind: WarningKind::MalformedField {
                            field,
                            raw: raw.clone(),
                        },
                    });
                }
            }

            if resolve_line_cost(line) == 0.0 {
                warnings.push(DataQualityWarning {
                    plan: plan.id,
                    activity,
                    line: line.id,
                    kind: WarningKind::ZeroCost,
                });
            }
        }
    }

    for warning in &warnings {
        warn!("{}", warning);
    }

    warnings
}
