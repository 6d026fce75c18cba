//! Plan tree traversal.
//!
//! Every rollup in this crate walks the same path: plan → objectives →
//! initiatives (direct and program-parented) → main activities owned by the
//! plan's organization or shared → authoritative budget lines.

use std::collections::HashSet;

use planboard_core::{BudgetLine, MainActivity, Plan, StrategicInitiative, StrategicObjective};

use crate::resolver::{leaf_lines, LeafSource};

/// A main activity reached from a plan, with its ancestors.
#[derive(Debug, Clone, Copy)]
pub struct ActivityRef<'a> {
    /// Objective the activity sits under
    pub objective: &'a StrategicObjective,
    /// Initiative the activity belongs to
    pub initiative: &'a StrategicInitiative,
    /// The activity
    pub activity: &'a MainActivity,
}

/// A budget line reached from a plan.
#[derive(Debug, Clone, Copy)]
pub struct Leaf<'a> {
    /// Owning activity and its ancestors
    pub parent: ActivityRef<'a>,
    /// The line
    pub line: &'a BudgetLine,
    /// Which representation the line came from
    pub source: LeafSource,
}

/// Main activities of a plan that count toward its budget.
///
/// An initiative listed under more than one objective or program is visited
/// once, at its first occurrence.
pub fn plan_activities(plan: &Plan) -> Vec<ActivityRef<'_>> {
    let mut seen = HashSet::new();
    let mut refs = Vec::new();

    for objective in plan.objectives() {
        for initiative in objective.all_initiatives() {
            if !seen.insert(initiative.id) {
                continue;
            }
            for activity in &initiative.main_activities {
                if activity.visible_to(plan.organization) {
                    refs.push(ActivityRef {
                        objective,
                        initiative,
                        activity,
                    });
                }
            }
        }
    }

    refs
}

/// Every authoritative budget line of a plan.
pub fn plan_leaves(plan: &Plan) -> Vec<Leaf<'_>> {
    plan_activities(plan)
        .into_iter()
        .flat_map(|parent| {
            leaf_lines(parent.activity)
                .into_iter()
                .map(move |(line, source)| Leaf {
                    parent,
                    line,
                    source,
                })
        })
        .collect()
}
