//! Create/update payloads sent to the backend.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::activity::PeriodTargets;
use crate::amount::lenient;
use crate::id::{InitiativeId, ObjectiveId, OrganizationId, ProgramId};
use crate::plan::{PlanStatus, PlanType};

/// A plan being prepared by a planner. Never persisted as such: it becomes a
/// [`NewPlan`] with status `SUBMITTED` at submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanDraft {
    /// Owning organization
    #[serde(default)]
    pub organization: Option<OrganizationId>,

    /// Planner name
    #[serde(default)]
    pub planner_name: String,

    /// Plan type
    #[serde(rename = "type", default)]
    pub plan_type: PlanType,

    /// Executive responsible for the plan
    #[serde(default)]
    pub executive_name: Option<String>,

    /// Fiscal year label
    #[serde(default)]
    pub fiscal_year: Option<String>,

    /// Period start
    #[serde(default)]
    pub from_date: Option<NaiveDate>,

    /// Period end
    #[serde(default)]
    pub to_date: Option<NaiveDate>,

    /// Selected objectives, in selection order
    #[serde(default)]
    pub selected_objectives: Vec<ObjectiveId>,

    /// Effective weight of each selected objective at submission time
    #[serde(default, deserialize_with = "lenient::number_map")]
    pub selected_objectives_weights: BTreeMap<ObjectiveId, f64>,
}

impl PlanDraft {
    /// Build the create-plan payload.
    ///
    /// Returns `None` when no organization is set.
    pub fn to_payload(&self) -> Option<NewPlan> {
        Some(NewPlan {
            organization: self.organization?,
            planner_name: self.planner_name.trim().to_string(),
            plan_type: self.plan_type,
            executive_name: self.executive_name.clone(),
            strategic_objective: self.selected_objectives.first().copied(),
            fiscal_year: self.fiscal_year.clone(),
            from_date: self.from_date,
            to_date: self.to_date,
            status: PlanStatus::Submitted,
            selected_objectives: self.selected_objectives.clone(),
            selected_objectives_weights: self.selected_objectives_weights.clone(),
        })
    }
}

/// Create-plan payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlan {
    /// Owning organization
    pub organization: OrganizationId,
    /// Planner name, trimmed
    pub planner_name: String,
    /// Plan type
    #[serde(rename = "type")]
    pub plan_type: PlanType,
    /// Executive responsible for the plan
    pub executive_name: Option<String>,
    /// First selected objective
    pub strategic_objective: Option<ObjectiveId>,
    /// Fiscal year label
    pub fiscal_year: Option<String>,
    /// Period start
    pub from_date: Option<NaiveDate>,
    /// Period end
    pub to_date: Option<NaiveDate>,
    /// Always `SUBMITTED`
    pub status: PlanStatus,
    /// Selected objectives
    pub selected_objectives: Vec<ObjectiveId>,
    /// Weights fixed at submission
    pub selected_objectives_weights: BTreeMap<ObjectiveId, f64>,
}

/// Create/update payload for a strategic initiative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiativeInput {
    /// Initiative name
    pub name: String,
    /// Share of the parent's weight
    pub weight: f64,
    /// Parent objective; set this or `program`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategic_objective: Option<ObjectiveId>,
    /// Parent program; set this or `strategic_objective`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<ProgramId>,
    /// Owning organization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<OrganizationId>,
    /// Catalogue entry the name was picked from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiative_feed: Option<i64>,
}

/// Create/update payload for a performance measure or a main activity; both
/// carry the same weighted, period-targeted shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetedItemInput {
    /// Parent initiative
    pub initiative: InitiativeId,
    /// Item name
    pub name: String,
    /// Share of the initiative's weight
    pub weight: f64,
    /// Targets and reporting periods
    #[serde(flatten)]
    pub targets: PeriodTargets,
    /// Owning organization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<OrganizationId>,
}
