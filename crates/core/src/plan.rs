//! Plan model - an organization's submission for a planning cycle.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::amount::lenient;
use crate::id::{ObjectiveId, OrganizationId, PlanId, ProgramId, ReviewId, UserId};
use crate::objective::StrategicObjective;
use crate::Time;

/// An organization's plan for one planning cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Unique identifier
    pub id: PlanId,

    /// Owning organization
    pub organization: OrganizationId,

    /// Owning organization's display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,

    /// Name of the planner who prepared the plan
    #[serde(default)]
    pub planner_name: String,

    /// Plan type
    #[serde(rename = "type", default)]
    pub plan_type: PlanType,

    /// Executive responsible for the plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executive_name: Option<String>,

    /// Primary objective (older plans carry only this)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategic_objective: Option<ObjectiveId>,

    /// Primary program
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<ProgramId>,

    /// Fiscal year label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiscal_year: Option<String>,

    /// Period start
    #[serde(default)]
    pub from_date: Option<NaiveDate>,

    /// Period end
    #[serde(default)]
    pub to_date: Option<NaiveDate>,

    /// Lifecycle status
    pub status: PlanStatus,

    /// When the plan was submitted
    #[serde(default)]
    pub submitted_at: Option<Time>,

    /// Selected objectives, in selection order
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub selected_objectives: Vec<ObjectiveId>,

    /// Objective weights fixed at submission time
    #[serde(default, deserialize_with = "lenient::number_map")]
    pub selected_objectives_weights: BTreeMap<ObjectiveId, f64>,

    /// Nested objective tree; only present on detail fetches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objectives: Option<Vec<StrategicObjective>>,

    /// Review decisions
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub reviews: Vec<PlanReview>,

    /// When created
    #[serde(default)]
    pub created_at: Option<Time>,

    /// Last updated
    #[serde(default)]
    pub updated_at: Option<Time>,
}

impl Plan {
    /// The nested objectives, empty when the tree was not fetched.
    pub fn objectives(&self) -> &[StrategicObjective] {
        self.objectives.as_deref().unwrap_or_default()
    }

    /// Whether the payload carries the nested objective tree.
    pub fn has_tree(&self) -> bool {
        self.objectives.is_some()
    }

    /// Most recent review, if any.
    pub fn latest_review(&self) -> Option<&PlanReview> {
        self.reviews.iter().max_by_key(|r| r.reviewed_at)
    }
}

/// Plan lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    /// Being prepared locally; never persisted
    Draft,
    /// Awaiting review
    Submitted,
    /// Accepted by a reviewer
    Approved,
    /// Sent back by a reviewer
    Rejected,
}

impl PlanStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [PlanStatus; 4] = [
        PlanStatus::Draft,
        PlanStatus::Submitted,
        PlanStatus::Approved,
        PlanStatus::Rejected,
    ];

    /// A plan in this status prevents its organization from creating another.
    pub fn is_blocking(self) -> bool {
        matches!(self, PlanStatus::Submitted | PlanStatus::Approved)
    }

    /// No further transition is possible from this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, PlanStatus::Approved | PlanStatus::Rejected)
    }

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            PlanStatus::Draft => "DRAFT",
            PlanStatus::Submitted => "SUBMITTED",
            PlanStatus::Approved => "APPROVED",
            PlanStatus::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlanStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown plan status: {s}"))
    }
}

/// Plan type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlanType {
    #[default]
    #[serde(rename = "LEO/EO Plan")]
    LeoEo,
    #[serde(rename = "Desk/Team Plan")]
    DeskTeam,
    #[serde(rename = "Individual Plan")]
    Individual,
    #[serde(other)]
    Other,
}

impl PlanType {
    /// Wire name. `Other` has none and reads as "Other".
    pub fn as_str(self) -> &'static str {
        match self {
            PlanType::LeoEo => "LEO/EO Plan",
            PlanType::DeskTeam => "Desk/Team Plan",
            PlanType::Individual => "Individual Plan",
            PlanType::Other => "Other",
        }
    }
}

impl std::fmt::Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reviewer's decision on a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanReview {
    /// Unique identifier
    pub id: ReviewId,

    /// Reviewed plan
    #[serde(default)]
    pub plan: Option<PlanId>,

    /// Reviewer
    #[serde(default)]
    pub evaluator: Option<UserId>,

    /// Reviewer's display name
    #[serde(default)]
    pub evaluator_name: Option<String>,

    /// Decision
    pub status: PlanStatus,

    /// Reviewer feedback
    #[serde(default)]
    pub feedback: String,

    /// When reviewed
    #[serde(default)]
    pub reviewed_at: Option<Time>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plan_list_item_without_tree() {
        let plan: Plan = serde_json::from_value(json!({
            "id": 3,
            "organization": 14,
            "organization_name": "Planning Directorate",
            "planner_name": "A. Planner",
            "type": "LEO/EO Plan",
            "fiscal_year": "2024",
            "from_date": "2024-07-08",
            "to_date": "2025-07-07",
            "status": "SUBMITTED",
            "submitted_at": "2024-08-01T09:30:00Z",
            "selected_objectives": [1, 2],
            "selected_objectives_weights": {"1": "60", "2": 40}
        }))
        .unwrap();

        assert_eq!(plan.plan_type, PlanType::LeoEo);
        assert_eq!(plan.status, PlanStatus::Submitted);
        assert!(!plan.has_tree());
        assert!(plan.objectives().is_empty());
        assert_eq!(plan.selected_objectives_weights[&ObjectiveId(1)], 60.0);
        assert_eq!(
            plan.from_date,
            Some(NaiveDate::from_ymd_opt(2024, 7, 8).unwrap())
        );
    }

    #[test]
    fn test_unknown_plan_type_is_other() {
        let plan: Plan = serde_json::from_value(json!({
            "id": 1, "organization": 1, "status": "APPROVED", "type": "Quarterly Plan"
        }))
        .unwrap();
        assert_eq!(plan.plan_type, PlanType::Other);
    }

    #[test]
    fn test_status_properties() {
        assert!(PlanStatus::Submitted.is_blocking());
        assert!(PlanStatus::Approved.is_blocking());
        assert!(!PlanStatus::Rejected.is_blocking());
        assert!(!PlanStatus::Draft.is_blocking());
        assert!(PlanStatus::Rejected.is_terminal());
        assert!(!PlanStatus::Submitted.is_terminal());
        assert_eq!("approved".parse::<PlanStatus>().unwrap(), PlanStatus::Approved);
        assert!("pending".parse::<PlanStatus>().is_err());
    }

    #[test]
    fn test_latest_review() {
        let plan: Plan = serde_json::from_value(json!({
            "id": 1, "organization": 1, "status": "REJECTED",
            "reviews": [
                {"id": 1, "status": "REJECTED", "feedback": "old", "reviewed_at": "2024-01-01T00:00:00Z"},
                {"id": 2, "status": "REJECTED", "feedback": "new", "reviewed_at": "2024-02-01T00:00:00Z"}
            ]
        }))
        .unwrap();
        assert_eq!(plan.latest_review().unwrap().feedback, "new");
    }
}
