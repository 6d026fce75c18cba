//! Activity model - initiative children and their costed budget lines.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::amount::{lenient, Amount};
use crate::id::{ActivityId, BudgetLineId, InitiativeId, MeasureId, OrganizationId};

/// Kind of work a budget line pays for.
///
/// Unknown or missing kinds are read as [`ActivityType::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ActivityType {
    /// Training sessions
    Training,
    /// Meetings
    Meeting,
    /// Workshops
    Workshop,
    /// Supportive supervision visits
    Supervision,
    /// Procurement of goods
    Procurement,
    /// Printing
    Printing,
    /// Anything else
    #[default]
    Other,
}

impl ActivityType {
    /// Every activity type, in reporting order.
    pub const ALL: [ActivityType; 7] = [
        ActivityType::Training,
        ActivityType::Meeting,
        ActivityType::Workshop,
        ActivityType::Supervision,
        ActivityType::Procurement,
        ActivityType::Printing,
        ActivityType::Other,
    ];

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::Training => "Training",
            ActivityType::Meeting => "Meeting",
            ActivityType::Workshop => "Workshop",
            ActivityType::Supervision => "Supervision",
            ActivityType::Procurement => "Procurement",
            ActivityType::Printing => "Printing",
            ActivityType::Other => "Other",
        }
    }

    /// Parse a wire name, case-insensitively. Anything unrecognised is `Other`.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .unwrap_or(ActivityType::Other)
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ActivityType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActivityType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => ActivityType::parse(&s),
            _ => ActivityType::Other,
        })
    }
}

/// How the estimated cost of a line was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BudgetCalculationType {
    /// Computed by the costing tool; `estimated_cost_with_tool` is authoritative.
    WithTool,
    /// Entered manually; `estimated_cost_without_tool` is authoritative.
    #[default]
    WithoutTool,
}

impl BudgetCalculationType {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            BudgetCalculationType::WithTool => "WITH_TOOL",
            BudgetCalculationType::WithoutTool => "WITHOUT_TOOL",
        }
    }
}

impl Serialize for BudgetCalculationType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BudgetCalculationType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) if s == "WITH_TOOL" => BudgetCalculationType::WithTool,
            _ => BudgetCalculationType::WithoutTool,
        })
    }
}

/// A costed line item: either a sub-activity (current model) or the single
/// legacy budget attached directly to a main activity. Both share this shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BudgetLine {
    /// Backend key, absent on create payloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BudgetLineId>,

    /// Owning main activity (sub-activities)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_activity: Option<ActivityId>,

    /// Owning main activity (legacy budgets)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<ActivityId>,

    /// Sub-activity name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Kind of work
    #[serde(default)]
    pub activity_type: ActivityType,

    /// Which estimate is authoritative
    #[serde(default)]
    pub budget_calculation_type: BudgetCalculationType,

    /// Estimate produced by the costing tool
    #[serde(default)]
    pub estimated_cost_with_tool: Amount,

    /// Manually entered estimate
    #[serde(default)]
    pub estimated_cost_without_tool: Amount,

    /// Government treasury funding
    #[serde(default)]
    pub government_treasury: Amount,

    /// Partner funding
    #[serde(default)]
    pub partners_funding: Amount,

    /// Development-program (SDG) funding
    #[serde(default)]
    pub sdg_funding: Amount,

    /// Any other funding
    #[serde(default)]
    pub other_funding: Amount,

    // Costing-tool inputs, carried through untouched.
    /// Training costing inputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_details: Option<Value>,
    /// Meeting and workshop costing inputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_workshop_details: Option<Value>,
    /// Procurement costing inputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procurement_details: Option<Value>,
    /// Printing costing inputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub printing_details: Option<Value>,
    /// Supervision costing inputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervision_details: Option<Value>,
    /// Partner funding breakdown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partners_details: Option<Value>,
}

/// Current-model costed line under a main activity.
pub type SubActivity = BudgetLine;

/// Legacy single budget attached to a main activity.
pub type ActivityBudget = BudgetLine;

/// Quarterly / monthly targets shared by measures and main activities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeriodTargets {
    /// Starting value, as sent by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<Value>,
    /// How targets accumulate (cumulative, increasing, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
    /// First quarter target
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub q1_target: Option<f64>,
    /// Second quarter target
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub q2_target: Option<f64>,
    /// Third quarter target
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub q3_target: Option<f64>,
    /// Fourth quarter target
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub q4_target: Option<f64>,
    /// Whole-year target
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub annual_target: Option<f64>,
    /// Reporting months
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub selected_months: Vec<String>,
    /// Reporting quarters
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub selected_quarters: Vec<String>,
}

impl PeriodTargets {
    /// At least one reporting period is selected.
    pub fn has_period(&self) -> bool {
        !self.selected_months.is_empty() || !self.selected_quarters.is_empty()
    }
}

/// A performance measure tracked under an initiative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMeasure {
    /// Unique identifier
    pub id: MeasureId,

    /// Parent initiative
    #[serde(default)]
    pub initiative: Option<InitiativeId>,

    /// Measure name
    #[serde(default)]
    pub name: String,

    /// Share of the initiative's weight
    #[serde(default, deserialize_with = "lenient::number")]
    pub weight: f64,

    /// Targets
    #[serde(flatten)]
    pub targets: PeriodTargets,

    /// Owning organization, `None` for shared measures
    #[serde(default)]
    pub organization: Option<OrganizationId>,
}

/// A main activity under an initiative; owns the costed budget lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainActivity {
    /// Unique identifier
    pub id: ActivityId,

    /// Parent initiative
    #[serde(default)]
    pub initiative: Option<InitiativeId>,

    /// Activity name
    #[serde(default)]
    pub name: String,

    /// Share of the initiative's weight
    #[serde(default, deserialize_with = "lenient::number")]
    pub weight: f64,

    /// Targets
    #[serde(flatten)]
    pub targets: PeriodTargets,

    /// Owning organization, `None` for shared activities
    #[serde(default)]
    pub organization: Option<OrganizationId>,

    /// Owning organization's display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,

    /// Itemized budget lines (current model)
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub sub_activities: Vec<SubActivity>,

    /// Single budget (legacy model), used only when there are no sub-activities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<ActivityBudget>,
}

impl MainActivity {
    /// Whether the activity belongs to `organization` or is shared.
    pub fn visible_to(&self, organization: OrganizationId) -> bool {
        self.organization.map_or(true, |owner| owner == organization)
    }

    /// Whether both budget representations are present at once.
    pub fn has_conflicting_budgets(&self) -> bool {
        !self.sub_activities.is_empty() && self.budget.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_activity_type_lenient_parse() {
        assert_eq!(ActivityType::parse("Training"), ActivityType::Training);
        assert_eq!(ActivityType::parse("meeting"), ActivityType::Meeting);
        assert_eq!(ActivityType::parse("Conference"), ActivityType::Other);

        let line: BudgetLine = serde_json::from_value(json!({"activity_type": null})).unwrap();
        assert_eq!(line.activity_type, ActivityType::Other);
    }

    #[test]
    fn test_calculation_type_defaults_to_without_tool() {
        let line: BudgetLine = serde_json::from_value(json!({})).unwrap();
        assert_eq!(line.budget_calculation_type, BudgetCalculationType::WithoutTool);

        let line: BudgetLine =
            serde_json::from_value(json!({"budget_calculation_type": "WITH_TOOL"})).unwrap();
        assert_eq!(line.budget_calculation_type, BudgetCalculationType::WithTool);
    }

    #[test]
    fn test_main_activity_from_backend_payload() {
        let activity: MainActivity = serde_json::from_value(json!({
            "id": 9,
            "initiative": 4,
            "name": "Conduct supportive supervision",
            "weight": "12.50",
            "q1_target": "1",
            "selected_quarters": ["Q1", "Q2"],
            "selected_months": null,
            "organization": 2,
            "sub_activities": null,
            "budget": {
                "activity_type": "Supervision",
                "budget_calculation_type": "WITH_TOOL",
                "estimated_cost_with_tool": "3500.00",
                "government_treasury": 1000
            },
            "total_budget": 3500
        }))
        .unwrap();

        assert_eq!(activity.weight, 12.5);
        assert_eq!(activity.targets.q1_target, Some(1.0));
        assert!(activity.targets.has_period());
        assert!(activity.sub_activities.is_empty());
        let budget = activity.budget.as_ref().unwrap();
        assert_eq!(budget.estimated_cost_with_tool.value(), 3500.0);
        assert!(activity.visible_to(OrganizationId(2)));
        assert!(!activity.visible_to(OrganizationId(3)));
    }

    #[test]
    fn test_shared_activity_visible_to_everyone() {
        let activity: MainActivity = serde_json::from_value(json!({"id": 1})).unwrap();
        assert!(activity.visible_to(OrganizationId(77)));
        assert!(!activity.has_conflicting_budgets());
    }
}
