//! Objective model - strategic objectives, programs and initiatives.

use serde::{Deserialize, Serialize};

use crate::activity::{MainActivity, PerformanceMeasure};
use crate::amount::lenient;
use crate::id::{InitiativeId, ObjectiveId, OrganizationId, ProgramId};

/// A strategic objective with its baseline planning weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategicObjective {
    /// Unique identifier
    pub id: ObjectiveId,

    /// Objective title
    #[serde(default)]
    pub title: String,

    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Baseline planning weight (0-100)
    #[serde(default, deserialize_with = "lenient::number")]
    pub weight: f64,

    /// Per-cycle override set by the planner
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub planner_weight: Option<f64>,

    /// Server-derived weight that counts now
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub effective_weight: Option<f64>,

    /// Whether this is a default objective offered to every organization
    #[serde(default)]
    pub is_default: bool,

    /// Sub-programs organizing some of the objective's initiatives
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub programs: Vec<Program>,

    /// Initiatives directly under the objective
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub initiatives: Vec<StrategicInitiative>,
}

impl StrategicObjective {
    /// All initiatives reachable from this objective, direct ones first, then
    /// those under each program in order.
    pub fn all_initiatives(&self) -> impl Iterator<Item = &StrategicInitiative> {
        self.initiatives
            .iter()
            .chain(self.programs.iter().flat_map(|p| p.initiatives.iter()))
    }
}

/// A program groups initiatives under an objective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    /// Unique identifier
    pub id: ProgramId,

    /// Program name
    #[serde(default)]
    pub name: String,

    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Parent objective
    #[serde(default)]
    pub strategic_objective: Option<ObjectiveId>,

    /// Initiatives under the program
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub initiatives: Vec<StrategicInitiative>,
}

/// Which entity an initiative's weight is apportioned from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitiativeParent {
    /// Directly under an objective
    Objective(ObjectiveId),
    /// Under one of an objective's programs
    Program(ProgramId),
}

/// A strategic initiative: a weighted slice of its parent's effective weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategicInitiative {
    /// Unique identifier
    pub id: InitiativeId,

    /// Initiative name
    #[serde(default)]
    pub name: String,

    /// Share of the parent's effective weight
    #[serde(default, deserialize_with = "lenient::number")]
    pub weight: f64,

    /// Parent objective, mutually exclusive with `program`
    #[serde(default)]
    pub strategic_objective: Option<ObjectiveId>,

    /// Parent program, mutually exclusive with `strategic_objective`
    #[serde(default)]
    pub program: Option<ProgramId>,

    /// Owning organization, `None` for default initiatives
    #[serde(default)]
    pub organization: Option<OrganizationId>,

    /// Owning organization's display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,

    /// Whether the initiative is offered by default
    #[serde(default)]
    pub is_default: bool,

    /// Performance measures
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub performance_measures: Vec<PerformanceMeasure>,

    /// Main activities
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub main_activities: Vec<MainActivity>,
}

impl StrategicInitiative {
    /// The weight parent. A program takes precedence if the backend sends both.
    pub fn parent(&self) -> Option<InitiativeParent> {
        match (self.program, self.strategic_objective) {
            (Some(program), _) => Some(InitiativeParent::Program(program)),
            (None, Some(objective)) => Some(InitiativeParent::Objective(objective)),
            (None, None) => None,
        }
    }
}
