//! Edits to a plan's objective tree.
//!
//! Every save is checked locally first: required fields, reporting periods,
//! a positive cost for budget lines, and the weight left under the parent.
//! Nothing is written when a check fails. A save that passes issues exactly
//! one write.

use std::sync::Arc;

use planboard_api::{ApiError, PlanningApi};
use planboard_core::{
    ActivityId, BudgetLine, InitiativeId, InitiativeInput, MainActivity, MeasureId,
    PerformanceMeasure, Plan, PlanId, StrategicInitiative, SubActivity, TargetedItemInput,
};
use tracing::{debug, info};

use crate::error::{PlanningError, Result, ValidationIssue};
use crate::weight::{plan_objective_weight, WeightLedger};

/// Problems with an initiative form.
pub fn validate_initiative(input: &InitiativeInput) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if input.name.trim().is_empty() {
        issues.push(ValidationIssue::new("name", "Initiative name is required"));
    }
    match (input.strategic_objective, input.program) {
        (Some(_), Some(_)) => issues.push(ValidationIssue::new(
            "program",
            "An initiative belongs to an objective or a program, not both",
        )),
        (None, None) => issues.push(ValidationIssue::new(
            "strategic_objective",
            "Select an objective or a program",
        )),
        _ => {}
    }
    issues
}

/// Problems with a performance measure or main activity form.
pub fn validate_targeted_item(input: &TargetedItemInput) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if input.name.trim().is_empty() {
        issues.push(ValidationIssue::new("name", "Name is required"));
    }
    if !input.targets.has_period() {
        issues.push(ValidationIssue::new(
            "selected_months",
            "At least one month or quarter must be selected",
        ));
    }
    issues
}

/// Problems with a sub-activity form.
pub fn validate_budget_line(line: &BudgetLine) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if line.main_activity.is_none() {
        issues.push(ValidationIssue::new("main_activity", "Main activity is required"));
    }
    if line.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
        issues.push(ValidationIssue::new("name", "Sub-activity name is required"));
    }
    if line.estimated_cost_with_tool.value() <= 0.0 && line.estimated_cost_without_tool.value() <= 0.0 {
        issues.push(ValidationIssue::new(
            "estimated_cost",
            "At least one estimated cost must be greater than 0",
        ));
    }
    issues
}

fn reject_issues(issues: Vec<ValidationIssue>) -> Result<()> {
    if issues.is_empty() {
        return Ok(());
    }
    debug!("Form rejected with {} issues", issues.len());
    Err(PlanningError::Validation(issues))
}

fn find_initiative(plan: &Plan, id: InitiativeId) -> Result<&StrategicInitiative> {
    plan.objectives()
        .iter()
        .flat_map(|o| o.all_initiatives())
        .find(|i| i.id == id)
        .ok_or_else(|| {
            PlanningError::Validation(vec![ValidationIssue::new(
                "initiative",
                format!("Initiative {} is not part of plan {}", id, plan.id),
            )])
        })
}

/// The sibling ledger an initiative form is checked against.
fn initiative_ledger(plan: &Plan, input: &InitiativeInput) -> Result<WeightLedger<InitiativeId>> {
    if let Some(program_id) = input.program {
        for objective in plan.objectives() {
            if let Some(program) = objective.programs.iter().find(|p| p.id == program_id) {
                return Ok(WeightLedger::program_initiatives(objective, program)
                    .with_limit(plan_objective_weight(plan, objective)));
            }
        }
        return Err(PlanningError::Validation(vec![ValidationIssue::new(
            "program",
            format!("Program {} is not part of plan {}", program_id, plan.id),
        )]));
    }

    let objective = plan
        .objectives()
        .iter()
        .find(|o| Some(o.id) == input.strategic_objective)
        .ok_or_else(|| {
            PlanningError::Validation(vec![ValidationIssue::new(
                "strategic_objective",
                format!("The objective is not part of plan {}", plan.id),
            )])
        })?;
    Ok(WeightLedger::plan_initiatives(plan, objective))
}

/// Saves initiatives, measures, main activities and sub-activities of a plan.
pub struct TreeEditor<A: PlanningApi> {
    api: Arc<A>,
}

impl<A: PlanningApi> TreeEditor<A> {
    /// Create an editor.
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    async fn load_plan(&self, id: PlanId) -> Result<Plan> {
        let user = self.api.current_user().await?;
        if !user.is_authenticated {
            return Err(ApiError::Unauthenticated.into());
        }
        Ok(self.api.get_plan(id).await?)
    }

    /// Create (`editing` is `None`) or update an initiative of `plan`.
    pub async fn save_initiative(
        &self,
        plan: PlanId,
        editing: Option<InitiativeId>,
        input: &InitiativeInput,
    ) -> Result<StrategicInitiative> {
        reject_issues(validate_initiative(input))?;

        let plan = self.load_plan(plan).await?;
        initiative_ledger(&plan, input)?.check(input.weight, editing)?;

        let saved = match editing {
            Some(id) => self.api.update_initiative(id, input).await?,
            None => self.api.create_initiative(input).await?,
        };
        info!("Initiative {} saved with weight {:.2}", saved.id, saved.weight);
        Ok(saved)
    }

    /// Create or update a performance measure.
    pub async fn save_measure(
        &self,
        plan: PlanId,
        editing: Option<MeasureId>,
        input: &TargetedItemInput,
    ) -> Result<PerformanceMeasure> {
        reject_issues(validate_targeted_item(input))?;

        let plan = self.load_plan(plan).await?;
        let initiative = find_initiative(&plan, input.initiative)?;
        WeightLedger::measures(initiative).check(input.weight, editing)?;

        let saved = match editing {
            Some(id) => self.api.update_measure(id, input).await?,
            None => self.api.create_measure(input).await?,
        };
        info!("Measure {} saved under initiative {}", saved.id, input.initiative);
        Ok(saved)
    }

    /// Create or update a main activity.
    pub async fn save_activity(
        &self,
        plan: PlanId,
        editing: Option<ActivityId>,
        input: &TargetedItemInput,
    ) -> Result<MainActivity> {
        reject_issues(validate_targeted_item(input))?;

        let plan = self.load_plan(plan).await?;
        let initiative = find_initiative(&plan, input.initiative)?;
        WeightLedger::activities(initiative).check(input.weight, editing)?;

        let saved = match editing {
            Some(id) => self.api.update_activity(id, input).await?,
            None => self.api.create_activity(input).await?,
        };
        info!("Main activity {} saved under initiative {}", saved.id, input.initiative);
        Ok(saved)
    }

    /// Add a costed sub-activity to a main activity. Sub-activities carry no
    /// weight, so no plan is loaded.
    pub async fn add_sub_activity(&self, line: &BudgetLine) -> Result<SubActivity> {
        reject_issues(validate_budget_line(line))?;

        let saved = self.api.create_sub_activity(line).await?;
        debug!("Sub-activity {:?} added to {:?}", saved.id, line.main_activity);
        Ok(saved)
    }
}
