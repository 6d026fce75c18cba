//! Plan submission.
//!
//! A draft is validated locally, then the organization's plans are fetched
//! fresh and checked against the one-blocking-plan rule right before the
//! create call. The create call is issued at most once per `submit`.

use std::sync::Arc;

use planboard_api::{ApiError, PlanFilter, PlanningApi};
use planboard_core::{OrganizationId, Plan, PlanDraft, PlanStatus};
use tracing::{debug, info};

use crate::error::{PlanningError, Result, ValidationIssue};
use crate::guard::SubmissionGate;
use crate::lifecycle::{PlanAction, PlanStateValidator, TransitionContext};
use crate::weight::validate_objective_selection;

/// Collect every problem with a draft.
pub fn validate_draft(draft: &PlanDraft) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if draft.organization.is_none() {
        issues.push(ValidationIssue::new("organization", "Organization is required"));
    }
    if draft.planner_name.trim().is_empty() {
        issues.push(ValidationIssue::new("planner_name", "Planner name is required"));
    }
    if draft.selected_objectives.is_empty() {
        issues.push(ValidationIssue::new(
            "selected_objectives",
            "Select at least one strategic objective",
        ));
    }
    if let (Some(from), Some(to)) = (draft.from_date, draft.to_date) {
        if from > to {
            issues.push(ValidationIssue::new(
                "to_date",
                "The plan period must end after it starts",
            ));
        }
    }
    if let Err(e) = validate_objective_selection(&draft.selected_objectives_weights) {
        issues.push(ValidationIssue::new("selected_objectives_weights", e.to_string()));
    }

    issues
}

/// Submits plans for an organization.
pub struct PlanSubmitter<A: PlanningApi> {
    api: Arc<A>,
}

impl<A: PlanningApi> PlanSubmitter<A> {
    /// Create a submitter.
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    /// Whether `organization` may start a new plan, from the plans currently
    /// listed. Used when entering the creation flow; `submit` checks again.
    pub async fn check_eligibility(&self, organization: OrganizationId) -> Result<()> {
        let plans = self
            .api
            .list_plans(&PlanFilter::organization(organization))
            .await?;
        SubmissionGate::check(&plans, organization)?;
        Ok(())
    }

    /// Validate and submit a draft.
    pub async fn submit(&self, draft: &PlanDraft) -> Result<Plan> {
        let issues = validate_draft(draft);
        if !issues.is_empty() {
            debug!("Draft rejected with {} issues", issues.len());
            return Err(PlanningError::Validation(issues));
        }
        let Some(payload) = draft.to_payload() else {
            return Err(PlanningError::Validation(vec![ValidationIssue::new(
                "organization",
                "Organization is required",
            )]));
        };

        let user = self.api.current_user().await?;
        if !user.is_authenticated {
            return Err(ApiError::Unauthenticated.into());
        }
        PlanStateValidator::validate_transition(
            PlanStatus::Draft,
            PlanAction::Submit,
            &TransitionContext::from_user(&user),
        )?;

        let organization = payload.organization;
        let existing = self
            .api
            .refresh_plans(&PlanFilter::organization(organization))
            .await?;
        SubmissionGate::check(&existing, organization)?;

        let plan = self.api.create_plan(&payload).await?;
        info!(
            "Plan {} submitted for organization {} by {}",
            plan.id, organization, payload.planner_name
        );
        Ok(plan)
    }
}
