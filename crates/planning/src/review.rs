//! Review decisions on submitted plans.

use std::sync::Arc;

use planboard_api::{ApiError, PlanningApi};
use planboard_core::{PlanId, PlanStatus};
use tracing::info;

use crate::error::{PlanningError, Result, ValidationIssue};
use crate::lifecycle::{PlanAction, PlanStateValidator, TransitionContext};

/// Approves and rejects plans.
///
/// The transition is checked against the plan's current status and the
/// reviewer's roles before the decision is sent, and the decision is sent
/// exactly once.
pub struct PlanReviewer<A: PlanningApi> {
    api: Arc<A>,
}

impl<A: PlanningApi> PlanReviewer<A> {
    /// Create a reviewer.
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    /// Approve a submitted plan.
    pub async fn approve(&self, id: PlanId, feedback: &str) -> Result<PlanStatus> {
        self.decide(id, PlanAction::Approve, feedback).await
    }

    /// Reject a submitted plan. Feedback is required.
    pub async fn reject(&self, id: PlanId, feedback: &str) -> Result<PlanStatus> {
        self.decide(id, PlanAction::Reject, feedback).await
    }

    async fn decide(&self, id: PlanId, action: PlanAction, feedback: &str) -> Result<PlanStatus> {
        let feedback = feedback.trim();
        if action == PlanAction::Reject && feedback.is_empty() {
            return Err(PlanningError::Validation(vec![ValidationIssue::new(
                "feedback",
                "Feedback is required when rejecting a plan",
            )]));
        }

        let user = self.api.current_user().await?;
        if !user.is_authenticated {
            return Err(ApiError::Unauthenticated.into());
        }
        let context = TransitionContext::from_user(&user);

        let plan = self.api.get_plan(id).await?;
        let target = PlanStateValidator::validate_transition(plan.status, action, &context)?;

        match action {
            PlanAction::Approve => self.api.approve_plan(id, feedback).await?,
            PlanAction::Reject => self.api.reject_plan(id, feedback).await?,
            PlanAction::Submit => {
                return Err(PlanningError::InvalidTransition {
                    from: plan.status,
                    action,
                })
            }
        }

        info!("Plan {} {} by {}", id, target, context.caller);
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{plan, MockApi};

    #[tokio::test]
    async fn test_evaluator_approves() {
        let api = Arc::new(MockApi::new("EVALUATOR", 1).with_plan(plan(3, 5, "SUBMITTED")));
        let reviewer = PlanReviewer::new(api.clone());

        let status = reviewer.approve(PlanId(3), "Well aligned").await.unwrap();
        assert_eq!(status, PlanStatus::Approved);
        assert_eq!(api.decisions(), 1);
    }

    #[tokio::test]
    async fn test_planner_may_not_review() {
        let api = Arc::new(MockApi::new("PLANNER", 5).with_plan(plan(3, 5, "SUBMITTED")));
        let err = PlanReviewer::new(api.clone())
            .approve(PlanId(3), "")
            .await
            .unwrap_err();
        assert!(matches!(err, PlanningError::Forbidden(_)));
        assert_eq!(api.decisions(), 0);
    }

    #[tokio::test]
    async fn test_decided_plan_cannot_be_reviewed_again() {
        let api = Arc::new(MockApi::new("ADMIN", 1).with_plan(plan(3, 5, "APPROVED")));
        let err = PlanReviewer::new(api.clone())
            .reject(PlanId(3), "Too late")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PlanningError::InvalidTransition {
                from: PlanStatus::Approved,
                action: PlanAction::Reject
            }
        ));
        assert_eq!(api.decisions(), 0);
    }

    #[tokio::test]
    async fn test_reject_requires_feedback() {
        let api = Arc::new(MockApi::new("EVALUATOR", 1).with_plan(plan(3, 5, "SUBMITTED")));
        let err = PlanReviewer::new(api.clone())
            .reject(PlanId(3), "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, PlanningError::Validation(_)));
        assert_eq!(api.decisions(), 0);
    }

    #[tokio::test]
    async fn test_failed_decision_surfaces_once() {
        let api = Arc::new(
            MockApi::new("EVALUATOR", 1)
                .with_plan(plan(3, 5, "SUBMITTED"))
                .failing_writes(),
        );
        let err = PlanReviewer::new(api.clone())
            .reject(PlanId(3), "Missing budget lines")
            .await
            .unwrap_err();
        assert!(matches!(err, PlanningError::Api(ApiError::Status { status: 500, .. })));
        assert_eq!(api.decisions(), 1);
    }

    #[tokio::test]
    async fn test_missing_plan() {
        let api = Arc::new(MockApi::new("EVALUATOR", 1));
        let err = PlanReviewer::new(api)
            .approve(PlanId(42), "")
            .await
            .unwrap_err();
        assert!(matches!(err, PlanningError::Api(ApiError::NotFound(_))));
    }
}
