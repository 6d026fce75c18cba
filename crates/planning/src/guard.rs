//! One blocking plan per organization.
//!
//! An organization with a SUBMITTED or APPROVED plan may not create another.
//! A REJECTED plan does not block: a replacement can be submitted at once.

use planboard_core::{OrganizationId, Plan, PlanId, PlanStatus};
use serde::Serialize;

/// What the organization can do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    /// Wait until the submitted plan is reviewed
    AwaitReview,
    /// Wait for the next planning cycle
    AwaitNextCycle,
    /// Create a replacement plan now
    CreateReplacement,
    /// Create a plan now
    Create,
}

/// An existing plan that blocks a new submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanConflict {
    /// The blocking plan
    pub plan: PlanId,
    /// Its organization
    pub organization: OrganizationId,
    /// Its status
    pub status: PlanStatus,
}

impl PlanConflict {
    /// Message for the status dialog.
    pub fn message(&self) -> String {
        status_message(self.status)
    }

    /// What the organization can do next.
    pub fn next_action(&self) -> NextAction {
        next_action(self.status)
    }
}

impl std::fmt::Display for PlanConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

/// What an organization whose latest plan is in `status` can do next.
pub fn next_action(status: PlanStatus) -> NextAction {
    match status {
        PlanStatus::Submitted => NextAction::AwaitReview,
        PlanStatus::Approved => NextAction::AwaitNextCycle,
        PlanStatus::Rejected => NextAction::CreateReplacement,
        PlanStatus::Draft => NextAction::Create,
    }
}

/// Status dialog text for an organization whose latest plan is in `status`.
pub fn status_message(status: PlanStatus) -> String {
    match status {
        PlanStatus::Submitted => "Your organization already has a plan awaiting review. \
             A new plan can be submitted once it has been reviewed."
            .to_string(),
        PlanStatus::Approved => "Your organization's plan has been approved. \
             A new plan can be created in the next planning cycle."
            .to_string(),
        PlanStatus::Rejected => "Your organization's previous plan was rejected. \
             You can create a new plan now."
            .to_string(),
        PlanStatus::Draft => "No plan has been submitted yet.".to_string(),
    }
}

/// Submission guard.
pub struct SubmissionGate;

impl SubmissionGate {
    /// Check whether `organization` may submit, given the plans that exist.
    ///
    /// When several plans block, the newest is reported.
    pub fn check(existing: &[Plan], organization: OrganizationId) -> Result<(), PlanConflict> {
        let blocking = existing
            .iter()
            .filter(|p| p.organization == organization && p.status.is_blocking())
            .max_by_key(|p| p.id);

        match blocking {
            Some(plan) => Err(PlanConflict {
                plan: plan.id,
                organization,
                status: plan.status,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plan(id: i64, org: i64, status: &str) -> Plan {
        serde_json::from_value(json!({"id": id, "organization": org, "status": status})).unwrap()
    }

    #[test]
    fn test_submitted_blocks() {
        let existing = vec![plan(1, 5, "SUBMITTED")];
        let conflict = SubmissionGate::check(&existing, OrganizationId(5)).unwrap_err();
        assert_eq!(conflict.status, PlanStatus::Submitted);
        assert_eq!(conflict.next_action(), NextAction::AwaitReview);
        assert!(conflict.message().contains("awaiting review"));
    }

    #[test]
    fn test_approved_blocks_until_next_cycle() {
        let existing = vec![plan(1, 5, "REJECTED"), plan(2, 5, "APPROVED")];
        let conflict = SubmissionGate::check(&existing, OrganizationId(5)).unwrap_err();
        assert_eq!(conflict.plan, PlanId(2));
        assert_eq!(conflict.next_action(), NextAction::AwaitNextCycle);
        assert!(conflict.to_string().contains("next planning cycle"));
    }

    #[test]
    fn test_rejected_allows_replacement() {
        let existing = vec![plan(1, 5, "REJECTED"), plan(2, 6, "SUBMITTED")];
        assert!(SubmissionGate::check(&existing, OrganizationId(5)).is_ok());
        assert_eq!(next_action(PlanStatus::Rejected), NextAction::CreateReplacement);
    }

    #[test]
    fn test_no_plans() {
        assert!(SubmissionGate::check(&[], OrganizationId(5)).is_ok());
    }
}
