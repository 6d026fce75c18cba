//! Plan state validation and transition logic.
//!
//! ```text
//! DRAFT --submit--> SUBMITTED --approve--> APPROVED
//!                             --reject---> REJECTED
//! ```
//!
//! Drafts exist only locally. Approve and reject are reviewer actions.

use planboard_core::{CurrentUser, PlanStatus, Role};
use serde::Serialize;

use crate::error::{PlanningError, Result};

/// Something a user can do to a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    /// Send a draft for review
    Submit,
    /// Accept a submitted plan
    Approve,
    /// Send a submitted plan back
    Reject,
}

impl PlanAction {
    /// Status the plan ends in.
    pub fn target(self) -> PlanStatus {
        match self {
            PlanAction::Submit => PlanStatus::Submitted,
            PlanAction::Approve => PlanStatus::Approved,
            PlanAction::Reject => PlanStatus::Rejected,
        }
    }

    /// Whether only reviewers may take this action.
    pub fn needs_reviewer(self) -> bool {
        matches!(self, PlanAction::Approve | PlanAction::Reject)
    }
}

impl std::fmt::Display for PlanAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PlanAction::Submit => "submit",
            PlanAction::Approve => "approve",
            PlanAction::Reject => "reject",
        })
    }
}

/// Who is acting.
pub struct TransitionContext {
    pub caller: String,
    pub roles: Vec<Role>,
}

impl TransitionContext {
    pub fn new(caller: impl Into<String>) -> Self {
        Self {
            caller: caller.into(),
            roles: vec![],
        }
    }

    pub fn with_roles(mut self, roles: Vec<Role>) -> Self {
        self.roles = roles;
        self
    }

    /// Context for the signed-in user, with the roles of all memberships.
    pub fn from_user(user: &CurrentUser) -> Self {
        let caller = user
            .user
            .as_ref()
            .map(|u| u.username.clone())
            .unwrap_or_default();
        Self::new(caller).with_roles(user.user_organizations.iter().map(|m| m.role).collect())
    }

    pub fn can_review(&self) -> bool {
        self.roles.contains(&Role::Admin) || self.roles.contains(&Role::Evaluator)
    }
}

/// Plan state validator.
pub struct PlanStateValidator;

impl PlanStateValidator {
    /// Check `action` against the plan's `current` status and the caller's
    /// roles. Returns the status the plan would move to.
    pub fn validate_transition(
        current: PlanStatus,
        action: PlanAction,
        context: &TransitionContext,
    ) -> Result<PlanStatus> {
        if action.needs_reviewer() && !context.can_review() {
            return Err(PlanningError::Forbidden(format!(
                "only administrators and evaluators may {} plans",
                action
            )));
        }

        match (current, action) {
            (PlanStatus::Draft, PlanAction::Submit)
            | (PlanStatus::Submitted, PlanAction::Approve)
            | (PlanStatus::Submitted, PlanAction::Reject) => Ok(action.target()),

            (from, action) => Err(PlanningError::InvalidTransition { from, action }),
        }
    }
}
