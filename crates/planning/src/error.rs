//! Planning errors.

use planboard_api::ApiError;
use planboard_core::PlanStatus;
use serde::Serialize;
use thiserror::Error;

use crate::guard::PlanConflict;
use crate::lifecycle::PlanAction;
use crate::weight::WeightError;

/// Result type for planning operations.
pub type Result<T> = std::result::Result<T, PlanningError>;

/// One problem found while validating a form, before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Offending field
    pub field: &'static str,
    /// What is wrong
    pub message: String,
}

impl ValidationIssue {
    /// Create an issue.
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Planning errors.
#[derive(Error, Debug)]
pub enum PlanningError {
    /// The form has problems; nothing was sent
    #[error("Invalid input: {}", join_issues(.0))]
    Validation(Vec<ValidationIssue>),

    /// The organization already has a blocking plan
    #[error("{0}")]
    Conflict(PlanConflict),

    /// The action is not possible from the plan's current status
    #[error("Cannot {action} a plan that is {from}")]
    InvalidTransition {
        /// Current status
        from: PlanStatus,
        /// Attempted action
        action: PlanAction,
    },

    /// The user lacks the role the action needs
    #[error("Not allowed: {0}")]
    Forbidden(String),

    /// A weight would exceed what its parent allows
    #[error(transparent)]
    Weight(#[from] WeightError),

    /// The backend call failed
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl From<PlanConflict> for PlanningError {
    fn from(conflict: PlanConflict) -> Self {
        PlanningError::Conflict(conflict)
    }
}

impl PlanningError {
    /// Text to show the user.
    pub fn user_message(&self) -> String {
        match self {
            PlanningError::Validation(issues) => join_issues(issues),
            PlanningError::Conflict(conflict) => conflict.message(),
            PlanningError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }

    /// Whether the error was raised locally, without reaching the backend.
    pub fn is_local(&self) -> bool {
        !matches!(self, PlanningError::Api(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_every_issue() {
        let err = PlanningError::Validation(vec![
            ValidationIssue::new("planner_name", "Planner name is required"),
            ValidationIssue::new("selected_objectives", "Select at least one objective"),
        ]);
        assert_eq!(
            err.user_message(),
            "Planner name is required; Select at least one objective"
        );
        assert!(err.is_local());
    }

    #[test]
    fn test_api_error_uses_backend_message() {
        let err = PlanningError::from(ApiError::Status {
            status: 400,
            message: Some("Plan already exists".to_string()),
        });
        assert_eq!(err.user_message(), "Plan already exists");
        assert!(!err.is_local());

        let err = PlanningError::from(ApiError::Other("socket closed".to_string()));
        assert_eq!(err.user_message(), planboard_api::GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn test_transition_message() {
        let err = PlanningError::InvalidTransition {
            from: PlanStatus::Approved,
            action: PlanAction::Reject,
        };
        assert_eq!(err.to_string(), "Cannot reject a plan that is APPROVED");
    }
}
