//! Planning API trait abstraction.

use async_trait::async_trait;
use planboard_core::{
    ActivityId, BudgetLine, CurrentUser, InitiativeId, InitiativeInput, MainActivity, MeasureId,
    NewPlan, Organization, OrganizationId, PerformanceMeasure, Plan, PlanId, StrategicInitiative,
    SubActivity, TargetedItemInput,
};

/// Error type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Message shown when the backend gives no usable explanation.
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// Errors that can occur while talking to the planning backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (offline snapshot backend)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Non-success response
    #[error("backend returned {status}: {}", message.as_deref().unwrap_or("no details"))]
    Status {
        /// HTTP status code
        status: u16,
        /// Message extracted from the response body
        message: Option<String>,
    },

    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Session missing or expired
    #[error("not authenticated")]
    Unauthenticated,

    /// Operation not offered by this backend
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ApiError {
    /// Text to show the user: the backend's own message when it sent one,
    /// otherwise a generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status { message: Some(message), .. } => message.clone(),
            ApiError::NotFound(what) => format!("Not found: {what}"),
            ApiError::Unauthenticated => "Your session has expired. Please sign in again.".to_string(),
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }

    /// Whether a read that failed this way may be attempted again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Http(e) => !e.is_decode() && !e.is_builder(),
            ApiError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Filter for listing plans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PlanFilter {
    /// Only plans owned by this organization
    pub organization: Option<OrganizationId>,
}

impl PlanFilter {
    /// Plans of one organization.
    pub fn organization(id: OrganizationId) -> Self {
        Self { organization: Some(id) }
    }

    /// Whether `plan` passes the filter.
    pub fn matches(&self, plan: &Plan) -> bool {
        self.organization.map_or(true, |org| plan.organization == org)
    }
}

/// The planning backend, as seen by this client.
///
/// Reads may be retried and cached by wrappers; writes are issued exactly once
/// per call and never retried.
#[async_trait]
pub trait PlanningApi: Send + Sync {
    // === Session ===

    /// Current session and organization memberships.
    async fn current_user(&self) -> Result<CurrentUser>;

    // === Organizations ===

    /// List all organizations.
    async fn list_organizations(&self) -> Result<Vec<Organization>>;

    // === Plans ===

    /// List plans matching the filter. Items may lack the nested tree.
    async fn list_plans(&self, filter: &PlanFilter) -> Result<Vec<Plan>>;

    /// List plans bypassing any cache.
    async fn refresh_plans(&self, filter: &PlanFilter) -> Result<Vec<Plan>> {
        self.list_plans(filter).await
    }

    /// Load a plan with its full nested tree.
    async fn get_plan(&self, id: PlanId) -> Result<Plan>;

    /// Create a plan.
    async fn create_plan(&self, plan: &NewPlan) -> Result<Plan>;

    /// Approve a submitted plan.
    async fn approve_plan(&self, id: PlanId, feedback: &str) -> Result<()>;

    /// Reject a submitted plan.
    async fn reject_plan(&self, id: PlanId, feedback: &str) -> Result<()>;

    // === Plan tree CRUD ===

    /// Create an initiative.
    async fn create_initiative(&self, input: &InitiativeInput) -> Result<StrategicInitiative>;

    /// Update an initiative.
    async fn update_initiative(
        &self,
        id: InitiativeId,
        input: &InitiativeInput,
    ) -> Result<StrategicInitiative>;

    /// Create a performance measure.
    async fn create_measure(&self, input: &TargetedItemInput) -> Result<PerformanceMeasure>;

    /// Update a performance measure.
    async fn update_measure(
        &self,
        id: MeasureId,
        input: &TargetedItemInput,
    ) -> Result<PerformanceMeasure>;

    /// Create a main activity.
    async fn create_activity(&self, input: &TargetedItemInput) -> Result<MainActivity>;

    /// Update a main activity.
    async fn update_activity(
        &self,
        id: ActivityId,
        input: &TargetedItemInput,
    ) -> Result<MainActivity>;

    /// Create a sub-activity under `line.main_activity`.
    async fn create_sub_activity(&self, line: &BudgetLine) -> Result<SubActivity>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_backend_text() {
        let err = ApiError::Status {
            status: 400,
            message: Some("Weight exceeds objective".into()),
        };
        assert_eq!(err.user_message(), "Weight exceeds objective");

        let err = ApiError::Status { status: 500, message: None };
        assert_eq!(err.user_message(), GENERIC_ERROR_MESSAGE);
        assert_eq!(ApiError::Other("boom".into()).user_message(), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn test_only_server_errors_are_retryable() {
        assert!(ApiError::Status { status: 502, message: None }.is_retryable());
        assert!(!ApiError::Status { status: 404, message: None }.is_retryable());
        assert!(!ApiError::Unauthenticated.is_retryable());
        assert!(!ApiError::NotFound("plan 1".into()).is_retryable());
    }
}
