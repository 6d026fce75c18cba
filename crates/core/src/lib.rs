//! Planboard core data models.
//!
//! This crate defines the records exchanged with the planning backend:
//! plans, the objective → initiative → activity tree, costed budget lines,
//! organizations and the current user's memberships.

#![warn(missing_docs)]

// Core identities
mod id;
mod amount;

// Plan tree
mod plan;
mod objective;
mod activity;

// Organizations and users
mod organization;

// Outgoing payloads
mod draft;

// Re-exports
pub use id::*;
pub use amount::{lenient, Amount};

// Plan tree
pub use plan::{Plan, PlanStatus, PlanType, PlanReview};
pub use objective::{StrategicObjective, Program, StrategicInitiative, InitiativeParent};
pub use activity::{
    ActivityType, BudgetCalculationType, BudgetLine, SubActivity, ActivityBudget,
    MainActivity, PerformanceMeasure, PeriodTargets,
};

// Organizations
pub use organization::{
    Organization, Role, User, UserOrganization, CurrentUser, AccessScope,
    resolve_org_name, organization_name,
};

// Payloads
pub use draft::{PlanDraft, NewPlan, InitiativeInput, TargetedItemInput};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
