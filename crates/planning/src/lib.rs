//! Plan lifecycle and weight rules for Planboard.
//!
//! Transitions, the one-blocking-plan guard, submission with a fresh
//! re-check, review decisions, and guarded edits to the objective tree that
//! keep child weights within their parent's.

#![warn(missing_docs)]

pub mod error;
pub mod lifecycle;
pub mod guard;
pub mod submission;
pub mod review;
pub mod tree;
pub mod weight;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{PlanningError, Result, ValidationIssue};
pub use lifecycle::{PlanAction, PlanStateValidator, TransitionContext};
pub use guard::{next_action, status_message, NextAction, PlanConflict, SubmissionGate};
pub use submission::{validate_draft, PlanSubmitter};
pub use review::PlanReviewer;
pub use tree::{validate_budget_line, validate_initiative, validate_targeted_item, TreeEditor};
pub use weight::{
    effective_weight, plan_objective_weight, validate_objective_selection, WeightError,
    WeightLedger, TOTAL_OBJECTIVE_WEIGHT, WEIGHT_EPSILON,
};
