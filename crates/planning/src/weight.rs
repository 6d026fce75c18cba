//! Weight apportionment.
//!
//! Every child weight is a slice of its parent's weight. The direct
//! initiatives of an objective share the objective's effective weight, and
//! the initiatives of each program share that same weight as a separate
//! set. The measures and the main activities of an initiative each share the
//! initiative's weight.

use std::collections::BTreeMap;

use planboard_core::{
    ActivityId, InitiativeId, MeasureId, ObjectiveId, Plan, Program, StrategicInitiative,
    StrategicObjective,
};
use thiserror::Error;

/// Rounding slack when comparing weight sums.
pub const WEIGHT_EPSILON: f64 = 0.01;

/// Weight available across a plan's selected objectives.
pub const TOTAL_OBJECTIVE_WEIGHT: f64 = 100.0;

/// Weight problems.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WeightError {
    /// Zero, negative or not a number
    #[error("Weight must be a positive number")]
    NotPositive,

    /// Siblings plus the new weight are more than the parent carries
    #[error("Total weight {total:.2} exceeds the {limit:.2} available from the parent ({remaining:.2} left)")]
    ExceedsParent {
        /// Sibling total including the new weight
        total: f64,
        /// Parent's weight
        limit: f64,
        /// Weight that was still free
        remaining: f64,
    },

    /// Selected objectives add up to more than 100
    #[error("Selected objective weights total {total:.2}, more than 100")]
    ObjectivesExceed {
        /// Sum of the selected weights
        total: f64,
    },
}

/// The weight that counts for an objective now: the server-derived
/// effective weight, then the planner's override, then the baseline.
pub fn effective_weight(objective: &StrategicObjective) -> f64 {
    objective
        .effective_weight
        .or(objective.planner_weight)
        .unwrap_or(objective.weight)
}

/// An objective's weight within a specific plan: the weight fixed on the plan
/// at submission, else the objective's effective weight.
pub fn plan_objective_weight(plan: &Plan, objective: &StrategicObjective) -> f64 {
    plan.selected_objectives_weights
        .get(&objective.id)
        .copied()
        .unwrap_or_else(|| effective_weight(objective))
}

/// Sibling weights under one parent.
#[derive(Debug, Clone)]
pub struct WeightLedger<K> {
    limit: f64,
    siblings: Vec<(K, f64)>,
}

impl<K: PartialEq + Copy> WeightLedger<K> {
    /// An empty ledger for a parent carrying `limit`.
    pub fn new(limit: f64) -> Self {
        Self {
            limit,
            siblings: Vec::new(),
        }
    }

    /// Record an existing child.
    pub fn with_sibling(mut self, id: K, weight: f64) -> Self {
        self.siblings.push((id, weight));
        self
    }

    /// Same siblings under a parent carrying `limit` instead.
    pub fn with_limit(mut self, limit: f64) -> Self {
        self.limit = limit;
        self
    }

    /// Parent's weight.
    pub fn limit(&self) -> f64 {
        self.limit
    }

    /// Sum of recorded children, leaving out `editing`.
    pub fn total(&self, editing: Option<K>) -> f64 {
        self.siblings
            .iter()
            .filter(|(id, _)| Some(*id) != editing)
            .map(|(_, w)| w)
            .sum()
    }

    /// Weight still free, leaving out `editing`.
    pub fn remaining(&self, editing: Option<K>) -> f64 {
        (self.limit - self.total(editing)).max(0.0)
    }

    /// Check a new or edited child's weight. When editing, pass the child's
    /// id so its previous weight is not counted twice.
    pub fn check(&self, weight: f64, editing: Option<K>) -> Result<(), WeightError> {
        if !weight.is_finite() || weight <= 0.0 {
            return Err(WeightError::NotPositive);
        }

        let total = self.total(editing) + weight;
        if total > self.limit + WEIGHT_EPSILON {
            return Err(WeightError::ExceedsParent {
                total,
                limit: self.limit,
                remaining: self.remaining(editing),
            });
        }
        Ok(())
    }
}

impl WeightLedger<InitiativeId> {
    /// Initiatives directly under an objective. Program initiatives are
    /// not counted here.
    pub fn initiatives(objective: &StrategicObjective) -> Self {
        Self::from_initiatives(effective_weight(objective), &objective.initiatives)
    }

    /// Initiatives under one of an objective's programs.
    pub fn program_initiatives(objective: &StrategicObjective, program: &Program) -> Self {
        Self::from_initiatives(effective_weight(objective), &program.initiatives)
    }

    /// Direct initiatives of an objective as selected in a plan.
    pub fn plan_initiatives(plan: &Plan, objective: &StrategicObjective) -> Self {
        Self::initiatives(objective).with_limit(plan_objective_weight(plan, objective))
    }

    fn from_initiatives(limit: f64, initiatives: &[StrategicInitiative]) -> Self {
        initiatives
            .iter()
            .fold(Self::new(limit), |ledger, i| ledger.with_sibling(i.id, i.weight))
    }
}

impl WeightLedger<MeasureId> {
    /// Performance measures of an initiative.
    pub fn measures(initiative: &StrategicInitiative) -> Self {
        initiative
            .performance_measures
            .iter()
            .fold(Self::new(initiative.weight), |ledger, m| {
                ledger.with_sibling(m.id, m.weight)
            })
    }
}

impl WeightLedger<ActivityId> {
    /// Main activities of an initiative.
    pub fn activities(initiative: &StrategicInitiative) -> Self {
        initiative
            .main_activities
            .iter()
            .fold(Self::new(initiative.weight), |ledger, a| {
                ledger.with_sibling(a.id, a.weight)
            })
    }
}

/// Check the objective weights chosen for a plan. Returns their total.
pub fn validate_objective_selection(
    weights: &BTreeMap<ObjectiveId, f64>,
) -> Result<f64, WeightError> {
    if weights.values().any(|w| !w.is_finite() || *w <= 0.0) {
        return Err(WeightError::NotPositive);
    }
    let total: f64 = weights.values().sum();
    if total > TOTAL_OBJECTIVE_WEIGHT + WEIGHT_EPSILON {
        return Err(WeightError::ObjectivesExceed { total });
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn objective(value: serde_json::Value) -> StrategicObjective {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_effective_weight_fallback_order() {
        let all = objective(json!({"id": 1, "effective_weight": 30, "planner_weight": 20, "weight": 10}));
        assert_eq!(effective_weight(&all), 30.0);

        let no_effective = objective(json!({"id": 1, "planner_weight": 20, "weight": 10}));
        assert_eq!(effective_weight(&no_effective), 20.0);

        let baseline_only = objective(json!({"id": 1, "effective_weight": null, "planner_weight": null, "weight": "10"}));
        assert_eq!(effective_weight(&baseline_only), 10.0);
    }

    #[test]
    fn test_plan_weight_overrides_effective_weight() {
        let obj = objective(json!({"id": 4, "effective_weight": 30}));
        let plan: Plan = serde_json::from_value(json!({
            "id": 1, "organization": 1, "status": "SUBMITTED",
            "selected_objectives_weights": {"4": "45.5"}
        }))
        .unwrap();
        assert_eq!(plan_objective_weight(&plan, &obj), 45.5);

        let other: Plan = serde_json::from_value(json!({
            "id": 2, "organization": 1, "status": "SUBMITTED"
        }))
        .unwrap();
        assert_eq!(plan_objective_weight(&other, &obj), 30.0);
    }

    #[test]
    fn test_direct_initiatives_ignore_program_children() {
        let obj = objective(json!({
            "id": 1, "weight": 40,
            "initiatives": [{"id": 10, "weight": 30}],
            "programs": [{"id": 2, "initiatives": [{"id": 11, "weight": 20}]}]
        }));
        let ledger = WeightLedger::initiatives(&obj);
        assert_eq!(ledger.limit(), 40.0);
        assert_eq!(ledger.total(None), 30.0);

        assert!(ledger.check(10.0, None).is_ok());
        assert!(matches!(
            ledger.check(11.0, None),
            Err(WeightError::ExceedsParent { remaining, .. }) if remaining == 10.0
        ));
    }

    #[test]
    fn test_program_initiatives_have_their_own_ledger() {
        let obj = objective(json!({
            "id": 1, "weight": 40,
            "initiatives": [{"id": 10, "weight": 30}],
            "programs": [
                {"id": 2, "initiatives": [{"id": 11, "weight": 20}]},
                {"id": 3, "initiatives": [{"id": 12, "weight": 40}]}
            ]
        }));
        let first = WeightLedger::program_initiatives(&obj, &obj.programs[0]);
        assert_eq!(first.limit(), 40.0);
        assert_eq!(first.remaining(None), 20.0);
        assert!(first.check(20.0, None).is_ok());

        let second = WeightLedger::program_initiatives(&obj, &obj.programs[1]);
        assert!(second.check(1.0, None).is_err());
        assert!(second.check(35.0, Some(InitiativeId(12))).is_ok());
    }

    #[test]
    fn test_plan_initiatives_use_plan_weight() {
        let obj = objective(json!({
            "id": 4, "effective_weight": 30,
            "initiatives": [{"id": 10, "weight": 25}]
        }));
        let plan: Plan = serde_json::from_value(json!({
            "id": 1, "organization": 1, "status": "SUBMITTED",
            "selected_objectives_weights": {"4": 50}
        }))
        .unwrap();

        let ledger = WeightLedger::plan_initiatives(&plan, &obj);
        assert_eq!(ledger.limit(), 50.0);
        assert_eq!(ledger.remaining(None), 25.0);
    }

    #[test]
    fn test_editing_excludes_own_weight() {
        let ledger = WeightLedger::new(60.0)
            .with_sibling(InitiativeId(1), 40.0)
            .with_sibling(InitiativeId(2), 20.0);

        assert!(ledger.check(1.0, None).is_err());
        assert!(ledger.check(40.0, Some(InitiativeId(1))).is_ok());
        assert!(ledger.check(41.0, Some(InitiativeId(1))).is_err());
    }

    #[test]
    fn test_rounding_slack() {
        let ledger = WeightLedger::new(100.0)
            .with_sibling(MeasureId(1), 33.33)
            .with_sibling(MeasureId(2), 33.33);
        assert!(ledger.check(33.34, None).is_ok());
        assert!(ledger.check(33.5, None).is_err());
    }

    #[test]
    fn test_measures_and_activities_are_separate() {
        let initiative: StrategicInitiative = serde_json::from_value(json!({
            "id": 1, "weight": 30,
            "performance_measures": [{"id": 1, "weight": 30}],
            "main_activities": [{"id": 1, "weight": 10}]
        }))
        .unwrap();

        assert_eq!(WeightLedger::measures(&initiative).remaining(None), 0.0);
        assert!(WeightLedger::activities(&initiative).check(20.0, None).is_ok());
    }

    #[test]
    fn test_non_positive_weight() {
        let ledger: WeightLedger<ActivityId> = WeightLedger::new(10.0);
        assert_eq!(ledger.check(0.0, None), Err(WeightError::NotPositive));
        assert_eq!(ledger.check(f64::NAN, None), Err(WeightError::NotPositive));
    }

    #[test]
    fn test_objective_selection_total() {
        let mut weights = BTreeMap::new();
        weights.insert(ObjectiveId(1), 60.0);
        weights.insert(ObjectiveId(2), 40.0);
        assert_eq!(validate_objective_selection(&weights), Ok(100.0));

        weights.insert(ObjectiveId(3), 5.0);
        assert!(matches!(
            validate_objective_selection(&weights),
            Err(WeightError::ObjectivesExceed { .. })
        ));
    }
}
