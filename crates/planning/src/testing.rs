//! In-memory backend for planning tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use planboard_api::{ApiError, PlanFilter, PlanningApi, Result};
use planboard_core::{
    ActivityId, BudgetLine, BudgetLineId, CurrentUser, InitiativeId, InitiativeInput,
    MainActivity, MeasureId, NewPlan, Organization, PerformanceMeasure, Plan, PlanId, PlanStatus,
    StrategicInitiative, SubActivity, TargetedItemInput,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

/// Backend whose plan list can lag behind the fresh view, counting writes.
pub(crate) struct MockApi {
    pub user: CurrentUser,
    /// What `list_plans` returns (a possibly stale cached view)
    pub listed: Mutex<Vec<Plan>>,
    /// What `refresh_plans` and `get_plan` see
    pub plans: Mutex<Vec<Plan>>,
    pub creates: AtomicUsize,
    pub decisions: AtomicUsize,
    /// Initiative, measure, activity and sub-activity writes
    pub tree_writes: AtomicUsize,
    pub fail_writes: bool,
}

impl MockApi {
    pub fn new(role: &str, organization: i64) -> Self {
        let user = serde_json::from_value(json!({
            "isAuthenticated": true,
            "user": {"id": 7, "username": "tester"},
            "userOrganizations": [{"organization": organization, "role": role}]
        }))
        .unwrap();
        Self {
            user,
            listed: Mutex::new(Vec::new()),
            plans: Mutex::new(Vec::new()),
            creates: AtomicUsize::new(0),
            decisions: AtomicUsize::new(0),
            tree_writes: AtomicUsize::new(0),
            fail_writes: false,
        }
    }

    pub fn with_plan(self, plan: Plan) -> Self {
        self.plans.lock().unwrap().push(plan.clone());
        self.listed.lock().unwrap().push(plan);
        self
    }

    /// Add a plan the stale list does not know about yet.
    pub fn with_unlisted_plan(self, plan: Plan) -> Self {
        self.plans.lock().unwrap().push(plan);
        self
    }

    pub fn signed_out(mut self) -> Self {
        self.user.is_authenticated = false;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn decisions(&self) -> usize {
        self.decisions.load(Ordering::SeqCst)
    }

    pub fn tree_writes(&self) -> usize {
        self.tree_writes.load(Ordering::SeqCst)
    }

    /// Count a tree write and echo the input back as the saved entity.
    fn save<I: Serialize, T: DeserializeOwned>(&self, id: i64, input: &I) -> Result<T> {
        self.tree_writes.fetch_add(1, Ordering::SeqCst);
        self.write_failure()?;
        let mut value = serde_json::to_value(input)?;
        value["id"] = json!(id);
        Ok(serde_json::from_value(value)?)
    }

    fn write_failure(&self) -> Result<()> {
        if self.fail_writes {
            return Err(ApiError::Status {
                status: 500,
                message: None,
            });
        }
        Ok(())
    }

    fn decide(&self, id: PlanId, status: PlanStatus) -> Result<()> {
        self.decisions.fetch_add(1, Ordering::SeqCst);
        self.write_failure()?;
        let mut plans = self.plans.lock().unwrap();
        let plan = plans
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("plan {}", id)))?;
        plan.status = status;
        Ok(())
    }
}

pub(crate) fn plan(id: i64, organization: i64, status: &str) -> Plan {
    serde_json::from_value(json!({"id": id, "organization": organization, "status": status}))
        .unwrap()
}

#[async_trait]
impl PlanningApi for MockApi {
    async fn current_user(&self) -> Result<CurrentUser> {
        Ok(self.user.clone())
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>> {
        Ok(Vec::new())
    }

    async fn list_plans(&self, filter: &PlanFilter) -> Result<Vec<Plan>> {
        let listed = self.listed.lock().unwrap();
        Ok(listed.iter().filter(|p| filter.matches(p)).cloned().collect())
    }

    async fn refresh_plans(&self, filter: &PlanFilter) -> Result<Vec<Plan>> {
        let plans = self.plans.lock().unwrap();
        Ok(plans.iter().filter(|p| filter.matches(p)).cloned().collect())
    }

    async fn get_plan(&self, id: PlanId) -> Result<Plan> {
        let plans = self.plans.lock().unwrap();
        plans
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("plan {}", id)))
    }

    async fn create_plan(&self, new_plan: &NewPlan) -> Result<Plan> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.write_failure()?;
        let mut plans = self.plans.lock().unwrap();
        let mut created = plan(plans.len() as i64 + 100, new_plan.organization.get(), "SUBMITTED");
        created.planner_name = new_plan.planner_name.clone();
        created.selected_objectives = new_plan.selected_objectives.clone();
        plans.push(created.clone());
        Ok(created)
    }

    async fn approve_plan(&self, id: PlanId, _feedback: &str) -> Result<()> {
        self.decide(id, PlanStatus::Approved)
    }

    async fn reject_plan(&self, id: PlanId, _feedback: &str) -> Result<()> {
        self.decide(id, PlanStatus::Rejected)
    }

    async fn create_initiative(&self, input: &InitiativeInput) -> Result<StrategicInitiative> {
        self.save(500, input)
    }

    async fn update_initiative(
        &self,
        id: InitiativeId,
        input: &InitiativeInput,
    ) -> Result<StrategicInitiative> {
        self.save(id.get(), input)
    }

    async fn create_measure(&self, input: &TargetedItemInput) -> Result<PerformanceMeasure> {
        self.save(600, input)
    }

    async fn update_measure(
        &self,
        id: MeasureId,
        input: &TargetedItemInput,
    ) -> Result<PerformanceMeasure> {
        self.save(id.get(), input)
    }

    async fn create_activity(&self, input: &TargetedItemInput) -> Result<MainActivity> {
        self.save(700, input)
    }

    async fn update_activity(
        &self,
        id: ActivityId,
        input: &TargetedItemInput,
    ) -> Result<MainActivity> {
        self.save(id.get(), input)
    }

    async fn create_sub_activity(&self, line: &BudgetLine) -> Result<SubActivity> {
        self.tree_writes.fetch_add(1, Ordering::SeqCst);
        self.write_failure()?;
        let mut saved = line.clone();
        saved.id = Some(BudgetLineId(800));
        Ok(saved)
    }
}
