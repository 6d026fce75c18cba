//! Offline snapshot backend.
//!
//! Serves an exported copy of the backend from a directory of JSON files:
//!
//! ```text
//! <root>/current_user.json
//! <root>/organizations/<id>.json
//! <root>/plans/<id>.json
//! ```
//!
//! Plans are stored with their full nested tree. Plan creation and review
//! decisions write back into the directory; editing the plan tree is not
//! offered offline.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use planboard_core::{
    ActivityId, BudgetLine, CurrentUser, InitiativeId, InitiativeInput, MainActivity, MeasureId,
    NewPlan, Organization, PerformanceMeasure, Plan, PlanId, PlanReview, PlanStatus, ReviewId,
    StrategicInitiative, SubActivity, TargetedItemInput,
};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::trait_::{ApiError, PlanFilter, PlanningApi, Result};

/// File-based snapshot backend.
pub struct JsonDirApi {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonDirApi {
    /// Open a snapshot directory, creating the subdirectories it needs.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("organizations")).await?;
        fs::create_dir_all(root.join("plans")).await?;

        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    fn plan_path(&self, id: PlanId) -> PathBuf {
        self.root.join("plans").join(format!("{}.json", id))
    }

    fn organization_path(&self, organization: &Organization) -> PathBuf {
        self.root
            .join("organizations")
            .join(format!("{}.json", organization.id))
    }

    fn user_path(&self) -> PathBuf {
        self.root.join("current_user.json")
    }

    /// Store an organization record.
    pub async fn save_organization(&self, organization: &Organization) -> Result<()> {
        write_json(&self.organization_path(organization), organization).await
    }

    /// Store a plan record, replacing any plan with the same id.
    pub async fn save_plan(&self, plan: &Plan) -> Result<()> {
        write_json(&self.plan_path(plan.id), plan).await
    }

    /// Store the session returned by [`PlanningApi::current_user`].
    pub async fn save_current_user(&self, user: &CurrentUser) -> Result<()> {
        write_json(&self.user_path(), user).await
    }

    async fn all_plans(&self) -> Result<Vec<Plan>> {
        let mut plans: Vec<Plan> = list_dir(&self.root.join("plans")).await?;
        plans.sort_by_key(|p| p.id);
        Ok(plans)
    }

    async fn decide(&self, id: PlanId, decision: PlanStatus, feedback: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut plan = self.get_plan(id).await?;
        if plan.status != PlanStatus::Submitted {
            return Err(ApiError::Status {
                status: 400,
                message: Some(format!("Plan {} is {} and cannot be reviewed", id, plan.status)),
            });
        }

        let now = chrono::Utc::now();
        let review_id = plan.reviews.iter().map(|r| r.id.get()).max().unwrap_or(0) + 1;
        plan.reviews.push(PlanReview {
            id: ReviewId(review_id),
            plan: Some(id),
            evaluator: None,
            evaluator_name: None,
            status: decision,
            feedback: feedback.to_string(),
            reviewed_at: Some(now),
        });
        plan.status = decision;
        plan.updated_at = Some(now);

        self.save_plan(&plan).await?;
        info!("Plan {} marked {} in snapshot", id, decision);
        Ok(())
    }
}

#[async_trait]
impl PlanningApi for JsonDirApi {
    async fn current_user(&self) -> Result<CurrentUser> {
        read_json(&self.user_path())
            .await?
            .ok_or(ApiError::Unauthenticated)
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>> {
        let mut orgs: Vec<Organization> = list_dir(&self.root.join("organizations")).await?;
        orgs.sort_by_key(|o| o.id);
        Ok(orgs)
    }

    async fn list_plans(&self, filter: &PlanFilter) -> Result<Vec<Plan>> {
        let plans = self.all_plans().await?;
        debug!("Snapshot holds {} plans", plans.len());
        Ok(plans.into_iter().filter(|p| filter.matches(p)).collect())
    }

    async fn get_plan(&self, id: PlanId) -> Result<Plan> {
        read_json(&self.plan_path(id))
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("plan {}", id)))
    }

    async fn create_plan(&self, new_plan: &NewPlan) -> Result<Plan> {
        let _guard = self.write_lock.lock().await;

        let next_id = self.all_plans().await?.last().map_or(1, |p| p.id.get() + 1);
        let now = chrono::Utc::now();
        let plan = Plan {
            id: PlanId(next_id),
            organization: new_plan.organization,
            organization_name: None,
            planner_name: new_plan.planner_name.clone(),
            plan_type: new_plan.plan_type,
            executive_name: new_plan.executive_name.clone(),
            strategic_objective: new_plan.strategic_objective,
            program: None,
            fiscal_year: new_plan.fiscal_year.clone(),
            from_date: new_plan.from_date,
            to_date: new_plan.to_date,
            status: new_plan.status,
            submitted_at: Some(now),
            selected_objectives: new_plan.selected_objectives.clone(),
            selected_objectives_weights: new_plan.selected_objectives_weights.clone(),
            objectives: None,
            reviews: Vec::new(),
            created_at: Some(now),
            updated_at: Some(now),
        };

        self.save_plan(&plan).await?;
        info!("Plan {} created in snapshot for organization {}", plan.id, plan.organization);
        Ok(plan)
    }

    async fn approve_plan(&self, id: PlanId, feedback: &str) -> Result<()> {
        self.decide(id, PlanStatus::Approved, feedback).await
    }

    async fn reject_plan(&self, id: PlanId, feedback: &str) -> Result<()> {
        self.decide(id, PlanStatus::Rejected, feedback).await
    }

    async fn create_initiative(&self, _input: &InitiativeInput) -> Result<StrategicInitiative> {
        Err(ApiError::Unsupported("editing initiatives offline"))
    }

    async fn update_initiative(
        &self,
        _id: InitiativeId,
        _input: &InitiativeInput,
    ) -> Result<StrategicInitiative> {
        Err(ApiError::Unsupported("editing initiatives offline"))
    }

    async fn create_measure(&self, _input: &TargetedItemInput) -> Result<PerformanceMeasure> {
        Err(ApiError::Unsupported("editing measures offline"))
    }

    async fn update_measure(
        &self,
        _id: MeasureId,
        _input: &TargetedItemInput,
    ) -> Result<PerformanceMeasure> {
        Err(ApiError::Unsupported("editing measures offline"))
    }

    async fn create_activity(&self, _input: &TargetedItemInput) -> Result<MainActivity> {
        Err(ApiError::Unsupported("editing activities offline"))
    }

    async fn update_activity(
        &self,
        _id: ActivityId,
        _input: &TargetedItemInput,
    ) -> Result<MainActivity> {
        Err(ApiError::Unsupported("editing activities offline"))
    }

    async fn create_sub_activity(&self, _line: &BudgetLine) -> Result<SubActivity> {
        Err(ApiError::Unsupported("editing sub-activities offline"))
    }
}

async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json.as_bytes()).await?;
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        if entry.path().extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        if let Some(item) = read_json(&entry.path()).await? {
            items.push(item);
        }
    }
    Ok(items)
}
