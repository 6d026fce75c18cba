//! Entity cache in front of a [`PlanningApi`].
//!
//! Reads are served from an in-memory map keyed by (entity kind, id) and
//! filled on first use. Every mutation invalidates the entries it can affect
//! before returning, so a read after a write always goes to the backend.
//!
//! Each invalidation bumps a generation counter. A fill only lands when the
//! generation is unchanged since its backend call started, so a read that
//! overlaps a mutation can never put the pre-mutation value back.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use planboard_core::{
    ActivityId, BudgetLine, CurrentUser, InitiativeId, InitiativeInput, MainActivity, MeasureId,
    NewPlan, Organization, PerformanceMeasure, Plan, PlanId, StrategicInitiative, SubActivity,
    TargetedItemInput,
};
use tokio::sync::RwLock;
use tracing::debug;

use crate::trait_::{PlanFilter, PlanningApi, Result};

/// Kind of cached entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Session check
    CurrentUser,
    /// Organization list
    Organizations,
    /// Plan list; id is the organization filter, `None` for all plans
    PlanList,
    /// Single plan with its tree; id is the plan id
    Plan,
}

/// Cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Entity kind
    pub kind: EntityKind,
    /// Entity id, when the kind has one
    pub id: Option<i64>,
}

impl CacheKey {
    fn new(kind: EntityKind, id: Option<i64>) -> Self {
        Self { kind, id }
    }

    fn plan_list(filter: &PlanFilter) -> Self {
        Self::new(EntityKind::PlanList, filter.organization.map(|o| o.get()))
    }

    fn plan(id: PlanId) -> Self {
        Self::new(EntityKind::Plan, Some(id.get()))
    }
}

#[derive(Debug, Clone)]
enum CachedValue {
    CurrentUser(CurrentUser),
    Organizations(Vec<Organization>),
    Plans(Vec<Plan>),
    Plan(Box<Plan>),
}

/// Caching wrapper around any [`PlanningApi`].
pub struct CachedApi<A: PlanningApi> {
    inner: A,
    entries: RwLock<HashMap<CacheKey, CachedValue>>,
    generation: AtomicU64,
}

impl<A: PlanningApi> CachedApi<A> {
    /// Wrap a backend.
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            entries: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// The wrapped backend.
    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// Drop one entry.
    pub async fn invalidate(&self, kind: EntityKind, id: Option<i64>) {
        let mut entries = self.entries.write().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        entries.remove(&CacheKey::new(kind, id));
    }

    /// Drop every entry of a kind.
    pub async fn invalidate_kind(&self, kind: EntityKind) {
        let mut entries = self.entries.write().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        entries.retain(|key, _| key.kind != kind);
    }

    /// Drop everything.
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        entries.clear();
    }

    /// Number of cached entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        let hit = self.entries.read().await.get(key).cloned();
        if hit.is_some() {
            debug!("Cache hit {:?}", key);
        }
        hit
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Store a value fetched when the generation was `seen`.
    async fn put(&self, key: CacheKey, value: CachedValue, seen: u64) {
        let mut entries = self.entries.write().await;
        if self.generation() != seen {
            debug!("Dropping fill for {:?}: invalidated while loading", key);
            return;
        }
        entries.insert(key, value);
    }

    async fn fetch_plans(&self, filter: &PlanFilter) -> Result<Vec<Plan>> {
        let seen = self.generation();
        let plans = self.inner.refresh_plans(filter).await?;
        self.put(CacheKey::plan_list(filter), CachedValue::Plans(plans.clone()), seen)
            .await;
        Ok(plans)
    }

    async fn plans_changed(&self) {
        self.invalidate_kind(EntityKind::PlanList).await;
    }

    async fn tree_changed(&self) {
        self.invalidate_kind(EntityKind::Plan).await;
    }
}

#[async_trait]
impl<A: PlanningApi> PlanningApi for CachedApi<A> {
    async fn current_user(&self) -> Result<CurrentUser> {
        let key = CacheKey::new(EntityKind::CurrentUser, None);
        if let Some(CachedValue::CurrentUser(user)) = self.get(&key).await {
            return Ok(user);
        }
        let seen = self.generation();
        let user = self.inner.current_user().await?;
        self.put(key, CachedValue::CurrentUser(user.clone()), seen).await;
        Ok(user)
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>> {
        let key = CacheKey::new(EntityKind::Organizations, None);
        if let Some(CachedValue::Organizations(orgs)) = self.get(&key).await {
            return Ok(orgs);
        }
        let seen = self.generation();
        let orgs = self.inner.list_organizations().await?;
        self.put(key, CachedValue::Organizations(orgs.clone()), seen).await;
        Ok(orgs)
    }

    async fn list_plans(&self, filter: &PlanFilter) -> Result<Vec<Plan>> {
        if let Some(CachedValue::Plans(plans)) = self.get(&CacheKey::plan_list(filter)).await {
            return Ok(plans);
        }
        self.fetch_plans(filter).await
    }

    async fn refresh_plans(&self, filter: &PlanFilter) -> Result<Vec<Plan>> {
        self.fetch_plans(filter).await
    }

    async fn get_plan(&self, id: PlanId) -> Result<Plan> {
        let key = CacheKey::plan(id);
        if let Some(CachedValue::Plan(plan)) = self.get(&key).await {
            return Ok(*plan);
        }
        let seen = self.generation();
        let plan = self.inner.get_plan(id).await?;
        self.put(key, CachedValue::Plan(Box::new(plan.clone())), seen).await;
        Ok(plan)
    }

    async fn create_plan(&self, plan: &NewPlan) -> Result<Plan> {
        let result = self.inner.create_plan(plan).await;
        self.plans_changed().await;
        result
    }

    async fn approve_plan(&self, id: PlanId, feedback: &str) -> Result<()> {
        let result = self.inner.approve_plan(id, feedback).await;
        self.invalidate(EntityKind::Plan, Some(id.get())).await;
        self.plans_changed().await;
        result
    }

    async fn reject_plan(&self, id: PlanId, feedback: &str) -> Result<()> {
        let result = self.inner.reject_plan(id, feedback).await;
        self.invalidate(EntityKind::Plan, Some(id.get())).await;
        self.plans_changed().await;
        result
    }

    async fn create_initiative(&self, input: &InitiativeInput) -> Result<StrategicInitiative> {
        let result = self.inner.create_initiative(input).await;
        self.tree_changed().await;
        result
    }

    async fn update_initiative(
        &self,
        id: InitiativeId,
        input: &InitiativeInput,
    ) -> Result<StrategicInitiative> {
        let result = self.inner.update_initiative(id, input).await;
        self.tree_changed().await;
        result
    }

    async fn create_measure(&self, input: &TargetedItemInput) -> Result<PerformanceMeasure> {
        let result = self.inner.create_measure(input).await;
        self.tree_changed().await;
        result
    }

    async fn update_measure(
        &self,
        id: MeasureId,
        input: &TargetedItemInput,
    ) -> Result<PerformanceMeasure> {
        let result = self.inner.update_measure(id, input).await;
        self.tree_changed().await;
        result
    }

    async fn create_activity(&self, input: &TargetedItemInput) -> Result<MainActivity> {
        let result = self.inner.create_activity(input).await;
        self.tree_changed().await;
        result
    }

    async fn update_activity(
        &self,
        id: ActivityId,
        input: &TargetedItemInput,
    ) -> Result<MainActivity> {
        let result = self.inner.update_activity(id, input).await;
        self.tree_changed().await;
        result
    }

    async fn create_sub_activity(&self, line: &BudgetLine) -> Result<SubActivity> {
        let result = self.inner.create_sub_activity(line).await;
        self.tree_changed().await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_dir::JsonDirApi;
    use planboard_core::{OrganizationId, PlanStatus};
    use serde_json::json;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::Notify;

    /// Snapshot backend whose next plan read pauses after loading, until
    /// released.
    struct GatedApi {
        inner: JsonDirApi,
        hold: AtomicBool,
        loaded: Notify,
        release: Notify,
    }

    impl GatedApi {
        fn new(inner: JsonDirApi) -> Self {
            Self {
                inner,
                hold: AtomicBool::new(false),
                loaded: Notify::new(),
                release: Notify::new(),
            }
        }

        async fn pause(&self) {
            if self.hold.swap(false, Ordering::SeqCst) {
                self.loaded.notify_one();
                self.release.notified().await;
            }
        }
    }

    #[async_trait]
    impl PlanningApi for GatedApi {
        async fn current_user(&self) -> Result<CurrentUser> {
            self.inner.current_user().await
        }

        async fn list_organizations(&self) -> Result<Vec<Organization>> {
            self.inner.list_organizations().await
        }

        async fn list_plans(&self, filter: &PlanFilter) -> Result<Vec<Plan>> {
            let plans = self.inner.list_plans(filter).await?;
            self.pause().await;
            Ok(plans)
        }

        async fn get_plan(&self, id: PlanId) -> Result<Plan> {
            let plan = self.inner.get_plan(id).await?;
            self.pause().await;
            Ok(plan)
        }

        async fn create_plan(&self, plan: &NewPlan) -> Result<Plan> {
            self.inner.create_plan(plan).await
        }

        async fn approve_plan(&self, id: PlanId, feedback: &str) -> Result<()> {
            self.inner.approve_plan(id, feedback).await
        }

        async fn reject_plan(&self, id: PlanId, feedback: &str) -> Result<()> {
            self.inner.reject_plan(id, feedback).await
        }

        async fn create_initiative(&self, input: &InitiativeInput) -> Result<StrategicInitiative> {
            self.inner.create_initiative(input).await
        }

        async fn update_initiative(
            &self,
            id: InitiativeId,
            input: &InitiativeInput,
        ) -> Result<StrategicInitiative> {
            self.inner.update_initiative(id, input).await
        }

        async fn create_measure(&self, input: &TargetedItemInput) -> Result<PerformanceMeasure> {
            self.inner.create_measure(input).await
        }

        async fn update_measure(
            &self,
            id: MeasureId,
            input: &TargetedItemInput,
        ) -> Result<PerformanceMeasure> {
            self.inner.update_measure(id, input).await
        }

        async fn create_activity(&self, input: &TargetedItemInput) -> Result<MainActivity> {
            self.inner.create_activity(input).await
        }

        async fn update_activity(
            &self,
            id: ActivityId,
            input: &TargetedItemInput,
        ) -> Result<MainActivity> {
            self.inner.update_activity(id, input).await
        }

        async fn create_sub_activity(&self, line: &BudgetLine) -> Result<SubActivity> {
            self.inner.create_sub_activity(line).await
        }
    }

    fn new_plan(org: i64) -> NewPlan {
        serde_json::from_value(json!({
            "organization": org,
            "planner_name": "Planner",
            "type": "LEO/EO Plan",
            "executive_name": null,
            "strategic_objective": null,
            "fiscal_year": null,
            "from_date": null,
            "to_date": null,
            "status": "SUBMITTED",
            "selected_objectives": [],
            "selected_objectives_weights": {}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_is_cached_until_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = JsonDirApi::new(dir.path()).await.unwrap();
        let api = CachedApi::new(snapshot);
        let filter = PlanFilter::organization(OrganizationId(1));

        assert!(api.list_plans(&filter).await.unwrap().is_empty());

        // Written behind the cache's back: not visible yet.
        api.inner().create_plan(&new_plan(1)).await.unwrap();
        assert!(api.list_plans(&filter).await.unwrap().is_empty());

        // Fresh read bypasses the cache.
        assert_eq!(api.refresh_plans(&filter).await.unwrap().len(), 1);

        // Mutation through the cache invalidates plan lists.
        api.create_plan(&new_plan(1)).await.unwrap();
        assert_eq!(api.list_plans(&filter).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_review_invalidates_plan_entry() {
        let dir = tempfile::tempdir().unwrap();
        let api = CachedApi::new(JsonDirApi::new(dir.path()).await.unwrap());
        let plan = api.create_plan(&new_plan(3)).await.unwrap();

        assert_eq!(api.get_plan(plan.id).await.unwrap().status, PlanStatus::Submitted);
        api.approve_plan(plan.id, "Looks good").await.unwrap();
        assert_eq!(api.get_plan(plan.id).await.unwrap().status, PlanStatus::Approved);
    }

    #[tokio::test]
    async fn test_read_overlapping_mutation_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let api = CachedApi::new(GatedApi::new(JsonDirApi::new(dir.path()).await.unwrap()));
        let filter = PlanFilter::organization(OrganizationId(1));

        api.inner().hold.store(true, Ordering::SeqCst);
        let read = api.list_plans(&filter);
        let write = async {
            api.inner().loaded.notified().await;
            api.create_plan(&new_plan(1)).await.unwrap();
            api.inner().release.notify_one();
        };
        let (before, ()) = tokio::join!(read, write);
        assert!(before.unwrap().is_empty());

        assert_eq!(api.list_plans(&filter).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_plan_read_overlapping_review_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let api = CachedApi::new(GatedApi::new(JsonDirApi::new(dir.path()).await.unwrap()));
        let plan = api.create_plan(&new_plan(3)).await.unwrap();

        api.inner().hold.store(true, Ordering::SeqCst);
        let read = api.get_plan(plan.id);
        let write = async {
            api.inner().loaded.notified().await;
            api.approve_plan(plan.id, "Looks good").await.unwrap();
            api.inner().release.notify_one();
        };
        let (before, ()) = tokio::join!(read, write);
        assert_eq!(before.unwrap().status, PlanStatus::Submitted);

        assert_eq!(api.get_plan(plan.id).await.unwrap().status, PlanStatus::Approved);
    }

    #[tokio::test]
    async fn test_explicit_invalidation() {
        let dir = tempfile::tempdir().unwrap();
        let api = CachedApi::new(JsonDirApi::new(dir.path()).await.unwrap());

        api.list_organizations().await.unwrap();
        api.list_plans(&PlanFilter::default()).await.unwrap();
        assert_eq!(api.len().await, 2);

        api.invalidate(EntityKind::Organizations, None).await;
        assert_eq!(api.len().await, 1);

        api.clear().await;
        assert!(api.is_empty().await);
    }
}
