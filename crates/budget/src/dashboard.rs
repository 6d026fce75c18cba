//! Budget dashboard service.
//!
//! Loads the plans the current user may see, fills in missing plan trees,
//! and runs every rollup over the same snapshot.

use std::collections::BTreeMap;
use std::sync::Arc;

use planboard_api::{ApiError, LatestOnly, PlanFilter, PlanningApi, Result};
use planboard_core::{
    organization_name, resolve_org_name, AccessScope, Organization, OrganizationId, Plan, PlanId,
    PlanStatus, PlanType, Time,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::aggregator::{
    aggregate, aggregate_by_month, aggregate_by_organization, aggregate_by_type, BudgetTotals,
    MonthlyTotals, PlanBudgetReport,
};
use crate::audit::{audit_plan, DataQualityWarning};

/// Which plans a dashboard covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardQuery {
    /// Only this organization
    pub organization: Option<OrganizationId>,
    /// Only these statuses; empty means all
    pub statuses: Vec<PlanStatus>,
}

impl DashboardQuery {
    fn admits(&self, plan: &Plan) -> bool {
        self.statuses.is_empty() || self.statuses.contains(&plan.status)
    }
}

/// Totals of one organization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganizationRollup {
    /// Organization
    pub organization: OrganizationId,
    /// Display name
    pub name: String,
    /// Totals over the organization's plans
    pub totals: BudgetTotals,
}

/// Totals of one plan type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeRollup {
    /// Plan type
    pub plan_type: PlanType,
    /// Totals over plans of this type
    pub totals: BudgetTotals,
}

/// Everything the dashboard shows, computed from one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    /// When the snapshot was taken
    pub generated_at: Time,
    /// All included plans
    pub totals: BudgetTotals,
    /// Per organization, by name
    pub by_organization: Vec<OrganizationRollup>,
    /// Per submission month
    pub by_month: MonthlyTotals,
    /// Per plan type
    pub by_type: Vec<TypeRollup>,
    /// Data-quality findings
    pub warnings: Vec<DataQualityWarning>,
}

impl DashboardReport {
    /// Roll up an already-loaded set of plans.
    pub fn build(plans: &[Plan], organizations: &[Organization]) -> Self {
        let orgs: BTreeMap<OrganizationId, Organization> = organizations
            .iter()
            .map(|o| (o.id, o.clone()))
            .collect();

        let mut by_organization: Vec<OrganizationRollup> = aggregate_by_organization(plans)
            .into_iter()
            .map(|(id, totals)| {
                let name = plans
                    .iter()
                    .find(|p| p.organization == id)
                    .map(|p| resolve_org_name(p, &orgs))
                    .unwrap_or_else(|| organization_name(id, &orgs));
                OrganizationRollup {
                    organization: id,
                    name,
                    totals,
                }
            })
            .collect();
        by_organization.sort_by(|a, b| a.name.cmp(&b.name).then(a.organization.cmp(&b.organization)));

        let by_type = aggregate_by_type(plans)
            .into_iter()
            .map(|(plan_type, totals)| TypeRollup { plan_type, totals })
            .collect();

        Self {
            generated_at: chrono::Utc::now(),
            totals: aggregate(plans),
            by_organization,
            by_month: aggregate_by_month(plans),
            by_type,
            warnings: plans.iter().flat_map(audit_plan).collect(),
        }
    }
}

/// Dashboard over a planning backend.
pub struct BudgetDashboard<A: PlanningApi> {
    api: Arc<A>,
    latest: LatestOnly<DashboardReport>,
}

impl<A: PlanningApi> BudgetDashboard<A> {
    /// Create a dashboard.
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            latest: LatestOnly::new(),
        }
    }

    async fn scope(&self) -> Result<AccessScope> {
        let user = self.api.current_user().await?;
        if !user.is_authenticated {
            return Err(ApiError::Unauthenticated);
        }
        Ok(user.scope())
    }

    async fn hydrate(&self, plan: Plan) -> Result<Plan> {
        if plan.has_tree() {
            return Ok(plan);
        }
        debug!("Fetching tree for plan {}", plan.id);
        self.api.get_plan(plan.id).await
    }

    /// Plans matching `query` that the current user may see, with trees.
    pub async fn plans(&self, query: &DashboardQuery) -> Result<(Vec<Plan>, Vec<Organization>)> {
        let scope = self.scope().await?;
        let filter = PlanFilter {
            organization: query.organization,
        };

        let (organizations, listed) = tokio::try_join!(
            self.api.list_organizations(),
            self.api.list_plans(&filter)
        )?;
        let listed_count = listed.len();

        let mut plans = Vec::new();
        for plan in listed {
            if scope.allows(plan.organization) && query.admits(&plan) {
                plans.push(self.hydrate(plan).await?);
            }
        }

        debug!("{} of {} listed plans in scope", plans.len(), listed_count);
        Ok((plans, organizations))
    }

    /// Load and roll up.
    pub async fn load(&self, query: &DashboardQuery) -> Result<DashboardReport> {
        let (plans, organizations) = self.plans(query).await?;
        let report = DashboardReport::build(&plans, &organizations);
        info!(
            "Dashboard over {} plans: budget {:.2}, gap {:.2}",
            report.totals.plan_count, report.totals.total_budget, report.totals.funding_gap
        );
        Ok(report)
    }

    /// Load and keep the result unless a newer refresh was started meanwhile.
    ///
    /// Returns `Ok(None)` when this refresh was superseded.
    pub async fn refresh(&self, query: &DashboardQuery) -> Result<Option<DashboardReport>> {
        self.latest.run(self.load(query)).await
    }

    /// The last kept report.
    pub async fn current(&self) -> Option<DashboardReport> {
        self.latest.current().await
    }

    /// Budget breakdown of one plan.
    pub async fn plan_report(&self, id: PlanId) -> Result<PlanBudgetReport> {
        let plan = self.visible_plan(id).await?;
        Ok(PlanBudgetReport::build(&plan))
    }

    /// Data-quality findings for one plan.
    pub async fn audit(&self, id: PlanId) -> Result<Vec<DataQualityWarning>> {
        let plan = self.visible_plan(id).await?;
        Ok(audit_plan(&plan))
    }

    /// Listed plans the current user may see, without their trees.
    pub async fn visible_plans(&self, filter: &PlanFilter) -> Result<Vec<Plan>> {
        let scope = self.scope().await?;
        let listed = self.api.list_plans(filter).await?;
        Ok(listed
            .into_iter()
            .filter(|plan| scope.allows(plan.organization))
            .collect())
    }

    /// A plan with its tree, if the current user may see it.
    pub async fn visible_plan(&self, id: PlanId) -> Result<Plan> {
        let scope = self.scope().await?;
        let plan = self.api.get_plan(id).await?;
        if !scope.allows(plan.organization) {
            return Err(ApiError::Status {
                status: 403,
                message: Some("You do not have access to this plan.".to_string()),
            });
        }
        Ok(plan)
    }
}
