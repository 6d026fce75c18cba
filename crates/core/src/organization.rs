//! Organization model and the signed-in user's organization memberships.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::amount::lenient;
use crate::id::{OrganizationId, UserId};
use crate::plan::Plan;

/// An organizational unit that owns plans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    /// Unique identifier
    pub id: OrganizationId,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Unit type (ministry, directorate, team, ...)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub org_type: Option<String>,

    /// Parent unit
    #[serde(default)]
    pub parent: Option<OrganizationId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vision: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mission: Option<String>,

    #[serde(default, deserialize_with = "lenient::null_default")]
    pub core_values: Vec<String>,
}

/// Role of a user within an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Sees and administers every organization
    #[serde(alias = "admin")]
    Admin,
    /// Prepares and submits plans for their organization
    #[serde(alias = "planner")]
    Planner,
    /// Reviews submitted plans
    #[serde(alias = "evaluator")]
    Evaluator,
    /// Any role this client does not know about
    #[serde(other)]
    Other,
}

/// One organization membership of the current user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserOrganization {
    /// Organization
    pub organization: OrganizationId,

    /// Organization's display name
    #[serde(default)]
    pub organization_name: Option<String>,

    /// Role within the organization
    pub role: Role,
}

/// Account details of the current user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: UserId,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub first_name: Option<String>,

    #[serde(default)]
    pub last_name: Option<String>,
}

/// Response of the session check endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Whether the session is authenticated
    #[serde(rename = "isAuthenticated", default)]
    pub is_authenticated: bool,

    /// Account, when authenticated
    #[serde(default)]
    pub user: Option<User>,

    /// Organization memberships
    #[serde(rename = "userOrganizations", default, deserialize_with = "lenient::null_default")]
    pub user_organizations: Vec<UserOrganization>,
}

impl CurrentUser {
    /// Which organizations' data this user may aggregate.
    pub fn scope(&self) -> AccessScope {
        if self.has_role(Role::Admin) {
            return AccessScope::All;
        }
        AccessScope::Organizations(
            self.user_organizations
                .iter()
                .map(|m| m.organization)
                .collect(),
        )
    }

    /// Whether any membership carries `role`.
    pub fn has_role(&self, role: Role) -> bool {
        self.user_organizations.iter().any(|m| m.role == role)
    }

    /// Whether the user may approve or reject plans.
    pub fn can_review(&self) -> bool {
        self.has_role(Role::Admin) || self.has_role(Role::Evaluator)
    }

    /// The organization the user plans for, if any.
    pub fn planning_organization(&self) -> Option<OrganizationId> {
        self.user_organizations
            .iter()
            .find(|m| m.role == Role::Planner)
            .or_else(|| self.user_organizations.first())
            .map(|m| m.organization)
    }
}

/// Organizations whose plans a user may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessScope {
    /// Every organization
    All,
    /// Only these organizations
    Organizations(BTreeSet<OrganizationId>),
}

impl AccessScope {
    /// Whether `organization` is within the scope.
    pub fn allows(&self, organization: OrganizationId) -> bool {
        match self {
            AccessScope::All => true,
            AccessScope::Organizations(set) => set.contains(&organization),
        }
    }
}

/// Display name of a plan's organization.
///
/// Uses the name denormalized onto the plan, then the organization list, then
/// a placeholder built from the id.
pub fn resolve_org_name(plan: &Plan, organizations: &BTreeMap<OrganizationId, Organization>) -> String {
    if let Some(name) = plan.organization_name.as_deref().map(str::trim) {
        if !name.is_empty() {
            return name.to_string();
        }
    }
    organization_name(plan.organization, organizations)
}

/// Display name of an organization by id, with the same fallback as
/// [`resolve_org_name`].
pub fn organization_name(
    id: OrganizationId,
    organizations: &BTreeMap<OrganizationId, Organization>,
) -> String {
    organizations
        .get(&id)
        .map(|org| org.name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Organization {id}"))
}
