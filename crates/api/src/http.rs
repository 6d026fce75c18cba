//! REST client for the planning backend.

use async_trait::async_trait;
use planboard_core::{
    ActivityId, BudgetLine, CurrentUser, InitiativeId, InitiativeInput, MainActivity, MeasureId,
    NewPlan, Organization, PerformanceMeasure, Plan, PlanId, StrategicInitiative, SubActivity,
    TargetedItemInput,
};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, ClientBuilder, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::ClientConfig;
use crate::retry::{with_read_retries, RetryPolicy};
use crate::trait_::{ApiError, PlanFilter, PlanningApi, Result};

/// HTTP implementation of [`PlanningApi`].
#[derive(Clone)]
pub struct HttpApi {
    /// HTTP client
    client: Client,

    /// API root without trailing slash
    base_url: String,

    /// Auth token
    token: Option<String>,

    /// Retry policy for reads
    retry: RetryPolicy,
}

impl HttpApi {
    /// Create a client from configuration.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = ClientBuilder::new().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            retry: config.retry_policy(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.header(AUTHORIZATION, format!("Token {}", token)),
            None => builder,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.authorize(self.client.request(method, self.url(path)))
    }

    /// GET with bounded retries.
    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        self.get_url(&self.url(path), query).await
    }

    /// GET an absolute URL with bounded retries.
    async fn get_url<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        with_read_retries(&self.retry, url, || async move {
            debug!("GET {}", url);
            let response = self.authorize(self.client.get(url)).query(query).send().await?;
            decode(response).await
        })
        .await
    }

    /// GET a list endpoint, accepting plain arrays and paginated pages. Every
    /// page is read, following `next` links.
    async fn get_list<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<T>> {
        let first: ListResponse<T> = self.get_json(path, query).await?;
        collect_pages(first, |next| async move { self.get_url(&next, &[]).await }).await
    }

    /// Write once; never retried.
    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        debug!("{} {}", method, path);
        let response = self.request(method, path).json(body).send().await?;
        decode(response).await
    }

    /// Write once, ignoring the response body.
    async fn send_unit<B>(&self, method: Method, path: &str, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized + Sync,
    {
        debug!("{} {}", method, path);
        let response = self.request(method, path).json(body).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(status_error(response).await)
        }
    }
}

/// Upper bound on pages read from one list endpoint.
const MAX_PAGES: usize = 500;

/// List endpoints return either a bare array or a paginated page.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListResponse<T> {
    Page {
        results: Vec<T>,
        #[serde(default)]
        next: Option<String>,
    },
    Plain(Vec<T>),
}

impl<T> ListResponse<T> {
    /// Items and the next page's URL.
    fn into_parts(self) -> (Vec<T>, Option<String>) {
        match self {
            ListResponse::Page { results, next } => (results, next.filter(|n| !n.is_empty())),
            ListResponse::Plain(items) => (items, None),
        }
    }
}

/// Concatenate `first` with every page reachable through `next` links.
async fn collect_pages<T, F, Fut>(first: ListResponse<T>, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(String) -> Fut,
    Fut: std::future::Future<Output = Result<ListResponse<T>>>,
{
    let (mut items, mut next) = first.into_parts();
    let mut pages = 1;
    while let Some(url) = next {
        if pages >= MAX_PAGES {
            return Err(ApiError::Other(format!("list has more than {} pages", MAX_PAGES)));
        }
        let (page, following) = fetch(url).await?.into_parts();
        items.extend(page);
        next = following;
        pages += 1;
    }
    if pages > 1 {
        debug!("Read {} items over {} pages", items.len(), pages);
    }
    Ok(items)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    if !response.status().is_success() {
        return Err(status_error(response).await);
    }
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn status_error(response: Response) -> ApiError {
    let status = response.status();
    let path = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthenticated,
        StatusCode::NOT_FOUND => ApiError::NotFound(path),
        _ => ApiError::Status {
            status: status.as_u16(),
            message: extract_message(&body),
        },
    }
}

/// Pull a human-readable message out of an error response body.
///
/// Understands `{"detail": ...}`, `{"error": ...}`, `{"message": ...}`,
/// `{"non_field_errors": [...]}` and per-field error maps; short plain-text
/// bodies are returned as-is. HTML error pages yield `None`.
pub fn extract_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => message_from_json(&value),
        Err(_) if trimmed.len() <= 300 && !trimmed.starts_with('<') => Some(trimmed.to_string()),
        Err(_) => None,
    }
}

fn message_from_json(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Array(items) => items.iter().find_map(message_from_json),
        Value::Object(map) => {
            for key in ["detail", "error", "message", "non_field_errors"] {
                if let Some(message) = map.get(key).and_then(message_from_json) {
                    return Some(message);
                }
            }
            map.iter()
                .find_map(|(field, v)| message_from_json(v).map(|m| format!("{}: {}", field, m)))
        }
        _ => None,
    }
}

#[async_trait]
impl PlanningApi for HttpApi {
    async fn current_user(&self) -> Result<CurrentUser> {
        self.get_json("auth/check/", &[]).await
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>> {
        self.get_list("organizations/", &[]).await
    }

    async fn list_plans(&self, filter: &PlanFilter) -> Result<Vec<Plan>> {
        let mut query = Vec::new();
        if let Some(org) = filter.organization {
            query.push(("organization", org.to_string()));
        }
        self.get_list("plans/", &query).await
    }

    async fn get_plan(&self, id: PlanId) -> Result<Plan> {
        self.get_json(&format!("plans/{}/", id), &[]).await
    }

    async fn create_plan(&self, plan: &NewPlan) -> Result<Plan> {
        self.send_json(Method::POST, "plans/", plan).await
    }

    async fn approve_plan(&self, id: PlanId, feedback: &str) -> Result<()> {
        self.send_unit(Method::POST, &format!("plans/{}/approve/", id), &json!({ "feedback": feedback }))
            .await
    }

    async fn reject_plan(&self, id: PlanId, feedback: &str) -> Result<()> {
        self.send_unit(Method::POST, &format!("plans/{}/reject/", id), &json!({ "feedback": feedback }))
            .await
    }

    async fn create_initiative(&self, input: &InitiativeInput) -> Result<StrategicInitiative> {
        self.send_json(Method::POST, "strategic-initiatives/", input).await
    }

    async fn update_initiative(
        &self,
        id: InitiativeId,
        input: &InitiativeInput,
    ) -> Result<StrategicInitiative> {
        self.send_json(Method::PUT, &format!("strategic-initiatives/{}/", id), input)
            .await
    }

    async fn create_measure(&self, input: &TargetedItemInput) -> Result<PerformanceMeasure> {
        self.send_json(Method::POST, "performance-measures/", input).await
    }

    async fn update_measure(
        &self,
        id: MeasureId,
        input: &TargetedItemInput,
    ) -> Result<PerformanceMeasure> {
        self.send_json(Method::PUT, &format!("performance-measures/{}/", id), input)
            .await
    }

    async fn create_activity(&self, input: &TargetedItemInput) -> Result<MainActivity> {
        self.send_json(Method::POST, "main-activities/", input).await
    }

    async fn update_activity(
        &self,
        id: ActivityId,
        input: &TargetedItemInput,
    ) -> Result<MainActivity> {
        self.send_json(Method::PUT, &format!("main-activities/{}/", id), input)
            .await
    }

    async fn create_sub_activity(&self, line: &BudgetLine) -> Result<SubActivity> {
        if line.main_activity.is_none() {
            return Err(ApiError::Other("sub-activity needs a main_activity".to_string()));
        }
        self.send_json(Method::POST, "sub-activities/", line).await
    }
}
