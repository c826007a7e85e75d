//! Typed access to the ThreatQ indicator endpoints.
//!
//! Every method takes the caller's `Credentials` and goes through the shared
//! `AuthenticatedRequestExecutor`, so tokens are cached and refreshed the
//! same way for lookups, detail views, and edits.

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::models::{
    AttributePage, CommentPage, DataEnvelope, Id, Indicator, IndicatorAttribute, IndicatorDetails,
};

use super::executor::{ApiResponse, AuthenticatedRequestExecutor, Credentials, RequestSpec};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Page size for advanced search. Matches the per-request entity batch.
const SEARCH_LIMIT: u32 = 10;

/// Number of most recent comments shown in the detail view
const COMMENT_LIMIT: u32 = 30;

/// Related resources pulled in with an indicator's details
const DETAIL_RELATIONS: &str = "tags,adversaries,attributes,indicators,watchlist";

/// ThreatQ API client.
/// Clone is cheap - the executor shares its HTTP pool and session cache.
#[derive(Clone)]
pub struct ThreatQClient {
    executor: AuthenticatedRequestExecutor,
}

/// Pull `data` out of a response envelope, `Null` when absent (e.g. 204)
fn data(response: ApiResponse) -> Value {
    match response.body {
        Value::Object(mut map) => map.remove("data").unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// Expect `data` to be a one-element array and return that element
fn single_item(response: ApiResponse, what: &str) -> Result<Value, ApiError> {
    match data(response) {
        Value::Array(mut items) if items.len() == 1 => Ok(items.remove(0)),
        other => {
            warn!(body = %other, "Unexpected response from {} call", what);
            Err(ApiError::InvalidResponse(format!(
                "Unexpected response from {} call",
                what
            )))
        }
    }
}

impl ThreatQClient {
    pub fn new(executor: AuthenticatedRequestExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &AuthenticatedRequestExecutor {
        &self.executor
    }

    async fn execute(
        &self,
        creds: &Credentials,
        spec: RequestSpec,
    ) -> Result<ApiResponse, ApiError> {
        self.executor.execute(creds, &spec).await
    }

    // ===== Search / Details =====

    /// Run an advanced search built by `query::search_body`
    pub async fn search(
        &self,
        creds: &Credentials,
        body: Value,
    ) -> Result<Vec<Indicator>, ApiError> {
        let spec = RequestSpec::post("/api/search/advanced")
            .query("limit", SEARCH_LIMIT)
            .json(body);
        let envelope: DataEnvelope<Vec<Indicator>> = self.execute(creds, spec).await?.json()?;
        debug!(results = envelope.data.len(), "Advanced search complete");
        Ok(envelope.data)
    }

    pub async fn indicator_details(
        &self,
        creds: &Credentials,
        indicator_id: &Id,
    ) -> Result<IndicatorDetails, ApiError> {
        let spec = RequestSpec::get(format!("/api/indicators/{}", indicator_id))
            .query("with", DETAIL_RELATIONS);
        let envelope: DataEnvelope<IndicatorDetails> = self.execute(creds, spec).await?.json()?;
        Ok(envelope.data)
    }

    /// Source id of the authenticated user, used to mark the user's own comments
    pub async fn current_user_source_id(&self, creds: &Credentials) -> Result<Value, ApiError> {
        let response = self.execute(creds, RequestSpec::get("/api/users/current")).await?;
        match data(response).pointer("/source/id") {
            Some(id) if !id.is_null() => Ok(id.clone()),
            _ => Err(ApiError::InvalidResponse(
                "Could not retrieve current user".to_string(),
            )),
        }
    }

    // ===== Comments =====

    pub async fn comments(
        &self,
        creds: &Credentials,
        indicator_id: &Id,
    ) -> Result<CommentPage, ApiError> {
        let spec = RequestSpec::get(format!("/api/indicators/{}/comments", indicator_id))
            .query("limit", COMMENT_LIMIT)
            .query("sort", "-created_at")
            // includes the user that created each comment
            .query("with", "sources");
        let envelope: DataEnvelope<Vec<Value>> = self.execute(creds, spec).await?.json()?;
        Ok(CommentPage {
            total_comments: envelope.total,
            comments: envelope.data,
        })
    }

    pub async fn create_comment(
        &self,
        creds: &Credentials,
        indicator_id: &Id,
        comment: &str,
    ) -> Result<Value, ApiError> {
        let spec = RequestSpec::post(format!("/api/indicators/{}/comments", indicator_id))
            .json(json!({ "value": comment }));
        Ok(data(self.execute(creds, spec).await?))
    }

    pub async fn update_comment(
        &self,
        creds: &Credentials,
        comment_id: &Id,
        value: &str,
    ) -> Result<Value, ApiError> {
        let spec = RequestSpec::put(format!("/api/indicators/comments/{}", comment_id))
            .json(json!({ "value": value }));
        Ok(data(self.execute(creds, spec).await?))
    }

    pub async fn delete_comment(
        &self,
        creds: &Credentials,
        indicator_id: &Id,
        comment_id: &Id,
    ) -> Result<(), ApiError> {
        let spec = RequestSpec::delete(format!(
            "/api/indicators/{}/comments/{}",
            indicator_id, comment_id
        ));
        self.execute(creds, spec).await?;
        Ok(())
    }

    // ===== Tags =====

    pub async fn add_tag(
        &self,
        creds: &Credentials,
        indicator_id: &Id,
        name: &str,
    ) -> Result<Value, ApiError> {
        let spec = RequestSpec::post(format!("/api/indicators/{}/tags/", indicator_id))
            .json(json!({ "name": name }));
        single_item(self.execute(creds, spec).await?, "add tags")
    }

    pub async fn delete_tag(
        &self,
        creds: &Credentials,
        indicator_id: &Id,
        tag_id: &Id,
    ) -> Result<(), ApiError> {
        let spec = RequestSpec::delete(format!("/api/indicators/{}/tags/{}", indicator_id, tag_id));
        self.execute(creds, spec).await?;
        Ok(())
    }

    // ===== Watchlist =====

    pub async fn add_to_watchlist(
        &self,
        creds: &Credentials,
        indicator_id: &Id,
    ) -> Result<Value, ApiError> {
        let spec = RequestSpec::post(format!("/api/indicators/{}/watchlist", indicator_id));
        Ok(data(self.execute(creds, spec).await?))
    }

    pub async fn remove_from_watchlist(
        &self,
        creds: &Credentials,
        indicator_id: &Id,
        watchlist_id: &Id,
    ) -> Result<(), ApiError> {
        let spec = RequestSpec::delete(format!(
            "/api/indicators/{}/watchlist/{}",
            indicator_id, watchlist_id
        ));
        self.execute(creds, spec).await?;
        Ok(())
    }

    // ===== Attributes =====

    /// All attributes of an indicator; callers filter to the configured set
    pub async fn attributes(
        &self,
        creds: &Credentials,
        indicator_id: &Id,
    ) -> Result<AttributePage, ApiError> {
        let spec = RequestSpec::get(format!("/api/indicators/{}/attributes", indicator_id));
        let envelope: DataEnvelope<Vec<IndicatorAttribute>> =
            self.execute(creds, spec).await?.json()?;
        Ok(AttributePage {
            total_attributes: envelope.total,
            attributes: envelope.data,
        })
    }

    pub async fn add_attribute(
        &self,
        creds: &Credentials,
        indicator_id: &Id,
        name: &str,
        value: &str,
    ) -> Result<Value, ApiError> {
        let spec = RequestSpec::post(format!("/api/indicators/{}/attributes", indicator_id))
            .json(json!([{ "name": name, "value": value, "sources": [] }]));
        match data(self.execute(creds, spec).await?) {
            Value::Array(mut items) if !items.is_empty() => Ok(items.remove(0)),
            _ => Err(ApiError::InvalidResponse(
                "Unexpected response from add attribute call".to_string(),
            )),
        }
    }

    pub async fn update_attribute(
        &self,
        creds: &Credentials,
        indicator_id: &Id,
        attribute_id: &Id,
        value: &str,
    ) -> Result<Value, ApiError> {
        let spec = RequestSpec::put(format!(
            "/api/indicators/{}/attributes/{}",
            indicator_id, attribute_id
        ))
        .json(json!({ "value": value }));
        Ok(data(self.execute(creds, spec).await?))
    }

    pub async fn delete_attribute(
        &self,
        creds: &Credentials,
        indicator_id: &Id,
        attribute_id: &Id,
    ) -> Result<(), ApiError> {
        let spec = RequestSpec::delete(format!(
            "/api/indicators/{}/attributes/{}",
            indicator_id, attribute_id
        ));
        self.execute(creds, spec).await?;
        Ok(())
    }

    // ===== Score / Status =====

    /// Set a manual score. Note the singular `indicator` in this path.
    pub async fn update_score(
        &self,
        creds: &Credentials,
        indicator_id: &Id,
        score: Value,
    ) -> Result<Value, ApiError> {
        let spec = RequestSpec::put(format!("/api/indicator/{}/scores", indicator_id))
            .json(json!({ "manual_score": score }));
        Ok(data(self.execute(creds, spec).await?))
    }

    /// Set the indicator status (1 Active, 2 Expired, 3 Indirect, 4 Review,
    /// 5 Whitelisted on a stock install)
    pub async fn update_status(
        &self,
        creds: &Credentials,
        indicator_id: &Id,
        status_id: Value,
    ) -> Result<Value, ApiError> {
        let spec = RequestSpec::put(format!("/api/indicators/{}", indicator_id))
            .json(json!({ "status_id": status_id }));
        Ok(data(self.execute(creds, spec).await?))
    }
}
