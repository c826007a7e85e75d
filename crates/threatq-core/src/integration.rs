//! Host-facing entry points.
//!
//! `Integration` is created once at startup and then serves lookups, detail
//! expansions, edit messages, and options validation. It owns the shared
//! session cache, so every call made with the same credentials reuses one
//! bearer token until the server rejects it.

use std::sync::Arc;

use anyhow::Result;
use futures::future::try_join_all;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::actions::{self, Action};
use crate::api::{query, AuthenticatedRequestExecutor, ThreatQClient};
use crate::auth::SessionManager;
use crate::config::IntegrationConfig;
use crate::error::IntegrationError;
use crate::lookup::{
    build_lookup_result, group_entities, user_options_view, MAX_ENTITIES_PER_LOOKUP,
};
use crate::models::{DetailView, Entity, Id, LookupResult};
use crate::options::{IntegrationOptions, ValidationError};

pub struct Integration {
    config: Arc<IntegrationConfig>,
    client: ThreatQClient,
}

impl Integration {
    /// Build the transport from the config's TLS/proxy settings and start
    /// with an empty session cache
    pub fn startup(config: IntegrationConfig) -> Result<Self> {
        let http = config.request.build_client()?;
        info!(
            indicator_types = config.indicator_types.len(),
            attributes = config.attributes.len(),
            "ThreatQ integration starting"
        );
        Ok(Self::with_http_client(config, http))
    }

    /// Use an already-built HTTP client
    pub fn with_http_client(config: IntegrationConfig, http: reqwest::Client) -> Self {
        let sessions = Arc::new(SessionManager::new());
        let executor = AuthenticatedRequestExecutor::new(http, sessions);
        Self {
            config: Arc::new(config),
            client: ThreatQClient::new(executor),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        self.client.executor().sessions()
    }

    /// Search ThreatQ for `entities`, one request per group of up to ten,
    /// all groups in flight at once. Any failed group fails the lookup.
    pub async fn do_lookup(
        &self,
        entities: &[Entity],
        options: &IntegrationOptions,
    ) -> Result<Vec<LookupResult>, IntegrationError> {
        if self.config.indicator_types.is_empty() {
            return Err(IntegrationError::MissingIndicatorTypes);
        }

        let grouped = group_entities(entities, MAX_ENTITIES_PER_LOOKUP);
        if grouped.is_empty() {
            return Ok(Vec::new());
        }

        let creds = options.credentials();
        let searches = grouped
            .groups
            .iter()
            .filter_map(|group| query::search_body(group, options, &self.config))
            .map(|body| self.client.search(&creds, body));
        let group_hits = try_join_all(searches).await?;

        let view = user_options_view(&self.config, options);
        let mut results = Vec::new();
        for indicator in group_hits.into_iter().flatten() {
            let Some(entity) = grouped.entity_for(&indicator.value) else {
                debug!(value = %indicator.value, "Search hit without a matching entity");
                continue;
            };
            if let Some(result) = build_lookup_result(entity, indicator, options, &view) {
                results.push(result);
            }
        }

        debug!(
            entities = entities.len(),
            results = results.len(),
            "Lookup complete"
        );
        Ok(results)
    }

    /// Fetch everything the expanded overlay shows for one indicator
    pub async fn on_details(
        &self,
        indicator_id: &Id,
        options: &IntegrationOptions,
    ) -> Result<DetailView, IntegrationError> {
        let creds = options.credentials();
        let (details, comments, current_user) = tokio::try_join!(
            self.client.indicator_details(&creds, indicator_id),
            self.client.comments(&creds, indicator_id),
            self.client.current_user_source_id(&creds),
        )?;

        let attributes = details
            .attributes
            .into_iter()
            .filter(|attr| self.config.is_attribute_configured(&attr.name))
            .collect();

        Ok(DetailView {
            current_user_source_id: current_user,
            description: details.description,
            watchlist: details.watchlist,
            adversaries: details.adversaries,
            attributes,
            tags: details.tags,
            indicators: details.indicators,
            comments: comments.comments,
            total_comments: comments.total_comments,
        })
    }

    /// Route a `{type, data}` message from the overlay to ThreatQ
    pub async fn on_message(
        &self,
        payload: Value,
        options: &IntegrationOptions,
    ) -> Result<Value, IntegrationError> {
        let action = Action::from_payload(payload)?;
        let name = action.name();

        let result = actions::route(&self.client, &self.config, options, action).await;
        if let Err(ref e) = result {
            error!(action = name, error = %e, "Action failed");
        }
        result
    }

    pub fn validate_options(&self, options: &IntegrationOptions) -> Vec<ValidationError> {
        options.validate()
    }
}
