//! Edit actions sent from the overlay component.
//!
//! Payloads arrive as `{ "type": "ADD_TAG", "data": { ... } }` and are routed
//! to the matching ThreatQ endpoint. Feature toggles in the user's options are
//! checked here as well as in the UI.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::api::{Credentials, ThreatQClient};
use crate::config::IntegrationConfig;
use crate::error::IntegrationError;
use crate::models::{AttributePage, Id};
use crate::options::IntegrationOptions;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    #[serde(rename_all = "camelCase")]
    CreateComment { id: Id, comment: String },
    #[serde(rename_all = "camelCase")]
    GetComments { id: Id },
    #[serde(rename_all = "camelCase")]
    DeleteComment { indicator_id: Id, comment_id: Id },
    #[serde(rename_all = "camelCase")]
    UpdateComment { indicator_comment_id: Id, value: String },
    #[serde(rename_all = "camelCase")]
    AddTag { indicator_id: Id, tag_name: String },
    #[serde(rename_all = "camelCase")]
    DeleteTag { indicator_id: Id, tag_id: Id },
    #[serde(rename_all = "camelCase")]
    AddToWatchlist { indicator_id: Id },
    #[serde(rename_all = "camelCase")]
    RemoveFromWatchlist { indicator_id: Id, watchlist_id: Id },
    #[serde(rename_all = "camelCase")]
    AddAttribute {
        indicator_id: Id,
        attribute_name: String,
        attribute_value: String,
    },
    #[serde(rename_all = "camelCase")]
    DeleteAttribute {
        indicator_id: Id,
        indicator_attribute_id: Id,
    },
    #[serde(rename_all = "camelCase")]
    GetAttributes { id: Id },
    #[serde(rename_all = "camelCase")]
    UpdateIndicatorAttribute {
        indicator_id: Id,
        indicator_attribute_id: Id,
        value: String,
    },
    #[serde(rename_all = "camelCase")]
    UpdateIndicator {
        indicator_id: Id,
        field_name: String,
        field_value: Value,
    },
    #[serde(rename_all = "camelCase")]
    UpdateScore { indicator_id: Id, score: Value },
    #[serde(rename_all = "camelCase")]
    UpdateStatus { indicator_id: Id, status_id: Value },
}

impl Action {
    /// Parse a raw host payload
    pub fn from_payload(payload: Value) -> Result<Self, IntegrationError> {
        serde_json::from_value(payload).map_err(IntegrationError::InvalidPayload)
    }

    /// Wire name of this action, for logging
    pub fn name(&self) -> &'static str {
        match self {
            Action::CreateComment { .. } => "CREATE_COMMENT",
            Action::GetComments { .. } => "GET_COMMENTS",
            Action::DeleteComment { .. } => "DELETE_COMMENT",
            Action::UpdateComment { .. } => "UPDATE_COMMENT",
            Action::AddTag { .. } => "ADD_TAG",
            Action::DeleteTag { .. } => "DELETE_TAG",
            Action::AddToWatchlist { .. } => "ADD_TO_WATCHLIST",
            Action::RemoveFromWatchlist { .. } => "REMOVE_FROM_WATCHLIST",
            Action::AddAttribute { .. } => "ADD_ATTRIBUTE",
            Action::DeleteAttribute { .. } => "DELETE_ATTRIBUTE",
            Action::GetAttributes { .. } => "GET_ATTRIBUTES",
            Action::UpdateIndicatorAttribute { .. } => "UPDATE_INDICATOR_ATTRIBUTE",
            Action::UpdateIndicator { .. } => "UPDATE_INDICATOR",
            Action::UpdateScore { .. } => "UPDATE_SCORE",
            Action::UpdateStatus { .. } => "UPDATE_STATUS",
        }
    }

    /// Rewrite `UPDATE_INDICATOR` into the specific score/status action
    fn normalize(self) -> Result<Self, IntegrationError> {
        match self {
            Action::UpdateIndicator {
                indicator_id,
                field_name,
                field_value,
            } => match field_name.as_str() {
                "score" => Ok(Action::UpdateScore {
                    indicator_id,
                    score: field_value,
                }),
                "status" => Ok(Action::UpdateStatus {
                    indicator_id,
                    status_id: field_value,
                }),
                _ => Err(IntegrationError::UnsupportedField(field_name)),
            },
            other => Ok(other),
        }
    }

    /// Fail when the user's options switch this kind of edit off
    fn check_enabled(&self, options: &IntegrationOptions) -> Result<(), IntegrationError> {
        let disabled = match self {
            Action::AddTag { .. } if !options.allow_adding_tag => Some("Adding tags"),
            Action::DeleteTag { .. } if !options.allow_deleting_tags => Some("Deleting tags"),
            Action::UpdateScore { .. } if !options.allow_editing_score => Some("Editing score"),
            Action::UpdateStatus { .. } if !options.allow_editing_status => Some("Editing status"),
            _ => None,
        };
        match disabled {
            Some(what) => Err(IntegrationError::ActionDisabled(what)),
            None => Ok(()),
        }
    }
}

/// Keep only attributes named in the integration config
pub fn configured_attributes(config: &IntegrationConfig, page: AttributePage) -> AttributePage {
    AttributePage {
        total_attributes: page.total_attributes,
        attributes: page
            .attributes
            .into_iter()
            .filter(|attr| config.is_attribute_configured(&attr.name))
            .collect(),
    }
}

/// Execute `action` against ThreatQ and return the JSON handed back to the overlay
pub async fn route(
    client: &ThreatQClient,
    config: &IntegrationConfig,
    options: &IntegrationOptions,
    action: Action,
) -> Result<Value, IntegrationError> {
    let action = action.normalize()?;
    action.check_enabled(options)?;
    debug!(action = action.name(), "Routing action");

    let creds: Credentials = options.credentials();
    let result = match action {
        Action::CreateComment { id, comment } => {
            client.create_comment(&creds, &id, &comment).await?
        }
        Action::GetComments { id } => {
            let page = client.comments(&creds, &id).await?;
            trace!(total = ?page.total_comments, "Fetched comments");
            serde_json::to_value(page)?
        }
        Action::DeleteComment {
            indicator_id,
            comment_id,
        } => {
            client
                .delete_comment(&creds, &indicator_id, &comment_id)
                .await?;
            Value::Object(Default::default())
        }
        Action::UpdateComment {
            indicator_comment_id,
            value,
        } => {
            client
                .update_comment(&creds, &indicator_comment_id, &value)
                .await?
        }
        Action::AddTag {
            indicator_id,
            tag_name,
        } => client.add_tag(&creds, &indicator_id, &tag_name).await?,
        Action::DeleteTag {
            indicator_id,
            tag_id,
        } => {
            client.delete_tag(&creds, &indicator_id, &tag_id).await?;
            Value::Object(Default::default())
        }
        Action::AddToWatchlist { indicator_id } => {
            client.add_to_watchlist(&creds, &indicator_id).await?
        }
        Action::RemoveFromWatchlist {
            indicator_id,
            watchlist_id,
        } => {
            client
                .remove_from_watchlist(&creds, &indicator_id, &watchlist_id)
                .await?;
            Value::Object(Default::default())
        }
        Action::AddAttribute {
            indicator_id,
            attribute_name,
            attribute_value,
        } => {
            client
                .add_attribute(&creds, &indicator_id, &attribute_name, &attribute_value)
                .await?
        }
        Action::DeleteAttribute {
            indicator_id,
            indicator_attribute_id,
        } => {
            client
                .delete_attribute(&creds, &indicator_id, &indicator_attribute_id)
                .await?;
            Value::Object(Default::default())
        }
        Action::GetAttributes { id } => {
            let page = client.attributes(&creds, &id).await?;
            serde_json::to_value(configured_attributes(config, page))?
        }
        Action::UpdateIndicatorAttribute {
            indicator_id,
            indicator_attribute_id,
            value,
        } => {
            client
                .update_attribute(&creds, &indicator_id, &indicator_attribute_id, &value)
                .await?
        }
        Action::UpdateScore {
            indicator_id,
            score,
        } => client.update_score(&creds, &indicator_id, score).await?,
        Action::UpdateStatus {
            indicator_id,
            status_id,
        } => client.update_status(&creds, &indicator_id, status_id).await?,
        // normalize() has already rewritten these
        Action::UpdateIndicator { field_name, .. } => {
            return Err(IntegrationError::UnsupportedField(field_name))
        }
    };

    Ok(result)
}
