use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::{AttributeConfig, StatusOption};

use super::{Entity, Indicator};

/// One matched entity, in the shape the host renders.
#[derive(Debug, Clone, Serialize)]
pub struct LookupResult {
    pub entity: Entity,
    pub data: LookupData,
}

#[derive(Debug, Clone, Serialize)]
pub struct LookupData {
    pub summary: Vec<String>,
    pub details: LookupDetails,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupDetails {
    #[serde(flatten)]
    pub indicator: Indicator,
    pub user_options: UserOptionsView,
}

/// Settings the overlay component needs to decide which edits to offer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOptionsView {
    #[serde(rename = "_threatQAttributeLookup")]
    pub attribute_lookup: BTreeMap<String, AttributeConfig>,
    #[serde(rename = "_threatQStatuses")]
    pub statuses: Vec<StatusOption>,
    pub url: String,
    pub allow_adding_tag: bool,
    pub allow_deleting_tags: bool,
    pub allow_editing_status: bool,
    pub allow_editing_score: bool,
}
