use tracing::trace;

use crate::config::IntegrationConfig;
use crate::models::{Entity, Indicator, LookupData, LookupDetails, LookupResult, UserOptionsView};
use crate::options::IntegrationOptions;

/// Overlay settings attached to every result of one lookup
pub fn user_options_view(
    config: &IntegrationConfig,
    options: &IntegrationOptions,
) -> UserOptionsView {
    UserOptionsView {
        attribute_lookup: config.attribute_lookup(),
        statuses: config.statuses.clone(),
        url: options.url.clone(),
        allow_adding_tag: options.allow_adding_tag,
        allow_deleting_tags: options.allow_deleting_tags,
        allow_editing_status: options.allow_editing_status,
        allow_editing_score: options.allow_editing_score,
    }
}

/// Turn a search hit into a lookup result, or `None` when its status is not
/// one the user asked for. Indicators without a status id are always kept.
pub fn build_lookup_result(
    entity: &Entity,
    indicator: Indicator,
    options: &IntegrationOptions,
    view: &UserOptionsView,
) -> Option<LookupResult> {
    if let Some(status_id) = indicator.status_id() {
        if !options.allows_status(status_id) {
            trace!(value = %indicator.value, status_id = status_id, "Filtered by status");
            return None;
        }
    }

    let summary = vec![
        format!("Score: {}", indicator.score_display()),
        format!("Status: {}", indicator.status_name()),
    ];

    Some(LookupResult {
        entity: entity.clone(),
        data: LookupData {
            summary,
            details: LookupDetails {
                indicator,
                user_options: view.clone(),
            },
        },
    })
}
