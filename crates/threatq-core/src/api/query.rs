use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::IntegrationConfig;
use crate::models::Entity;
use crate::options::IntegrationOptions;

/// One condition of an advanced search clause
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchFilter {
    pub field: &'static str,
    pub operator: &'static str,
    pub value: Value,
}

impl SearchFilter {
    fn new(field: &'static str, operator: &'static str, value: impl Into<Value>) -> Self {
        Self {
            field,
            operator,
            value: value.into(),
        }
    }
}

/// Filters for a single entity: value, type and score bounds all ANDed.
/// Returns `None` when no ThreatQ type id is configured for the entity's kind.
pub fn entity_filters(
    entity: &Entity,
    options: &IntegrationOptions,
    config: &IntegrationConfig,
) -> Option<Vec<SearchFilter>> {
    let Some(type_id) = config.type_id(entity.entity_type) else {
        debug!(
            value = %entity.value,
            entity_type = %entity.entity_type,
            "No ThreatQ indicator type configured, leaving entity out of search"
        );
        return None;
    };

    let mut filters = vec![
        SearchFilter::new("indicator_value", "is", entity.value.as_str()),
        SearchFilter::new("indicator_type", "is", type_id),
        SearchFilter::new(
            "indicator_score",
            "greater than or equal to",
            options.minimum_score,
        ),
    ];

    if let Some(max) = options.maximum_score_filter() {
        filters.push(SearchFilter::new(
            "indicator_score",
            "less than or equal to",
            max,
        ));
    }

    Some(filters)
}

/// Body for `POST /api/search/advanced`: one clause list per entity, ORed.
/// `None` when no entity in the group has a configured indicator type.
pub fn search_body(
    entities: &[Entity],
    options: &IntegrationOptions,
    config: &IntegrationConfig,
) -> Option<Value> {
    let indicators: Vec<Vec<SearchFilter>> = entities
        .iter()
        .filter_map(|entity| entity_filters(entity, options, config))
        .collect();

    if indicators.is_empty() {
        return None;
    }
    Some(json!({ "indicators": indicators }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityType;

    fn config() -> IntegrationConfig {
        let mut config = IntegrationConfig::default();
        config.indicator_types.insert(EntityType::Ipv4, 11);
        config.indicator_types.insert(EntityType::Domain, 8);
        config
    }

    #[test]
    fn test_filters_without_upper_bound() {
        let options = IntegrationOptions::default();
        let entity = Entity::new("8.8.8.8", EntityType::Ipv4);

        let filters = entity_filters(&entity, &options, &config()).expect("type configured");
        assert_eq!(filters.len(), 3);
        assert_eq!(filters[0], SearchFilter::new("indicator_value", "is", "8.8.8.8"));
        assert_eq!(filters[1], SearchFilter::new("indicator_type", "is", 11));
        assert_eq!(
            filters[2],
            SearchFilter::new("indicator_score", "greater than or equal to", 5)
        );
    }

    #[test]
    fn test_filters_with_upper_bound() {
        let options = IntegrationOptions {
            minimum_score: 2,
            maximum_score: 8,
            ..Default::default()
        };
        let entity = Entity::new("evil.com", EntityType::Domain);

        let filters = entity_filters(&entity, &options, &config()).expect("type configured");
        assert_eq!(filters.len(), 4);
        assert_eq!(
            filters[3],
            SearchFilter::new("indicator_score", "less than or equal to", 8)
        );
    }

    #[test]
    fn test_unconfigured_type_is_skipped() {
        let entities = vec![
            Entity::new("8.8.8.8", EntityType::Ipv4),
            Entity::new("d41d8cd98f00b204e9800998ecf8427e", EntityType::Md5),
        ];
        let body = search_body(&entities, &IntegrationOptions::default(), &config())
            .expect("one entity is searchable");
        let clauses = body["indicators"].as_array().expect("array");
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0][0]["value"], "8.8.8.8");
        assert_eq!(clauses[0][1]["field"], "indicator_type");
    }

    #[test]
    fn test_group_without_searchable_entities() {
        let entities = vec![Entity::new("a@b.com", EntityType::Email)];
        assert!(search_body(&entities, &IntegrationOptions::default(), &config()).is_none());
    }
}
