use std::collections::HashMap;

use tracing::{debug, trace};

use crate::models::Entity;

/// Maximum number of entities sent in one advanced search request.
pub const MAX_ENTITIES_PER_LOOKUP: usize = 10;

/// Degenerate addresses that are never worth asking the server about.
const IGNORED_IPS: [&str; 3] = ["127.0.0.1", "255.255.255.255", "0.0.0.0"];

/// Entities split into search-sized batches, plus a way back from result
/// values to the entities that produced them.
#[derive(Debug, Clone, Default)]
pub struct EntityGroups {
    pub groups: Vec<Vec<Entity>>,
    /// Keyed by lowercased value; the API echoes values in its own casing
    pub lookup: HashMap<String, Entity>,
}

impl EntityGroups {
    /// Find the entity a search result belongs to
    pub fn entity_for(&self, value: &str) -> Option<&Entity> {
        self.lookup.get(&value.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

fn is_ignored(entity: &Entity) -> bool {
    entity.is_private_ip || IGNORED_IPS.contains(&entity.value.as_str()) || entity.is_invalid_ipv6()
}

/// Split `entities` into groups of at most `max_per_group`, keeping input
/// order and skipping private, ignored, and malformed IPv6 entities.
pub fn group_entities(entities: &[Entity], max_per_group: usize) -> EntityGroups {
    let max_per_group = max_per_group.max(1);
    let mut result = EntityGroups::default();
    let mut current: Vec<Entity> = Vec::with_capacity(max_per_group);

    for entity in entities {
        if is_ignored(entity) {
            trace!(value = %entity.value, "Skipping non-actionable entity");
            continue;
        }

        current.push(entity.clone());
        result
            .lookup
            .insert(entity.value.to_lowercase(), entity.clone());

        if current.len() == max_per_group {
            result.groups.push(std::mem::take(&mut current));
        }
    }

    // Trailing partial group
    if !current.is_empty() {
        result.groups.push(current);
    }

    debug!(
        entities = entities.len(),
        groups = result.groups.len(),
        "Grouped entities for lookup"
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityType;

    fn ipv4(value: &str) -> Entity {
        Entity::new(value, EntityType::Ipv4)
    }

    #[test]
    fn test_filters_loopback_and_invalid_ipv6() {
        let entities = vec![
            ipv4("127.0.0.1"),
            ipv4("8.8.8.8"),
            Entity::new("2001:db8:::zz", EntityType::Ipv6),
        ];

        let grouped = group_entities(&entities, MAX_ENTITIES_PER_LOOKUP);
        assert_eq!(grouped.groups.len(), 1);
        assert_eq!(grouped.groups[0], vec![ipv4("8.8.8.8")]);
        assert_eq!(grouped.lookup.len(), 1);
    }

    #[test]
    fn test_filters_private_and_degenerate_addresses() {
        let entities = vec![
            ipv4("10.0.0.4").private(true),
            ipv4("255.255.255.255"),
            ipv4("0.0.0.0"),
        ];
        let grouped = group_entities(&entities, MAX_ENTITIES_PER_LOOKUP);
        assert!(grouped.is_empty());
        assert!(grouped.lookup.is_empty());
    }

    #[test]
    fn test_keeps_valid_ipv6() {
        let entities = vec![Entity::new("2001:4860:4860::8888", EntityType::Ipv6)];
        let grouped = group_entities(&entities, MAX_ENTITIES_PER_LOOKUP);
        assert_eq!(grouped.groups.len(), 1);
    }

    #[test]
    fn test_splits_into_bounded_groups_in_order() {
        let entities: Vec<Entity> = (1..=23).map(|i| ipv4(&format!("1.1.1.{}", i))).collect();

        let grouped = group_entities(&entities, 10);
        let sizes: Vec<usize> = grouped.groups.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![10, 10, 3]);

        let flattened: Vec<&Entity> = grouped.groups.iter().flatten().collect();
        let original: Vec<&Entity> = entities.iter().collect();
        assert_eq!(flattened, original);
    }

    #[test]
    fn test_exact_multiple_has_no_empty_group() {
        let entities: Vec<Entity> = (1..=20).map(|i| ipv4(&format!("1.1.1.{}", i))).collect();
        let grouped = group_entities(&entities, 10);
        assert_eq!(grouped.groups.len(), 2);
        assert!(grouped.groups.iter().all(|g| !g.is_empty()));
    }

    #[test]
    fn test_empty_input() {
        let grouped = group_entities(&[], MAX_ENTITIES_PER_LOOKUP);
        assert!(grouped.is_empty());
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let entities = vec![Entity::new("Evil.Example.COM", EntityType::Domain)];
        let grouped = group_entities(&entities, MAX_ENTITIES_PER_LOOKUP);

        let found = grouped.entity_for("evil.example.com").expect("entity found");
        assert_eq!(found.value, "Evil.Example.COM");
        assert!(grouped.entity_for("EVIL.EXAMPLE.COM").is_some());
    }
}
