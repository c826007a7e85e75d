use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};
#[cfg(feature = "ts")]
use ts_rs::TS;

/// Indicator kinds this integration can search for.
///
/// Resolved once when an entity is ingested; the lowercase serde name doubles
/// as the key into the configured ThreatQ indicator type ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Ipv4,
    Ipv6,
    Ipv4Cidr,
    Domain,
    Url,
    Md5,
    Sha1,
    Sha256,
    Email,
}

impl EntityType {
    pub fn config_key(&self) -> &'static str {
        match self {
            EntityType::Ipv4 => "ipv4",
            EntityType::Ipv6 => "ipv6",
            EntityType::Ipv4Cidr => "ipv4cidr",
            EntityType::Domain => "domain",
            EntityType::Url => "url",
            EntityType::Md5 => "md5",
            EntityType::Sha1 => "sha1",
            EntityType::Sha256 => "sha256",
            EntityType::Email => "email",
        }
    }

    /// Entity type name as the host reports it
    pub fn host_type(&self) -> &'static str {
        match self {
            EntityType::Ipv4 => "IPv4",
            EntityType::Ipv6 => "IPv6",
            EntityType::Ipv4Cidr => "IPv4CIDR",
            EntityType::Domain => "domain",
            EntityType::Url => "url",
            EntityType::Md5 | EntityType::Sha1 | EntityType::Sha256 => "hash",
            EntityType::Email => "email",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}

/// A value to look up, with its type already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "HostEntity", into = "HostEntity")]
pub struct Entity {
    pub value: String,
    pub entity_type: EntityType,
    pub is_private_ip: bool,
}

impl Entity {
    pub fn new(value: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            value: value.into(),
            entity_type,
            is_private_ip: false,
        }
    }

    pub fn private(mut self, is_private_ip: bool) -> Self {
        self.is_private_ip = is_private_ip;
        self
    }

    /// Resolve the type and private-address flag of a raw string
    pub fn classify(value: &str) -> Option<Self> {
        let value = value.trim();
        let entity_type = classify_value(value)?;
        let is_private_ip = match entity_type {
            EntityType::Ipv4 => value.parse::<Ipv4Addr>().map(is_private_v4).unwrap_or(false),
            EntityType::Ipv6 => value.parse::<Ipv6Addr>().map(is_private_v6).unwrap_or(false),
            _ => false,
        };
        Some(Self {
            value: value.to_string(),
            entity_type,
            is_private_ip,
        })
    }

    /// True when this entity claims to be IPv6 but does not parse as one
    pub fn is_invalid_ipv6(&self) -> bool {
        self.entity_type == EntityType::Ipv6 && self.value.parse::<Ipv6Addr>().is_err()
    }
}

fn is_private_v4(ip: Ipv4Addr) -> bool {
    ip.is_private() || ip.is_loopback() || ip.is_link_local()
}

fn is_private_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    // fc00::/7 unique local, fe80::/10 link local
    ip.is_loopback() || (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
}

fn classify_value(value: &str) -> Option<EntityType> {
    if value.is_empty() {
        return None;
    }

    let lower = value.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Some(EntityType::Url);
    }
    if let Some((ip, prefix)) = value.split_once('/') {
        let is_cidr = ip.parse::<Ipv4Addr>().is_ok()
            && prefix.parse::<u8>().map(|p| p <= 32).unwrap_or(false);
        return is_cidr.then_some(EntityType::Ipv4Cidr);
    }
    if value.parse::<Ipv4Addr>().is_ok() {
        return Some(EntityType::Ipv4);
    }
    if value.parse::<Ipv6Addr>().is_ok() {
        return Some(EntityType::Ipv6);
    }
    if value.chars().all(|c| c.is_ascii_hexdigit()) {
        return match value.len() {
            32 => Some(EntityType::Md5),
            40 => Some(EntityType::Sha1),
            64 => Some(EntityType::Sha256),
            _ => None,
        };
    }
    if let Some((local, domain)) = value.split_once('@') {
        return (!local.is_empty() && is_domain(domain)).then_some(EntityType::Email);
    }
    is_domain(value).then_some(EntityType::Domain)
}

fn is_domain(value: &str) -> bool {
    let labels: Vec<&str> = value.trim_end_matches('.').split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let valid_labels = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    let tld_alpha = labels
        .last()
        .map(|tld| tld.chars().all(|c| c.is_ascii_alphabetic()))
        .unwrap_or(false);
    valid_labels && tld_alpha
}

// ============================================================================
// Host wire format
// ============================================================================

/// Entity as the host sends it: a value plus one boolean per type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostEntity {
    pub value: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "isIPv4", default)]
    pub is_ipv4: bool,
    #[serde(rename = "isIPv6", default)]
    pub is_ipv6: bool,
    #[serde(default)]
    pub is_domain: bool,
    #[serde(rename = "isURL", default)]
    pub is_url: bool,
    #[serde(rename = "isMD5", default)]
    pub is_md5: bool,
    #[serde(rename = "isSHA1", default)]
    pub is_sha1: bool,
    #[serde(rename = "isSHA256", default)]
    pub is_sha256: bool,
    #[serde(default)]
    pub is_email: bool,
    #[serde(rename = "isPrivateIP", default)]
    pub is_private_ip: bool,
}

impl HostEntity {
    fn flagged_type(&self) -> Option<EntityType> {
        if self.is_ipv4 {
            Some(EntityType::Ipv4)
        } else if self.is_ipv6 {
            Some(EntityType::Ipv6)
        } else if self.kind.as_deref() == Some("IPv4CIDR") {
            Some(EntityType::Ipv4Cidr)
        } else if self.is_domain {
            Some(EntityType::Domain)
        } else if self.is_url {
            Some(EntityType::Url)
        } else if self.is_sha1 {
            Some(EntityType::Sha1)
        } else if self.is_sha256 {
            Some(EntityType::Sha256)
        } else if self.is_md5 {
            Some(EntityType::Md5)
        } else if self.is_email {
            Some(EntityType::Email)
        } else {
            None
        }
    }
}

impl TryFrom<HostEntity> for Entity {
    type Error = String;

    fn try_from(host: HostEntity) -> Result<Self, Self::Error> {
        let entity_type = host
            .flagged_type()
            .or_else(|| classify_value(host.value.trim()))
            .ok_or_else(|| format!("unsupported entity type for value `{}`", host.value))?;

        Ok(Self {
            value: host.value,
            entity_type,
            is_private_ip: host.is_private_ip,
        })
    }
}

impl From<Entity> for HostEntity {
    fn from(entity: Entity) -> Self {
        let t = entity.entity_type;
        Self {
            kind: Some(t.host_type().to_string()),
            is_ipv4: t == EntityType::Ipv4,
            is_ipv6: t == EntityType::Ipv6,
            is_domain: t == EntityType::Domain,
            is_url: t == EntityType::Url,
            is_md5: t == EntityType::Md5,
            is_sha1: t == EntityType::Sha1,
            is_sha256: t == EntityType::Sha256,
            is_email: t == EntityType::Email,
            is_private_ip: entity.is_private_ip,
            value: entity.value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_ips() {
        let ip = Entity::classify("8.8.8.8").expect("ipv4");
        assert_eq!(ip.entity_type, EntityType::Ipv4);
        assert!(!ip.is_private_ip);

        let private = Entity::classify("192.168.1.20").expect("ipv4");
        assert!(private.is_private_ip);

        let v6 = Entity::classify("2001:4860:4860::8888").expect("ipv6");
        assert_eq!(v6.entity_type, EntityType::Ipv6);
        assert!(!v6.is_private_ip);

        let ula = Entity::classify("fd12:3456::1").expect("ipv6");
        assert!(ula.is_private_ip);

        let cidr = Entity::classify("10.0.0.0/8").expect("cidr");
        assert_eq!(cidr.entity_type, EntityType::Ipv4Cidr);
    }

    #[test]
    fn test_classify_hashes() {
        assert_eq!(
            Entity::classify("d41d8cd98f00b204e9800998ecf8427e").map(|e| e.entity_type),
            Some(EntityType::Md5)
        );
        assert_eq!(
            Entity::classify("da39a3ee5e6b4b0d3255bfef95601890afd80709").map(|e| e.entity_type),
            Some(EntityType::Sha1)
        );
        assert_eq!(
            Entity::classify("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
                .map(|e| e.entity_type),
            Some(EntityType::Sha256)
        );
    }

    #[test]
    fn test_classify_names() {
        assert_eq!(
            Entity::classify("evil.example.com").map(|e| e.entity_type),
            Some(EntityType::Domain)
        );
        assert_eq!(
            Entity::classify("phish@evil.example.com").map(|e| e.entity_type),
            Some(EntityType::Email)
        );
        assert_eq!(
            Entity::classify("https://evil.example.com/payload").map(|e| e.entity_type),
            Some(EntityType::Url)
        );
    }

    #[test]
    fn test_classify_rejects_garbage() {
        assert!(Entity::classify("").is_none());
        assert!(Entity::classify("localhost").is_none());
        assert!(Entity::classify("10.0.0.0/40").is_none());
        assert!(Entity::classify("abc123").is_none());
    }

    #[test]
    fn test_deserialize_host_entity_flags() {
        let entity: Entity = serde_json::from_value(json!({
            "value": "10.1.1.1",
            "type": "IPv4",
            "isIPv4": true,
            "isPrivateIP": true
        }))
        .expect("valid entity");
        assert_eq!(entity.entity_type, EntityType::Ipv4);
        assert!(entity.is_private_ip);
    }

    #[test]
    fn test_deserialize_prefers_flags_over_value() {
        // Host says IPv6 even though the value is garbage; flag wins so the
        // stricter validity check can drop it later.
        let entity: Entity = serde_json::from_value(json!({
            "value": "not:an:address:::",
            "isIPv6": true
        }))
        .expect("valid entity");
        assert_eq!(entity.entity_type, EntityType::Ipv6);
        assert!(entity.is_invalid_ipv6());
    }

    #[test]
    fn test_deserialize_cidr_from_type_name() {
        let entity: Entity = serde_json::from_value(json!({
            "value": "192.0.2.0/24",
            "type": "IPv4CIDR"
        }))
        .expect("valid entity");
        assert_eq!(entity.entity_type, EntityType::Ipv4Cidr);
    }

    #[test]
    fn test_deserialize_unknown_entity_fails() {
        let result: Result<Entity, _> = serde_json::from_value(json!({ "value": "???" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_back_to_host_shape() {
        let entity = Entity::new("d41d8cd98f00b204e9800998ecf8427e", EntityType::Md5);
        let value = serde_json::to_value(&entity).expect("serializable");
        assert_eq!(value["type"], "hash");
        assert_eq!(value["isMD5"], true);
        assert_eq!(value["isIPv4"], false);
    }
}
