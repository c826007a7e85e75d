// Allow dead code: API response structs have fields for completeness
#![allow(dead_code)]

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// ThreatQ object id. The API and the overlay component send these as either
/// numbers or strings, so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Number(u64),
    Text(String),
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Number(n) => write!(f, "{}", n),
            Id::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for Id {
    fn from(n: u64) -> Self {
        Id::Number(n)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::Text(s.to_string())
    }
}

/// Standard `{ "data": ..., "total": ... }` response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorStatus {
    #[serde(default, deserialize_with = "deserialize_status_id")]
    pub id: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Status ids come back as numbers or numeric strings depending on the
/// ThreatQ version. Anything else is treated as no status id.
fn deserialize_status_id<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawStatusId {
        Number(u32),
        Text(String),
        Other(Value),
    }

    Ok(match Option::<RawStatusId>::deserialize(deserializer)? {
        Some(RawStatusId::Number(n)) => Some(n),
        Some(RawStatusId::Text(s)) => s.trim().parse().ok(),
        Some(RawStatusId::Other(_)) | None => None,
    })
}

/// One hit from the advanced search endpoint.
///
/// Only the fields this crate reads are typed; everything else is kept so it
/// can be handed to the overlay component unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Indicator {
    pub id: Id,
    pub value: String,
    #[serde(default)]
    pub score: Option<Value>,
    #[serde(default)]
    pub status: Option<IndicatorStatus>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Indicator {
    pub fn status_id(&self) -> Option<u32> {
        self.status.as_ref().and_then(|s| s.id)
    }

    pub fn status_name(&self) -> &str {
        self.status
            .as_ref()
            .and_then(|s| s.name.as_deref())
            .unwrap_or("Unknown")
    }

    /// Score rendered without JSON quoting (the API sends numbers or strings)
    pub fn score_display(&self) -> String {
        match self.score {
            Some(Value::String(ref s)) => s.clone(),
            Some(Value::Null) | None => "N/A".to_string(),
            Some(ref other) => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorAttribute {
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `GET /api/indicators/{id}` with related resources
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndicatorDetails {
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub watchlist: Vec<Value>,
    #[serde(default)]
    pub adversaries: Vec<Value>,
    #[serde(default)]
    pub attributes: Vec<IndicatorAttribute>,
    #[serde(default)]
    pub tags: Vec<Value>,
    #[serde(default)]
    pub indicators: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPage {
    pub total_comments: Option<u64>,
    pub comments: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributePage {
    pub total_attributes: Option<u64>,
    pub attributes: Vec<IndicatorAttribute>,
}

/// Everything the overlay needs when a result is expanded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailView {
    pub current_user_source_id: Value,
    pub description: Option<Value>,
    pub watchlist: Vec<Value>,
    pub adversaries: Vec<Value>,
    pub attributes: Vec<IndicatorAttribute>,
    pub tags: Vec<Value>,
    pub indicators: Vec<Value>,
    pub comments: Vec<Value>,
    pub total_comments: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_search_result() {
        let json = json!({
            "id": 42,
            "value": "8.8.8.8",
            "score": 7,
            "status": { "id": 1, "name": "Active" },
            "type": { "id": 11, "name": "IP Address" }
        });

        let indicator: Indicator = serde_json::from_value(json).expect("valid indicator");
        assert_eq!(indicator.id, Id::Number(42));
        assert_eq!(indicator.status_id(), Some(1));
        assert_eq!(indicator.status_name(), "Active");
        assert_eq!(indicator.score_display(), "7");
        assert!(indicator.extra.contains_key("type"));
    }

    #[test]
    fn test_indicator_without_status() {
        let indicator: Indicator =
            serde_json::from_value(json!({ "id": "9", "value": "evil.com", "score": "3" }))
                .expect("valid indicator");
        assert_eq!(indicator.status_id(), None);
        assert_eq!(indicator.status_name(), "Unknown");
        assert_eq!(indicator.score_display(), "3");
    }

    #[test]
    fn test_string_status_id() {
        let indicator: Indicator = serde_json::from_value(json!({
            "id": 3,
            "value": "1.2.3.4",
            "status": { "id": "4", "name": "Review" }
        }))
        .expect("string status id");
        assert_eq!(indicator.status_id(), Some(4));

        let odd: Indicator = serde_json::from_value(json!({
            "id": 4,
            "value": "5.6.7.8",
            "status": { "id": "n/a", "name": "Custom" }
        }))
        .expect("non-numeric status id");
        assert_eq!(odd.status_id(), None);
        assert_eq!(odd.status_name(), "Custom");
    }

    #[test]
    fn test_indicator_round_trips_extra_fields() {
        let json = json!({ "id": 1, "value": "x.com", "class": "network" });
        let indicator: Indicator = serde_json::from_value(json).expect("valid indicator");
        let back = serde_json::to_value(&indicator).expect("serializable");
        assert_eq!(back["class"], "network");
    }

    #[test]
    fn test_id_display() {
        assert_eq!(Id::from(17).to_string(), "17");
        assert_eq!(Id::from("abc").to_string(), "abc");
    }

    #[test]
    fn test_details_defaults_missing_collections() {
        let details: IndicatorDetails =
            serde_json::from_value(json!({ "description": "bad host" })).expect("valid details");
        assert!(details.tags.is_empty());
        assert!(details.attributes.is_empty());
        assert_eq!(details.description, Some(json!("bad host")));
    }
}
