//! Per-user integration options and their validation.
//!
//! The host hands these over on every lookup and message. Select boxes arrive
//! as `{ "value": "5", "display": "5 - Low" }` objects, so scores and status
//! ids accept that shape as well as plain numbers and numeric strings.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
#[cfg(feature = "ts")]
use ts_rs::TS;

use crate::api::Credentials;

/// Default minimum score ("5 - Low")
const DEFAULT_MINIMUM_SCORE: u32 = 5;

/// Default maximum score ("10 - Very High", which ThreatQ stores as 100)
const DEFAULT_MAXIMUM_SCORE: u32 = 100;

/// Maximum scores at or above this mean "no upper bound". ThreatQ scores can
/// exceed the 10 shown in its UI, so only 0-9 become a filter.
const UNBOUNDED_SCORE_THRESHOLD: u32 = 10;

/// Statuses searched by default: Active and Review
const DEFAULT_INDICATOR_STATUSES: [u32; 2] = [1, 4];

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IntegrationOptions {
    pub url: String,
    pub username: String,
    pub password: String,
    /// ThreatQ client id used for the password grant
    pub client: String,
    pub allow_adding_tag: bool,
    pub allow_deleting_tags: bool,
    pub allow_editing_status: bool,
    pub allow_editing_score: bool,
    #[serde(deserialize_with = "deserialize_select_u32")]
    pub minimum_score: u32,
    #[serde(deserialize_with = "deserialize_select_u32")]
    pub maximum_score: u32,
    #[serde(deserialize_with = "deserialize_select_u32_list")]
    pub indicator_statuses: Vec<u32>,
}

impl Default for IntegrationOptions {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: String::new(),
            password: String::new(),
            client: String::new(),
            allow_adding_tag: true,
            allow_deleting_tags: true,
            allow_editing_status: false,
            allow_editing_score: false,
            minimum_score: DEFAULT_MINIMUM_SCORE,
            maximum_score: DEFAULT_MAXIMUM_SCORE,
            indicator_statuses: DEFAULT_INDICATOR_STATUSES.to_vec(),
        }
    }
}

impl fmt::Debug for IntegrationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegrationOptions")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("client", &self.client)
            .field("minimum_score", &self.minimum_score)
            .field("maximum_score", &self.maximum_score)
            .field("indicator_statuses", &self.indicator_statuses)
            .finish_non_exhaustive()
    }
}

/// A single problem with the user's options, keyed by option name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct ValidationError {
    pub key: String,
    pub message: String,
}

impl ValidationError {
    fn new(key: &str, message: &str) -> Self {
        Self {
            key: key.to_string(),
            message: message.to_string(),
        }
    }
}

impl IntegrationOptions {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.url, &self.username, &self.password, &self.client)
    }

    /// Upper score filter, or `None` when the maximum means "unbounded"
    pub fn maximum_score_filter(&self) -> Option<u32> {
        (self.maximum_score < UNBOUNDED_SCORE_THRESHOLD).then_some(self.maximum_score)
    }

    pub fn allows_status(&self, status_id: u32) -> bool {
        self.indicator_statuses.contains(&status_id)
    }

    /// Collect every problem with these options. Never touches the network.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.url.trim().is_empty() {
            errors.push(ValidationError::new("url", "You must provide your TQ server URL"));
        }
        if self.minimum_score > self.maximum_score {
            errors.push(ValidationError::new(
                "minimumScore",
                "The Minimum Score must be less than or equal to the Maximum Score",
            ));
        }
        if self.username.trim().is_empty() {
            errors.push(ValidationError::new("username", "You must provide your TQ username"));
        }
        if self.password.trim().is_empty() {
            errors.push(ValidationError::new(
                "password",
                "You must provide your TQ username's password",
            ));
        }
        if self.client.trim().is_empty() {
            errors.push(ValidationError::new("client", "You must provide your TQ Client ID"));
        }

        errors
    }
}

// ============================================================================
// Select-box deserialization
// ============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum SelectValue {
    Number(u32),
    Text(String),
    Option { value: Box<SelectValue> },
}

impl SelectValue {
    fn into_u32(self) -> Result<u32, String> {
        match self {
            SelectValue::Number(n) => Ok(n),
            SelectValue::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| format!("expected a numeric value, got `{}`", s)),
            SelectValue::Option { value } => value.into_u32(),
        }
    }
}

fn deserialize_select_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    SelectValue::deserialize(deserializer)?
        .into_u32()
        .map_err(serde::de::Error::custom)
}

fn deserialize_select_u32_list<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<SelectValue>::deserialize(deserializer)?
        .into_iter()
        .map(|v| v.into_u32().map_err(serde::de::Error::custom))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_options() -> IntegrationOptions {
        IntegrationOptions {
            url: "https://tq.example.com".to_string(),
            username: "analyst@example.com".to_string(),
            password: "hunter2".to_string(),
            client: "client-id".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_options_have_no_errors() {
        assert!(valid_options().validate().is_empty());
    }

    #[test]
    fn test_min_above_max_is_single_error() {
        let options = IntegrationOptions {
            minimum_score: 9,
            maximum_score: 5,
            ..valid_options()
        };
        let errors = options.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].key, "minimumScore");
        assert!(errors[0].message.contains("Minimum Score"));
        assert!(errors[0].message.contains("Maximum Score"));
    }

    #[test]
    fn test_missing_fields_are_all_reported() {
        let errors = IntegrationOptions::default().validate();
        let keys: Vec<&str> = errors.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["url", "username", "password", "client"]);
    }

    #[test]
    fn test_blank_fields_are_missing() {
        let options = IntegrationOptions {
            url: " ".to_string(),
            username: "  ".to_string(),
            password: "\t".to_string(),
            client: " ".to_string(),
            ..Default::default()
        };
        let keys: Vec<String> = options.validate().into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["url", "username", "password", "client"]);
    }

    #[test]
    fn test_deserialize_host_option_shape() {
        let options: IntegrationOptions = serde_json::from_value(json!({
            "url": "https://tq.example.com",
            "username": "analyst@example.com",
            "password": "hunter2",
            "client": "abc",
            "allowEditingScore": true,
            "minimumScore": { "value": "3", "display": "3 - Very Low" },
            "maximumScore": { "value": "100", "display": "10 - Very High" },
            "indicatorStatuses": [
                { "display": "Active", "value": "1" },
                { "display": "Expired", "value": "2" }
            ]
        }))
        .expect("valid options");

        assert_eq!(options.minimum_score, 3);
        assert_eq!(options.maximum_score, 100);
        assert_eq!(options.indicator_statuses, vec![1, 2]);
        assert!(options.allow_editing_score);
        // Untouched toggles keep their defaults
        assert!(options.allow_adding_tag);
        assert!(!options.allow_editing_status);
    }

    #[test]
    fn test_deserialize_plain_numbers() {
        let options: IntegrationOptions = serde_json::from_value(json!({
            "minimumScore": 2,
            "maximumScore": "8",
            "indicatorStatuses": [4]
        }))
        .expect("valid options");
        assert_eq!(options.minimum_score, 2);
        assert_eq!(options.maximum_score, 8);
        assert_eq!(options.indicator_statuses, vec![4]);
    }

    #[test]
    fn test_deserialize_rejects_non_numeric_score() {
        let result: Result<IntegrationOptions, _> =
            serde_json::from_value(json!({ "minimumScore": { "value": "high" } }));
        assert!(result.is_err());
    }

    #[test]
    fn test_maximum_score_filter() {
        let unbounded = IntegrationOptions::default();
        assert_eq!(unbounded.maximum_score_filter(), None);

        let bounded = IntegrationOptions {
            maximum_score: 7,
            ..Default::default()
        };
        assert_eq!(bounded.maximum_score_filter(), Some(7));
    }

    #[test]
    fn test_debug_redacts_password() {
        assert!(!format!("{:?}", valid_options()).contains("hunter2"));
    }
}
