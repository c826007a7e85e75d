//! Static integration configuration.
//!
//! This module handles loading the administrator-maintained settings that do
//! not change per user: the ThreatQ indicator type ids for each entity kind,
//! the attributes to display, the known indicator statuses, and TLS/proxy
//! options for the HTTP transport.
//!
//! Configuration is stored at `~/.config/threatq-lookup/config.json` unless a
//! path is given explicitly.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::{Certificate, Client, Identity, Proxy};
use serde::{Deserialize, Serialize};
#[cfg(feature = "ts")]
use ts_rs::TS;

use crate::models::EntityType;

/// Application name used for the config directory path
const APP_NAME: &str = "threatq-lookup";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// An attribute the overlay should display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct AttributeConfig {
    /// Must match the ThreatQ attribute name exactly (case-sensitive)
    pub name: String,
    #[serde(default)]
    pub editable: bool,
    /// Allowed values; empty means free-form input
    #[serde(default)]
    pub values: Vec<String>,
}

/// An indicator status as presented in select boxes: `{display, value}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct StatusOption {
    pub display: String,
    pub value: String,
}

impl StatusOption {
    pub fn new(display: &str, id: u32) -> Self {
        Self {
            display: display.to_string(),
            value: id.to_string(),
        }
    }
}

/// Default ThreatQ statuses. Installations with custom statuses override these.
pub fn default_statuses() -> Vec<StatusOption> {
    vec![
        StatusOption::new("Active", 1),
        StatusOption::new("Expired", 2),
        StatusOption::new("Indirect", 3),
        StatusOption::new("Review", 4),
        StatusOption::new("Whitelisted", 5),
    ]
}

/// Transport options. Empty strings are treated the same as missing values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// PEM bundle of extra trusted CAs
    pub ca: Option<PathBuf>,
    /// PEM client certificate
    pub cert: Option<PathBuf>,
    /// PEM private key for `cert`
    pub key: Option<PathBuf>,
    pub passphrase: Option<String>,
    pub proxy: Option<String>,
    pub reject_unauthorized: Option<bool>,
}

fn non_empty_path(path: &Option<PathBuf>) -> Option<&Path> {
    path.as_deref().filter(|p| !p.as_os_str().is_empty())
}

fn non_empty_str(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl RequestConfig {
    /// Build the shared HTTP client with these TLS and proxy settings
    pub fn build_client(&self) -> Result<Client> {
        let mut builder = Client::builder().timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS));

        if let Some(ca) = non_empty_path(&self.ca) {
            let pem = std::fs::read(ca)
                .with_context(|| format!("Failed to read CA file {}", ca.display()))?;
            let cert = Certificate::from_pem(&pem).context("Failed to parse CA certificate")?;
            builder = builder.add_root_certificate(cert);
        }

        match (non_empty_path(&self.cert), non_empty_path(&self.key)) {
            (Some(cert), Some(key)) => {
                if non_empty_str(&self.passphrase).is_some() {
                    bail!("Encrypted client keys are not supported; provide an unencrypted PEM key");
                }
                let mut pem = std::fs::read(cert)
                    .with_context(|| format!("Failed to read client cert {}", cert.display()))?;
                pem.push(b'\n');
                pem.extend(
                    std::fs::read(key)
                        .with_context(|| format!("Failed to read client key {}", key.display()))?,
                );
                let identity =
                    Identity::from_pem(&pem).context("Failed to parse client certificate/key")?;
                builder = builder.identity(identity);
            }
            (None, None) => {}
            _ => bail!("Both `cert` and `key` must be set to use a client certificate"),
        }

        if let Some(proxy) = non_empty_str(&self.proxy) {
            builder = builder.proxy(Proxy::all(proxy).context("Invalid proxy URL")?);
        }

        if self.reject_unauthorized == Some(false) {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder.build().context("Failed to build HTTP client")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationConfig {
    /// ThreatQ indicator type id per entity kind; ids differ between installations
    pub indicator_types: HashMap<EntityType, u32>,
    pub attributes: Vec<AttributeConfig>,
    pub statuses: Vec<StatusOption>,
    pub request: RequestConfig,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            indicator_types: HashMap::new(),
            attributes: Vec::new(),
            statuses: default_statuses(),
            request: RequestConfig::default(),
        }
    }
}

impl IntegrationConfig {
    /// Load from `path`, or the default location. A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn type_id(&self, entity_type: EntityType) -> Option<u32> {
        self.indicator_types.get(&entity_type).copied()
    }

    /// Configured attributes keyed by name, as handed to the overlay
    pub fn attribute_lookup(&self) -> BTreeMap<String, AttributeConfig> {
        self.attributes
            .iter()
            .map(|attr| (attr.name.clone(), attr.clone()))
            .collect()
    }

    pub fn is_attribute_configured(&self, name: &str) -> bool {
        self.attributes.iter().any(|attr| attr.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "indicator_types": { "ipv4": 11, "email": 3, "domain": 8, "sha256": 17 },
            "attributes": [
                { "name": "Confidence", "editable": true },
                { "name": "False Positive", "editable": true, "values": ["true", "false"] }
            ]
        }"#;

        let config: IntegrationConfig = serde_json::from_str(json).expect("valid config");
        assert_eq!(config.type_id(EntityType::Ipv4), Some(11));
        assert_eq!(config.type_id(EntityType::Sha256), Some(17));
        assert_eq!(config.type_id(EntityType::Md5), None);
        assert!(config.is_attribute_configured("Confidence"));
        assert!(!config.is_attribute_configured("confidence"));
        assert_eq!(config.attribute_lookup()["False Positive"].values.len(), 2);
        // Missing sections fall back to defaults
        assert_eq!(config.statuses.len(), 5);
    }

    #[test]
    fn test_default_statuses() {
        let statuses = default_statuses();
        assert_eq!(statuses[0], StatusOption::new("Active", 1));
        assert_eq!(statuses[3].display, "Review");
        assert_eq!(statuses[3].value, "4");
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("threatq-lookup-does-not-exist.json");
        let config = IntegrationConfig::load(Some(&path)).expect("defaults");
        assert!(config.indicator_types.is_empty());
        assert!(config.attributes.is_empty());
    }

    #[test]
    fn test_build_default_client() {
        assert!(RequestConfig::default().build_client().is_ok());
    }

    #[test]
    fn test_empty_strings_are_ignored() {
        let request: RequestConfig = serde_json::from_str(
            r#"{ "ca": "", "cert": "", "key": "", "passphrase": "", "proxy": "" }"#,
        )
        .expect("valid request config");
        assert!(request.build_client().is_ok());
    }

    #[test]
    fn test_cert_without_key_is_rejected() {
        let request = RequestConfig {
            cert: Some(PathBuf::from("/tmp/client.pem")),
            ..Default::default()
        };
        assert!(request.build_client().is_err());
    }
}
