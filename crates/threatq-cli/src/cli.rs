//! Command-line arguments.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use threatq_core::IntegrationOptions;

#[derive(Parser)]
#[command(name = "threatq")]
#[command(version)]
#[command(about = "Look up and annotate indicators in a ThreatQ instance", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Integration config file (indicator types, attributes, TLS)
    #[arg(short, long, global = true, env = "THREATQ_CONFIG")]
    pub config: Option<PathBuf>,

    /// ThreatQ server URL
    #[arg(long, global = true, env = "THREATQ_URL")]
    pub url: Option<String>,

    #[arg(short, long, global = true, env = "THREATQ_USERNAME")]
    pub username: Option<String>,

    /// Prompted for when not set
    #[arg(long, global = true, env = "THREATQ_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// ThreatQ OAuth client id
    #[arg(long, global = true, env = "THREATQ_CLIENT_ID")]
    pub client_id: Option<String>,

    #[arg(long, global = true)]
    pub min_score: Option<u32>,

    /// 10 or more means no upper bound
    #[arg(long, global = true)]
    pub max_score: Option<u32>,

    /// Indicator status id to include in lookups (repeatable)
    #[arg(long = "status", global = true)]
    pub statuses: Vec<u32>,

    #[arg(long, global = true)]
    pub allow_editing_score: bool,

    #[arg(long, global = true)]
    pub allow_editing_status: bool,

    /// Refuse ADD_TAG and DELETE_TAG messages
    #[arg(long, global = true)]
    pub deny_tag_changes: bool,

    /// Also write logs to a daily rotated file in this directory
    #[arg(long, global = true, env = "THREATQ_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Look up indicator values (IPs, domains, URLs, hashes, emails)
    Lookup {
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Show the expanded view of one indicator
    Details {
        /// ThreatQ indicator id
        id: String,
    },

    /// Send an edit message, e.g. '{"type":"ADD_TAG","data":{"indicatorId":1,"tagName":"apt"}}'
    Message {
        /// JSON payload, or `-` to read it from stdin
        payload: String,
    },

    /// Check the options without contacting the server
    Validate,
}

impl Cli {
    /// Build integration options from the flags. When `prompt` is set and no
    /// password was given, ask for one on the terminal.
    pub fn options(&self, prompt: bool) -> Result<IntegrationOptions> {
        let mut options = IntegrationOptions {
            url: self.url.clone().unwrap_or_default(),
            username: self.username.clone().unwrap_or_default(),
            password: self.password.clone().unwrap_or_default(),
            client: self.client_id.clone().unwrap_or_default(),
            allow_editing_score: self.allow_editing_score,
            allow_editing_status: self.allow_editing_status,
            ..Default::default()
        };

        if self.deny_tag_changes {
            options.allow_adding_tag = false;
            options.allow_deleting_tags = false;
        }
        if let Some(min) = self.min_score {
            options.minimum_score = min;
        }
        if let Some(max) = self.max_score {
            options.maximum_score = max;
        }
        if !self.statuses.is_empty() {
            options.indicator_statuses = self.statuses.clone();
        }

        if prompt && options.password.is_empty() {
            options.password = rpassword::prompt_password("ThreatQ password: ")?;
        }

        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("valid arguments")
    }

    #[test]
    fn test_options_from_flags() {
        let cli = parse(&[
            "threatq",
            "--url",
            "https://tq.example.com",
            "--username",
            "analyst@example.com",
            "--password",
            "hunter2",
            "--client-id",
            "abc",
            "--max-score",
            "7",
            "--status",
            "1",
            "--status",
            "2",
            "lookup",
            "8.8.8.8",
        ]);

        let options = cli.options(false).expect("options");
        assert_eq!(options.url, "https://tq.example.com");
        assert_eq!(options.client, "abc");
        assert_eq!(options.maximum_score, 7);
        assert_eq!(options.minimum_score, 5);
        assert_eq!(options.indicator_statuses, vec![1, 2]);
        assert!(options.allow_adding_tag);
        assert!(options.validate().is_empty());
    }

    #[test]
    fn test_deny_tag_changes() {
        let cli = parse(&["threatq", "--deny-tag-changes", "validate"]);
        let options = cli.options(false).expect("options");
        assert!(!options.allow_adding_tag);
        assert!(!options.allow_deleting_tags);
    }

    #[test]
    fn test_lookup_requires_a_value() {
        assert!(Cli::try_parse_from(["threatq", "lookup"]).is_err());
    }
}
