//! Subcommand handlers. Each prints its result as pretty JSON on stdout.

use std::io::Read;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::warn;

use threatq_core::{
    Entity, Id, Integration, IntegrationConfig, IntegrationError, IntegrationOptions,
};

use crate::cli::{Cli, Command};

pub async fn run(cli: Cli) -> Result<()> {
    let config = IntegrationConfig::load(cli.config.as_deref())?;

    let validate_only = matches!(cli.command, Command::Validate);
    let options = cli.options(!validate_only)?;
    let invalid = options.validate();
    if validate_only || !invalid.is_empty() {
        print_json(&invalid)?;
        if !invalid.is_empty() {
            bail!("{} option(s) invalid", invalid.len());
        }
        return Ok(());
    }

    let integration = Integration::startup(config)?;

    let result = match cli.command {
        Command::Lookup { values } => lookup(&integration, &values, &options).await,
        Command::Details { id } => integration
            .on_details(&parse_id(&id), &options)
            .await
            .and_then(|view| Ok(serde_json::to_value(view)?)),
        Command::Message { payload } => {
            let payload = read_payload(&payload)?;
            integration.on_message(payload, &options).await
        }
        Command::Validate => return Ok(()),
    };

    match result {
        Ok(value) => print_json(&value),
        Err(e) => {
            print_json(&e.to_payload())?;
            Err(e.into())
        }
    }
}

async fn lookup(
    integration: &Integration,
    values: &[String],
    options: &IntegrationOptions,
) -> Result<Value, IntegrationError> {
    let entities: Vec<Entity> = values
        .iter()
        .filter_map(|value| {
            let entity = Entity::classify(value);
            if entity.is_none() {
                warn!(value = %value, "Skipping value of unknown type");
            }
            entity
        })
        .collect();

    let results = integration.do_lookup(&entities, options).await?;
    Ok(serde_json::to_value(results)?)
}

/// Numeric ids go out as numbers, anything else as a string
fn parse_id(raw: &str) -> Id {
    raw.parse::<u64>()
        .map(Id::Number)
        .unwrap_or_else(|_| Id::Text(raw.to_string()))
}

fn read_payload(arg: &str) -> Result<Value> {
    let text = if arg == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read payload from stdin")?;
        buf
    } else {
        arg.to_string()
    };
    serde_json::from_str(&text).context("Payload is not valid JSON")
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42"), Id::Number(42));
        assert_eq!(parse_id("ab-12"), Id::Text("ab-12".to_string()));
    }

    #[test]
    fn test_read_inline_payload() {
        let payload = read_payload(r#"{"type":"GET_COMMENTS","data":{"id":1}}"#).expect("json");
        assert_eq!(payload["type"], "GET_COMMENTS");
        assert!(read_payload("not json").is_err());
    }
}
