//! # AppFlowy Connector CLI
//!
//! Command-line access to AppFlowy workspaces, databases, and rows.

use anyhow::{bail, Context, Result};
use appflowy_connector_client::{
    execute, AppflowyClient, ClientConfig, Credentials, Operation, RowFilter, RowListQuery,
    RowOutput, RowWrite, DEFAULT_HOST,
};
use appflowy_connector_core::MemoryStateStore;
use chrono::{DateTime, Utc};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();

    let Some(command) = args.first() else {
        print_help();
        return Ok(());
    };

    if matches!(command.as_str(), "help" | "--help" | "-h") {
        print_help();
        return Ok(());
    }

    let operation = match parse_operation(&args) {
        Ok(operation) => operation,
        Err(e) => {
            eprintln!("{e:#}");
            print_help();
            std::process::exit(1);
        }
    };

    let client = client_from_env()?;
    let items = execute(&client, &operation)
        .await
        .with_context(|| format!("{} failed", operation.name()))?;

    for item in items {
        println!("{}", serde_json::to_string_pretty(&item)?);
    }

    Ok(())
}

fn client_from_env() -> Result<AppflowyClient> {
    let host = env::var("APPFLOWY_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let username = env::var("APPFLOWY_USERNAME").context("APPFLOWY_USERNAME must be set")?;
    let password = env::var("APPFLOWY_PASSWORD").context("APPFLOWY_PASSWORD must be set")?;
    let credentials =
        Credentials::new(&host, username, password).context("Invalid APPFLOWY_HOST")?;

    let config = ClientConfig {
        ca_cert_path: env::var("APPFLOWY_CA_CERT").ok().map(PathBuf::from),
        ..ClientConfig::default()
    };

    AppflowyClient::new(credentials, &config, Arc::new(MemoryStateStore::new()))
        .context("Failed to create AppFlowy client")
}

/// Positional arguments and flags of one command line.
struct Args<'a> {
    positional: Vec<&'a str>,
    flags: Vec<(&'a str, Option<&'a str>)>,
}

impl<'a> Args<'a> {
    const VALUED: [&'static str; 3] = ["--limit", "--updated-after", "--document"];

    fn parse(args: &'a [String]) -> Self {
        let mut positional = Vec::new();
        let mut flags = Vec::new();
        let mut iter = args.iter().map(String::as_str);

        while let Some(arg) = iter.next() {
            if Self::VALUED.iter().any(|flag| *flag == arg) {
                flags.push((arg, iter.next()));
            } else if arg.starts_with("--") {
                flags.push((arg, None));
            } else {
                positional.push(arg);
            }
        }

        Self { positional, flags }
    }

    fn has(&self, flag: &str) -> bool {
        self.flags.iter().any(|(name, _)| *name == flag)
    }

    fn value(&self, flag: &str) -> Result<Option<&'a str>> {
        match self.flags.iter().find(|(name, _)| *name == flag) {
            Some((_, Some(value))) => Ok(Some(*value)),
            Some((_, None)) => bail!("{flag} needs a value"),
            None => Ok(None),
        }
    }

    fn arg(&self, index: usize, name: &str) -> Result<String> {
        self.positional
            .get(index)
            .map(|value| (*value).to_string())
            .with_context(|| format!("missing <{name}>"))
    }

    fn output(&self) -> RowOutput {
        RowOutput {
            include_document: self.has("--doc"),
            simplify: !self.has("--raw"),
        }
    }

    fn row(&self, index: usize) -> Result<RowWrite> {
        let row = RowWrite::json(self.arg(index, "json")?);
        Ok(match self.value("--document")? {
            Some(document) => row.with_document(document),
            None => row,
        })
    }
}

fn parse_operation(raw: &[String]) -> Result<Operation> {
    let args = Args::parse(raw);
    let command = args.arg(0, "command")?;

    let operation = match command.as_str() {
        "workspaces" => Operation::ListWorkspaces,
        "databases" => Operation::ListDatabases {
            workspace_id: args.arg(1, "workspace")?,
        },
        "fields" => Operation::ListFields {
            workspace_id: args.arg(1, "workspace")?,
            database_id: args.arg(2, "database")?,
        },
        "get" => Operation::GetRows {
            workspace_id: args.arg(1, "workspace")?,
            database_id: args.arg(2, "database")?,
            row_ids: args.arg(3, "row-ids")?,
            output: args.output(),
        },
        "list" => {
            let filter = match args.value("--updated-after")? {
                Some(after) => RowFilter::UpdatedAfter(
                    after
                        .parse::<DateTime<Utc>>()
                        .with_context(|| format!("invalid --updated-after '{after}'"))?,
                ),
                None => RowFilter::All,
            };
            let limit = args
                .value("--limit")?
                .map(str::parse::<usize>)
                .transpose()
                .context("invalid --limit")?;
            Operation::GetAllRows {
                workspace_id: args.arg(1, "workspace")?,
                database_id: args.arg(2, "database")?,
                query: RowListQuery {
                    filter,
                    limit,
                    output: args.output(),
                },
            }
        }
        "create" => Operation::CreateRow {
            workspace_id: args.arg(1, "workspace")?,
            database_id: args.arg(2, "database")?,
            row: args.row(3)?,
        },
        "upsert" => Operation::UpsertRow {
            workspace_id: args.arg(1, "workspace")?,
            database_id: args.arg(2, "database")?,
            pre_hash: args.arg(3, "pre-hash")?,
            row: args.row(4)?,
        },
        other => bail!("Unknown command: {other}"),
    };

    Ok(operation)
}

fn print_help() {
    println!(
        r#"AppFlowy Connector CLI

USAGE:
    appflowy <COMMAND> [OPTIONS]

COMMANDS:
    workspaces                               List workspaces
    databases <workspace>                    List databases of a workspace
    fields <workspace> <database>            List fields of a database
    get <workspace> <database> <ids>         Get rows by comma-separated ids
    list <workspace> <database>              List rows
    create <workspace> <database> <json>     Create a row from JSON
    upsert <workspace> <database> <key> <json>
                                             Create or update the row with pre_hash <key>
    help                                     Show this help message

OPTIONS:
    --doc                   Include row documents (get, list)
    --raw                   Do not flatten rows (get, list)
    --limit <n>             Return at most n rows (list)
    --updated-after <time>  Only rows updated after an RFC 3339 time (list)
    --document <markdown>   Attach a document body (create, upsert)

ENVIRONMENT:
    APPFLOWY_HOST           AppFlowy Cloud URL (default https://beta.appflowy.cloud)
    APPFLOWY_USERNAME       Login e-mail
    APPFLOWY_PASSWORD       Login password
    APPFLOWY_CA_CERT        PEM CA bundle for self-hosted servers

EXAMPLES:
    appflowy list 9d1c... 4a7e... --limit 10 --doc
    appflowy create 9d1c... 4a7e... '{{"cells": {{"Name": "Write release notes"}}}}'
"#
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Operation> {
        let args: Vec<String> = line.split_whitespace().map(ToString::to_string).collect();
        parse_operation(&args)
    }

    #[test]
    fn list_with_flags() {
        let operation = parse("list ws db --limit 3 --doc --raw").unwrap();

        assert_eq!(
            operation,
            Operation::GetAllRows {
                workspace_id: "ws".to_string(),
                database_id: "db".to_string(),
                query: RowListQuery {
                    filter: RowFilter::All,
                    limit: Some(3),
                    output: RowOutput {
                        include_document: true,
                        simplify: false,
                    },
                },
            }
        );
    }

    #[test]
    fn list_updated_after() {
        let Operation::GetAllRows { query, .. } =
            parse("list ws db --updated-after 2024-05-01T10:00:00Z").unwrap()
        else {
            panic!("expected GetAllRows");
        };
        assert!(matches!(query.filter, RowFilter::UpdatedAfter(_)));
    }

    #[test]
    fn upsert_takes_key_and_json() {
        let operation = parse(r#"upsert ws db key-1 {"cells":{}} --document notes"#).unwrap();

        assert_eq!(
            operation,
            Operation::UpsertRow {
                workspace_id: "ws".to_string(),
                database_id: "db".to_string(),
                pre_hash: "key-1".to_string(),
                row: RowWrite::json(r#"{"cells":{}}"#).with_document("notes"),
            }
        );
    }

    #[test]
    fn missing_arguments_and_bad_values_fail() {
        assert!(parse("fields ws").is_err());
        assert!(parse("list ws db --limit many").is_err());
        assert!(parse("list ws db --limit").is_err());
        assert!(parse("delete ws db").is_err());
    }
}
