//! Connectivity probe for the BHAVYA API.
//!
//! Loads configuration once, then checks the health endpoint, fetches a path
//! through the retrying client, or prints canonical paths.

use std::io::Write;

use anyhow::{bail, Context, Result};
use bhavya_api::{ApiClient, RequestOptions};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "bhavya-probe", about = "Probe the BHAVYA API from the command line")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Check the backend health endpoint.
    Health,
    /// Fetch an API path with retry and print the JSON body.
    Get {
        path: String,
        /// Extra request header, `Name: value`. Repeatable.
        #[arg(long = "header", short = 'H', value_parser = parse_header)]
        headers: Vec<(String, String)>,
        /// Retry ceiling; defaults to the configured value.
        #[arg(long)]
        retries: Option<u32>,
    },
    /// Print the canonical form of each path.
    Normalize {
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

pub fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected `Name: value`, got {raw:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("header name is empty in {raw:?}"));
    }
    Ok((name.to_owned(), value.trim().to_owned()))
}

pub async fn run<W: Write>(command: &Command, client: &ApiClient, out: &mut W) -> Result<()> {
    match command {
        Command::Health => {
            let health = client
                .health()
                .await
                .with_context(|| format!("health check against {} failed", client.config().base_url))?;
            writeln!(out, "{}", serde_json::to_string_pretty(&health)?)?;
            if !health.is_ok() {
                bail!("backend reported status {:?}", health.status);
            }
        }
        Command::Get {
            path,
            headers,
            retries,
        } => {
            let url = client.endpoint(path);
            let options = headers
                .iter()
                .fold(RequestOptions::new(), |options, (name, value)| {
                    options.with_header(name.clone(), value.clone())
                });
            let max_retries = retries.unwrap_or(client.config().max_retries);
            let body = client
                .fetch_with_retry(&url, &options, max_retries)
                .await
                .with_context(|| format!("GET {url} failed"))?;
            writeln!(out, "{}", serde_json::to_string_pretty(&body)?)?;
        }
        Command::Normalize { paths } => {
            for path in paths {
                writeln!(out, "{}", client.normalizer().normalize(Some(path)))?;
            }
        }
    }
    Ok(())
}
