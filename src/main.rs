use anyhow::{Context, Result};
use serde_json::Value;
use std::io::Read;

mod auth;
mod client;
mod config;
mod error;
mod models;

use client::KrayinClient;
use config::Command;
use error::OperationOutcome;
use models::lead::{CreateLeadRequest, ListLeadsQuery, SortOrder};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let (config, command) = config::Config::load()?;
    config.validate()?;

    // Initialize logging with the configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::debug!("Configuration: {:?}", config);

    let client = KrayinClient::new(&config)?;

    match command {
        Command::Login => run_login(&client).await,
        Command::CreateLead { file } => run_create_lead(&client, &file).await,
        Command::ListLeads {
            sort,
            order,
            page,
            limit,
        } => run_list_leads(&client, sort, order, page, limit).await,
    }
}

/// Verify the account by forcing a fresh login
async fn run_login(client: &KrayinClient) -> Result<()> {
    match client.verify_login().await {
        Ok(credential) => {
            tracing::info!("✅ Login successful");
            println!("{credential:?}");
            Ok(())
        }
        Err(e) => {
            tracing::error!("❌ Login failed: {}", e);
            Err(e.into())
        }
    }
}

async fn run_create_lead(client: &KrayinClient, file: &str) -> Result<()> {
    let payload = read_payload(file)?;
    let lead: CreateLeadRequest = serde_json::from_str(&payload)
        .context("Lead payload is not valid JSON for a create-lead request")?;
    render_outcome(client.create_lead(&lead).await)
}

async fn run_list_leads(
    client: &KrayinClient,
    sort: Option<String>,
    order: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
) -> Result<()> {
    let query = ListLeadsQuery {
        sort,
        order: order.as_deref().map(parse_sort_order),
        page,
        limit,
    };
    render_outcome(client.list_leads(&query).await)
}

/// Read the lead payload from a file, or stdin when the path is "-"
fn read_payload(file: &str) -> Result<String> {
    if file == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read payload from stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read payload file: {file}"))
    }
}

/// Parse a sort direction already vetted by the CLI parser
fn parse_sort_order(s: &str) -> SortOrder {
    match s {
        "desc" => SortOrder::Desc,
        _ => SortOrder::Asc,
    }
}

/// Print the outcome: pretty data on stdout for success, the normalized
/// failure as JSON on stderr with a non-zero exit otherwise
fn render_outcome(outcome: OperationOutcome<Value>) -> Result<()> {
    match outcome {
        Ok(data) => {
            println!("{}", serde_json::to_string_pretty(&data)?);
            Ok(())
        }
        Err(failure) => {
            eprintln!("{}", serde_json::to_string(&failure)?);
            std::process::exit(1);
        }
    }
}
