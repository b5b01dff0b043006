use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fmt;

use crate::auth::LoginSettings;

/// Krayin CRM API client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// CRM base URL, e.g. https://crm.example.com
    #[arg(short = 'u', long, env = "CRM_BASE_URL")]
    pub base_url: Option<String>,

    /// Account email used for login
    #[arg(short = 'e', long, env = "CRM_EMAIL")]
    pub email: Option<String>,

    /// Account password used for login (prefer the env var over the flag)
    #[arg(short = 'p', long, env = "CRM_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Device name reported to the login endpoint
    #[arg(long, env = "CRM_DEVICE_NAME", default_value = "krayin-client")]
    pub device_name: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "30")]
    pub http_timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

/// CRM operation to perform
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and print a credential preview to verify the account works
    Login,

    /// Create a lead from a JSON payload file
    CreateLead {
        /// Path to the JSON payload, "-" for stdin
        #[arg(short = 'f', long, default_value = "-")]
        file: String,
    },

    /// List leads with optional sort and paging parameters
    ListLeads {
        /// Field to sort by
        #[arg(long)]
        sort: Option<String>,

        /// Sort direction
        #[arg(long, value_parser = ["asc", "desc"])]
        order: Option<String>,

        /// Page number
        #[arg(long)]
        page: Option<u32>,

        /// Page size
        #[arg(long)]
        limit: Option<u32>,
    },
}

#[derive(Clone)]
pub struct Config {
    // CRM account
    pub base_url: String,
    pub email: String,
    pub password: String,
    pub device_name: String,

    // HTTP client
    pub http_max_connections: usize,
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    // Logging
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<(Self, Command)> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        // Parse CLI arguments (clap falls back to env vars itself)
        let args = CliArgs::parse();

        let config = Config {
            // CRM account (CLI > ENV, mostly required)
            base_url: normalize_base_url(&args.base_url.context(
                "CRM_BASE_URL is required (use -u or set CRM_BASE_URL env var)",
            )?),

            email: args
                .email
                .context("CRM_EMAIL is required (use -e or set CRM_EMAIL env var)")?,

            password: args
                .password
                .context("CRM_PASSWORD is required (use -p or set CRM_PASSWORD env var)")?,

            device_name: args.device_name,

            // HTTP client
            http_max_connections: std::env::var("HTTP_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20),

            http_connect_timeout: std::env::var("HTTP_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),

            http_request_timeout: args.http_timeout,

            // Logging
            log_level: args.log_level,
        };

        Ok((config, args.command))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            anyhow::bail!(
                "CRM_BASE_URL must start with http:// or https://: {}",
                self.base_url
            );
        }

        if self.email.is_empty() {
            anyhow::bail!("CRM_EMAIL cannot be empty");
        }

        if self.password.is_empty() {
            anyhow::bail!("CRM_PASSWORD cannot be empty");
        }

        Ok(())
    }

    /// Settings handed to the credential manager for login calls
    pub fn login_settings(&self) -> LoginSettings {
        LoginSettings {
            base_url: self.base_url.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
            device_name: self.device_name.clone(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The password stays out of any derived output
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .field("password", &"********")
            .field("device_name", &self.device_name)
            .field("http_max_connections", &self.http_max_connections)
            .field("http_connect_timeout", &self.http_connect_timeout)
            .field("http_request_timeout", &self.http_request_timeout)
            .field("log_level", &self.log_level)
            .finish()
    }
}

/// Trim trailing slashes so endpoint paths can always be appended as-is
fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
