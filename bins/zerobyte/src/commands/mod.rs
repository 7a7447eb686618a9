//! CLI command implementations

pub mod config;
pub mod download;
pub mod login;
pub mod logout;
pub mod scan;
pub mod status;
pub mod upload;
pub mod whoami;

use crate::session::SessionStore;
use anyhow::{Context as _, Result};
use serde::Serialize;
use zerobyte_api_client::{ApiError, ClientConfig, ZeroByteClient};
use zerobyte_cli::OutputFormat;
use zerobyte_core::address::NodeAddress;
use zerobyte_core::config::Config;
use zerobyte_core::error::exit_codes;
use zerobyte_core::{Error, ErrorCode};

/// Everything a command needs from the global flags
pub struct Context {
    pub config: Config,
    /// Node chosen on the command line; wins over environment and config
    pub node: Option<NodeAddress>,
    pub format: OutputFormat,
    pub sessions: SessionStore,
}

impl Context {
    /// Build an API client from config file, environment and flags
    pub fn client(&self) -> Result<ZeroByteClient> {
        let mut config = ClientConfig::from_schema(&self.config.schema).with_env_overrides()?;
        if let Some(node) = &self.node {
            config = config.with_node(node);
        }
        ZeroByteClient::with_config(config).context("Failed to create API client")
    }

    pub fn is_text(&self) -> bool {
        self.format.is_text()
    }

    /// Print a command result as a single JSON object
    pub fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

/// Exit code for an error that escaped a command
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(e) = err.downcast_ref::<Error>() {
        return e.exit_code();
    }
    if let Some(e) = err.downcast_ref::<ApiError>() {
        return e.code().exit_code();
    }
    exit_codes::FAILURE
}

/// One-line-per-layer rendering of an error chain
///
/// Context layers are joined with `: ` like anyhow's `{:#}`, but the chain
/// stops at a `zerobyte_core::Error`, whose message and suggestion already
/// describe the cause. Causes repeated verbatim by their parent are skipped.
pub fn render_error(err: &anyhow::Error) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        if parts.last().is_some_and(|prev| prev.contains(&text)) {
            continue;
        }
        parts.push(text);
        if cause.is::<Error>() {
            break;
        }
    }
    parts.join(": ")
}

/// Error code reported in JSON output
pub fn error_code_for(err: &anyhow::Error) -> ErrorCode {
    if let Some(e) = err.downcast_ref::<Error>() {
        return e.code;
    }
    if let Some(e) = err.downcast_ref::<ApiError>() {
        return e.code();
    }
    ErrorCode::Unknown
}
