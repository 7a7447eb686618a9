//! Configuration commands

use crate::commands::Context;
use anyhow::{Context as _, Result};
use serde_json::json;
use std::path::Path;
use zerobyte_cli::{OutputFormat, Status};
use zerobyte_core::config::Config;
use zerobyte_core::error::exit_codes;
use zerobyte_core::{Error, ErrorCode};

/// Print the effective configuration with secrets masked
pub fn show(ctx: &Context) -> Result<i32> {
    let redacted = ctx.config.schema.redacted();

    if ctx.is_text() {
        let source = ctx
            .config
            .path
            .as_ref()
            .map_or_else(|| "defaults (no file)".to_string(), |p| p.display().to_string());
        Status::header(&format!("Configuration from {source}"));
        print!("{}", toml::to_string_pretty(&redacted).context("Failed to render config")?);
    } else {
        ctx.print_json(&json!({
            "path": ctx.config.path,
            "config": redacted,
        }))?;
    }

    Ok(exit_codes::SUCCESS)
}

/// Print the config file in use, or where one would be created
pub fn path(ctx: &Context) -> Result<i32> {
    let (path, exists) = match &ctx.config.path {
        Some(p) => (Some(p.clone()), true),
        None => (Config::default_path(), false),
    };

    if ctx.is_text() {
        match &path {
            Some(p) if exists => println!("{}", p.display()),
            Some(p) => println!("{} (not created)", p.display()),
            None => Status::warning("No configuration directory on this platform"),
        }
    } else {
        ctx.print_json(&json!({ "path": path, "exists": exists }))?;
    }

    Ok(exit_codes::SUCCESS)
}

/// Write a default config file
///
/// Runs before any config is loaded, so a missing `--config` target is
/// created rather than rejected.
pub fn init(path: Option<&Path>, force: bool, format: OutputFormat) -> Result<i32> {
    let target = match path {
        Some(p) => p.to_path_buf(),
        None => Config::default_path().ok_or_else(|| {
            Error::new(ErrorCode::ConfigError, "Cannot determine the configuration directory")
                .with_suggestion("Pass an explicit path with --config")
        })?,
    };

    if target.exists() && !force {
        return Err(Error::new(
            ErrorCode::FileExists,
            format!("{} already exists", target.display()),
        )
        .with_suggestion("Pass --force to overwrite it")
        .into());
    }

    Config::default().save(&target)?;

    if format.is_text() {
        Status::success(&format!("Created {}", target.display()));
        Status::info("Add your VirusTotal and Firebase API keys to enable scanning and sign-in");
    } else {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "success": true, "path": target }))?
        );
    }

    Ok(exit_codes::SUCCESS)
}
